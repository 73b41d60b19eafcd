use serde::{Deserialize, Serialize};

use super::params::TrackParams;
use super::pattern::Pattern;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackKind {
    Kick,
    Snare,
    Hat,
    Synth,
    Sample,
}

impl TrackKind {
    pub fn label(self) -> &'static str {
        match self {
            TrackKind::Kick => "kick",
            TrackKind::Snare => "snare",
            TrackKind::Hat => "hat",
            TrackKind::Synth => "synth",
            TrackKind::Sample => "sample",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Waveform {
    #[default]
    Sine,
    Saw,
    Square,
    Triangle,
}

/// One lane of the sequencer: a pattern plus the sound it plays.
///
/// Each track keeps its own pattern length, so a 16-step kick against a
/// 12-step hat only lines up again every `lcm(16, 12)` steps.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub name: String,
    pub kind: TrackKind,
    pub pattern: Pattern,
    #[serde(default)]
    pub params: TrackParams,
    #[serde(default)]
    pub muted: bool,
    #[serde(default)]
    pub waveform: Waveform,
}

impl Track {
    pub fn new(kind: TrackKind) -> Self {
        Self {
            name: kind.label().to_string(),
            kind,
            pattern: Pattern::default(),
            params: TrackParams::default(),
            muted: false,
            waveform: Waveform::default(),
        }
    }

    pub fn with_pattern(mut self, pattern: Pattern) -> Self {
        self.pattern = pattern;
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn len(&self) -> usize {
        self.pattern.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pattern.is_empty()
    }
}

/// Steps until every track is back at step 0 at the same time.
pub fn polyrhythm_period(tracks: &[Track]) -> usize {
    tracks.iter().map(Track::len).fold(1, lcm)
}

fn gcd(a: usize, b: usize) -> usize {
    if b == 0 { a } else { gcd(b, a % b) }
}

fn lcm(a: usize, b: usize) -> usize {
    a / gcd(a, b) * b
}
