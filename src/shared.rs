// Shared vocabulary for every layer of the sequencer.
//
// The control layer (middle.rs) owns all sequencer and parameter state; the
// renderer only ever sees the timestamped commands in audio_api.rs. Anything
// in here is plain data so both sides can agree on limits without importing
// each other.

use serde::{Deserialize, Serialize};

pub const MAX_STEPS: usize = 32;
pub const DEFAULT_STEPS: usize = 16;
pub const STEPS_PER_BEAT: f64 = 4.0; // sixteenth-note grid

pub const MIN_BPM: f32 = 20.0;
pub const MAX_BPM: f32 = 300.0;
pub const DEFAULT_BPM: f32 = 120.0;

pub const MAX_SWING: f32 = 0.75; // fraction of one step interval
pub const MAX_HUMANIZE_MS: f32 = 50.0;
pub const MAX_MICRO_TIMING_MS: f32 = 50.0;

pub const MAX_VELOCITY: u8 = 127;
pub const MAX_PROBABILITY: u8 = 100;
pub const MAX_RATCHET: u8 = 4;

pub const MAX_BARS_PER_PATTERN: u8 = 16;

// ye olde types
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SceneId(pub u8);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// Length of one sixteenth step at `bpm`, in milliseconds.
pub fn step_interval_ms(bpm: f32) -> f64 {
    60_000.0 / bpm.clamp(MIN_BPM, MAX_BPM) as f64 / STEPS_PER_BEAT
}

#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a * (1.0 - t) + b * t // exact at both ends, unlike a + (b - a) * t
}
