// A scene is everything needed to bring the instrument back to one state:
// every track's pattern and sound, plus the transport settings. It is the
// unit we save, recall, chain and morph between.

use serde::{Deserialize, Serialize};

use super::track::{Track, TrackKind};
use crate::error::SnapshotError;
use crate::shared::{DEFAULT_BPM, MAX_BPM, MAX_HUMANIZE_MS, MAX_SWING, MIN_BPM};

pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

fn default_master_volume() -> f32 {
    0.8
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SceneSnapshot {
    pub format_version: u32,
    #[serde(default)]
    pub name: String,
    pub bpm: f32,
    #[serde(default)]
    pub swing: f32, // fraction of a step, 0..0.75
    #[serde(default)]
    pub humanize_ms: f32,
    #[serde(default = "default_master_volume")]
    pub master_volume: f32,
    pub tracks: Vec<Track>,
}

impl Default for SceneSnapshot {
    fn default() -> Self {
        Self::default_kit()
    }
}

impl SceneSnapshot {
    /// Five empty lanes: kick, snare, hat, synth and a sample slicer.
    pub fn default_kit() -> Self {
        Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            name: String::from("init"),
            bpm: DEFAULT_BPM,
            swing: 0.0,
            humanize_ms: 0.0,
            master_volume: default_master_volume(),
            tracks: [
                TrackKind::Kick,
                TrackKind::Snare,
                TrackKind::Hat,
                TrackKind::Synth,
                TrackKind::Sample,
            ]
            .into_iter()
            .map(Track::new)
            .collect(),
        }
    }

    pub fn export_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn import_json(data: &str) -> Result<SceneSnapshot, SnapshotError> {
        let scene: SceneSnapshot = serde_json::from_str(data)?;
        if scene.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                found: scene.format_version,
                supported: SNAPSHOT_FORMAT_VERSION,
            });
        }
        Ok(scene.normalized())
    }

    /// Clamp everything into range; patterns are already clamped by serde.
    pub fn normalized(mut self) -> Self {
        self.bpm = self.bpm.clamp(MIN_BPM, MAX_BPM);
        self.swing = self.swing.clamp(0.0, MAX_SWING);
        self.humanize_ms = self.humanize_ms.clamp(0.0, MAX_HUMANIZE_MS);
        self.master_volume = self.master_volume.clamp(0.0, 1.0);
        for track in &mut self.tracks {
            track.params = track.params.clamped();
        }
        self
    }
}
