// The data every other layer passes around.
//
// Terminology, since it keeps tripping us up:
//   "scene":   everything at once (all tracks + tempo/swing), what gets saved and morphed
//   "track":   one lane (kick/snare/hat/synth/sample) with its own pattern and sound
//   "pattern": the 1..32 steps a track loops over
//   "step":    one slot that may or may not fire

mod chain;
mod params;
mod pattern;
mod scene;
mod step;
mod track;

pub use chain::PatternChain;
pub use params::{ParamLocks, TrackParams};
pub use pattern::{clamp_length, Pattern};
pub use scene::{SceneSnapshot, SNAPSHOT_FORMAT_VERSION};
pub use step::{AcidMods, Step, TrigCondition};
pub use track::{polyrhythm_period, Track, TrackKind, Waveform};
