// Procedural pattern sources. Both hand back plain gate vectors; writing them
// into a Pattern is `Pattern::apply_gates`, which leaves the rest of each step alone.

pub mod euclidean;
pub mod random;

pub use euclidean::{euclidean, preset, presets, EuclideanPreset};
pub use random::{random_gates, RandomPatternGenerator};
