use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::pipeline::Pattern;
use crate::shared::{MAX_STEPS, MAX_VELOCITY};

/// Each of `len` steps is on with probability `density`, independently.
pub fn random_gates(len: usize, density: f64, rng: &mut impl Rng) -> Vec<bool> {
    let density = if density.is_finite() { density.clamp(0.0, 1.0) } else { 0.0 };
    (0..len.min(MAX_STEPS)).map(|_| rng.gen_bool(density)).collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RandomPatternGenerator {
    pub density: f64,
    /// Inclusive velocity range for the steps that come out active.
    pub velocity: Option<(u8, u8)>,
}

impl Default for RandomPatternGenerator {
    fn default() -> Self {
        Self { density: 0.5, velocity: None }
    }
}

impl RandomPatternGenerator {
    pub fn new(density: f64) -> Self {
        Self { density, ..Self::default() }
    }

    pub fn with_velocity(mut self, lo: u8, hi: u8) -> Self {
        let (lo, hi) = (lo.min(hi), lo.max(hi));
        self.velocity = Some((lo.min(MAX_VELOCITY), hi.min(MAX_VELOCITY)));
        self
    }

    pub fn generate(&self, len: usize, rng: &mut impl Rng) -> Vec<bool> {
        random_gates(len, self.density, rng)
    }

    /// Regate `pattern` in place. Steps keep their locks and conditions.
    pub fn apply(&self, pattern: &mut Pattern, rng: &mut impl Rng) {
        let gates = self.generate(pattern.len(), rng);
        pattern.apply_gates(&gates);
        if let Some((lo, hi)) = self.velocity {
            for index in pattern.active_indices() {
                if let Some(step) = pattern.step_mut(index) {
                    step.velocity = rng.gen_range(lo..=hi);
                }
            }
        }
    }
}
