use serde::{Deserialize, Serialize};

use super::step::Step;
use crate::shared::{DEFAULT_STEPS, MAX_STEPS};

/// An ordered run of 1..=32 steps. Only the first `len()` steps exist.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "PatternRepr", into = "PatternRepr")]
pub struct Pattern {
    steps: Vec<Step>,
}

// what actually goes over the wire; lengths get clamped on the way in
#[derive(Clone, Serialize, Deserialize)]
struct PatternRepr {
    steps: Vec<Step>,
}

impl From<PatternRepr> for Pattern {
    fn from(repr: PatternRepr) -> Self {
        let mut steps: Vec<Step> = repr.steps.into_iter().map(Step::normalized).collect();
        steps.truncate(MAX_STEPS);
        if steps.is_empty() {
            steps.push(Step::default());
        }
        Self { steps }
    }
}

impl From<Pattern> for PatternRepr {
    fn from(p: Pattern) -> Self {
        Self { steps: p.steps }
    }
}

impl Default for Pattern {
    fn default() -> Self {
        Self::new(DEFAULT_STEPS)
    }
}

pub fn clamp_length(len: usize) -> usize {
    len.clamp(1, MAX_STEPS)
}

impl Pattern {
    pub fn new(len: usize) -> Self {
        Self { steps: vec![Step::default(); clamp_length(len)] }
    }

    pub fn from_steps(steps: Vec<Step>) -> Self {
        PatternRepr { steps }.into()
    }

    /// Build from a gate list, e.g. the output of a rhythm generator.
    pub fn from_gates(gates: &[bool]) -> Self {
        let mut p = Self::new(gates.len());
        p.apply_gates(gates);
        p
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        false // never fewer than one step
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn step(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    pub fn step_mut(&mut self, index: usize) -> Option<&mut Step> {
        self.steps.get_mut(index)
    }

    pub fn set_step(&mut self, index: usize, step: Step) {
        if let Some(slot) = self.steps.get_mut(index) {
            *slot = step.normalized();
        }
    }

    pub fn toggle(&mut self, index: usize) {
        if let Some(step) = self.steps.get_mut(index) {
            step.active = !step.active;
        }
    }

    /// Resize to `len` (clamped). The first `min(old, new)` steps survive.
    pub fn resize(&mut self, len: usize) {
        self.steps.resize(clamp_length(len), Step::default());
    }

    /// Overwrite only the `active` flag of each step, keeping locks and the rest.
    pub fn apply_gates(&mut self, gates: &[bool]) {
        for (step, &gate) in self.steps.iter_mut().zip(gates) {
            step.active = gate;
        }
    }

    pub fn gates(&self) -> Vec<bool> {
        self.steps.iter().map(|s| s.active).collect()
    }

    pub fn active_indices(&self) -> Vec<usize> {
        self.steps
            .iter()
            .enumerate()
            .filter(|(_, s)| s.active)
            .map(|(i, _)| i)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_is_clamped() {
        assert_eq!(Pattern::new(0).len(), 1);
        assert_eq!(Pattern::new(99).len(), MAX_STEPS);
    }

    #[test]
    fn resize_preserves_prefix_and_hides_tail() {
        for old_len in [1usize, 7, 16, 32] {
            for new_len in [1usize, 3, 16, 31, 32, 40] {
                let mut p = Pattern::new(old_len);
                for i in 0..old_len {
                    p.set_step(i, Step::on().with_velocity(i as u8));
                }
                p.resize(new_len);
                let expected = clamp_length(new_len);
                assert_eq!(p.len(), expected);
                assert!(p.step(expected).is_none());
                for i in 0..old_len.min(expected) {
                    let s = p.step(i).unwrap();
                    assert!(s.active);
                    assert_eq!(s.velocity, i as u8);
                }
                for i in old_len..expected {
                    assert!(!p.step(i).unwrap().active);
                }
            }
        }
    }

    #[test]
    fn gates_keep_other_attributes() {
        let mut p = Pattern::new(4);
        p.set_step(1, Step::default().with_velocity(30));
        p.apply_gates(&[true, true, false, false]);
        assert_eq!(p.active_indices(), vec![0, 1]);
        assert_eq!(p.step(1).unwrap().velocity, 30);
    }

    #[test]
    fn deserialize_clamps_length() {
        let p: Pattern = serde_json::from_str(r#"{"steps":[]}"#).unwrap();
        assert_eq!(p.len(), 1);
        let many = serde_json::json!({ "steps": vec![serde_json::json!({"active": true}); 40] });
        let p: Pattern = serde_json::from_value(many).unwrap();
        assert_eq!(p.len(), MAX_STEPS);
        assert!(p.steps().iter().all(|s| s.active));
    }
}
