//! Euclidean rhythms: `pulses` onsets spread as evenly as possible over
//! `steps` slots, the Bjorklund way.

use serde::{Deserialize, Serialize};

use crate::pipeline::Pattern;
use crate::shared::MAX_STEPS;

/// `pulses` onsets over `steps` slots, rotated `rotation` slots later.
///
/// Inputs clamp: `steps` to 32, `pulses` to `steps`. `euclidean(3, 8, 0)`
/// gives the tresillo `x..x..x.`.
pub fn euclidean(pulses: usize, steps: usize, rotation: usize) -> Vec<bool> {
    let steps = steps.min(MAX_STEPS);
    let pulses = pulses.min(steps);
    let mut gates = bjorklund(pulses, steps);
    if steps > 0 {
        gates.rotate_right(rotation % steps);
    }
    gates
}

fn bjorklund(pulses: usize, steps: usize) -> Vec<bool> {
    let mut ons: Vec<Vec<bool>> = vec![vec![true]; pulses];
    let mut offs: Vec<Vec<bool>> = vec![vec![false]; steps - pulses];

    // keep folding the remainder group onto the front group until at most
    // one remainder is left
    while ons.len().min(offs.len()) > 1 {
        let rest = if ons.len() > offs.len() {
            ons.split_off(offs.len())
        } else {
            offs.split_off(ons.len())
        };
        for (seq, tail) in ons.iter_mut().zip(offs.drain(..)) {
            seq.extend(tail);
        }
        offs = rest;
    }
    ons.into_iter().chain(offs).flatten().collect()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EuclideanPreset {
    pub name: String,
    pub pulses: usize,
    pub steps: usize,
    pub rotation: usize,
}

impl EuclideanPreset {
    pub fn new(name: impl Into<String>, pulses: usize, steps: usize, rotation: usize) -> Self {
        let steps = steps.clamp(1, MAX_STEPS);
        Self { name: name.into(), pulses: pulses.min(steps), steps, rotation: rotation % steps }
    }

    /// Rescale the preset to a track of `len` steps, keeping its density and
    /// where in the bar its rotation lands.
    pub fn adapt(&self, len: usize) -> Vec<bool> {
        let len = len.clamp(1, MAX_STEPS);
        let scale = len as f64 / self.steps.max(1) as f64;
        let pulses = (self.pulses as f64 * scale).round() as usize;
        let rotation = (self.rotation as f64 * scale).round() as usize;
        euclidean(pulses.min(len), len, rotation)
    }

    /// Write the rescaled gates into `pattern`, leaving every other step field alone.
    pub fn apply(&self, pattern: &mut Pattern) {
        pattern.apply_gates(&self.adapt(pattern.len()));
    }
}

pub fn presets() -> Vec<EuclideanPreset> {
    [
        ("four on the floor", 4, 16, 0),
        ("offbeat", 4, 16, 2),
        ("tresillo", 3, 8, 0),
        ("cinquillo", 5, 8, 0),
        ("ruchenitza", 3, 7, 0),
        ("aksak", 4, 9, 0),
        ("bembe", 7, 12, 0),
        ("samba", 7, 16, 0),
        ("bossa", 5, 16, 3),
    ]
    .into_iter()
    .map(|(name, p, s, r)| EuclideanPreset::new(name, p, s, r))
    .collect()
}

pub fn preset(name: &str) -> Option<EuclideanPreset> {
    presets().into_iter().find(|p| p.name.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(gates: &[bool]) -> String {
        gates.iter().map(|&g| if g { 'x' } else { '.' }).collect()
    }

    #[test]
    fn pulse_count_holds_for_every_size() {
        for n in 0..=MAX_STEPS {
            for k in 0..=n {
                let gates = euclidean(k, n, 0);
                assert_eq!(gates.len(), n);
                assert_eq!(gates.iter().filter(|&&g| g).count(), k, "E({k},{n})");
                // a full turn is a no-op
                assert_eq!(euclidean(k, n, n), gates, "E({k},{n}) rotated by {n}");
            }
        }
    }

    #[test]
    fn known_rhythms() {
        assert_eq!(render(&euclidean(3, 8, 0)), "x..x..x.");
        assert_eq!(render(&euclidean(5, 8, 0)), "x.xx.xx.");
        assert_eq!(render(&euclidean(2, 5, 0)), "x.x..");
        let four: Vec<usize> = euclidean(4, 16, 0)
            .iter()
            .enumerate()
            .filter_map(|(i, &g)| g.then_some(i))
            .collect();
        assert_eq!(four, vec![0, 4, 8, 12]);
    }

    #[test]
    fn rotation_moves_pulses_later() {
        assert_eq!(render(&euclidean(3, 8, 1)), ".x..x..x");
        assert_eq!(render(&euclidean(3, 8, 9)), ".x..x..x");
    }

    #[test]
    fn inputs_clamp() {
        assert_eq!(euclidean(9, 4, 0), vec![true; 4]);
        assert_eq!(euclidean(1, 64, 0).len(), MAX_STEPS);
        assert!(euclidean(0, 0, 3).is_empty());
    }

    #[test]
    fn preset_rescales_to_track_length() {
        let tresillo = preset("tresillo").unwrap();
        let gates = tresillo.adapt(16);
        assert_eq!(gates.len(), 16);
        assert_eq!(gates.iter().filter(|&&g| g).count(), 6);

        let offbeat = preset("offbeat").unwrap();
        assert_eq!(render(&offbeat.adapt(16)), "..x...x...x...x.");
        assert_eq!(render(&offbeat.adapt(8)), ".x...x..");
    }

    #[test]
    fn apply_keeps_step_attributes() {
        let mut pattern = Pattern::new(16);
        pattern.step_mut(4).unwrap().velocity = 33;
        preset("four on the floor").unwrap().apply(&mut pattern);
        assert_eq!(pattern.active_indices(), vec![0, 4, 8, 12]);
        assert_eq!(pattern.step(4).unwrap().velocity, 33);
    }
}
