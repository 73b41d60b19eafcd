// Track-wide sound parameters and the sparse per-step overrides (p-locks).

use serde::{Deserialize, Serialize};

use crate::shared::{lerp, MAX_MICRO_TIMING_MS, MAX_RATCHET};

/// The base parameter set a track triggers with when nothing is locked.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackParams {
    pub pitch: f32,            // semitones, -24..24
    pub gain: f32,             // 0.0 to 1.0
    pub filter_cutoff: f32,    // Hz
    pub filter_resonance: f32, // 0.0 to 1.0
    pub decay_ms: f32,
    pub pan: f32,              // -1.0 (left) to 1.0 (right)
    pub trim_start: f32,       // fraction of the sample
    pub trim_length: f32,      // fraction of the sample
}

impl Default for TrackParams {
    fn default() -> Self {
        Self {
            pitch: 0.0,
            gain: 0.8,
            filter_cutoff: 20_000.0,
            filter_resonance: 0.0,
            decay_ms: 300.0,
            pan: 0.0,
            trim_start: 0.0,
            trim_length: 1.0,
        }
    }
}

impl TrackParams {
    pub fn clamped(self) -> Self {
        Self {
            pitch: self.pitch.clamp(-24.0, 24.0),
            gain: self.gain.clamp(0.0, 1.0),
            filter_cutoff: self.filter_cutoff.clamp(20.0, 20_000.0),
            filter_resonance: self.filter_resonance.clamp(0.0, 1.0),
            decay_ms: self.decay_ms.clamp(1.0, 10_000.0),
            pan: self.pan.clamp(-1.0, 1.0),
            trim_start: self.trim_start.clamp(0.0, 1.0),
            trim_length: self.trim_length.clamp(0.0, 1.0),
        }
    }

    /// Field-wise linear blend; `t = 0` is `self`, `t = 1` is `other`.
    pub fn lerp(&self, other: &TrackParams, t: f32) -> TrackParams {
        TrackParams {
            pitch: lerp(self.pitch, other.pitch, t),
            gain: lerp(self.gain, other.gain, t),
            filter_cutoff: lerp(self.filter_cutoff, other.filter_cutoff, t),
            filter_resonance: lerp(self.filter_resonance, other.filter_resonance, t),
            decay_ms: lerp(self.decay_ms, other.decay_ms, t),
            pan: lerp(self.pan, other.pan, t),
            trim_start: lerp(self.trim_start, other.trim_start, t),
            trim_length: lerp(self.trim_length, other.trim_length, t),
        }
    }
}

fn is_false(b: &bool) -> bool {
    !*b
}

fn is_single(r: &u8) -> bool {
    *r <= 1
}

fn one() -> u8 {
    1
}

/// Sparse override of a track's parameters for a single step.
///
/// Every `None` inherits whatever the track's base value is at the moment the
/// step fires, so turning a knob on the track still moves unlocked steps.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamLocks {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pitch: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gain: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_cutoff: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_resonance: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decay_ms: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pan: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trim_start: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trim_length: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub micro_timing_ms: Option<f32>, // -50..50, shifts the trigger time
    #[serde(skip_serializing_if = "is_false")]
    pub reverse: bool,
    #[serde(default = "one", skip_serializing_if = "is_single")]
    pub ratchet: u8, // 1..4 re-triggers inside one step
}

impl Default for ParamLocks {
    fn default() -> Self {
        Self {
            pitch: None,
            gain: None,
            filter_cutoff: None,
            filter_resonance: None,
            decay_ms: None,
            pan: None,
            trim_start: None,
            trim_length: None,
            micro_timing_ms: None,
            reverse: false,
            ratchet: 1,
        }
    }
}

impl ParamLocks {
    pub fn is_empty(&self) -> bool {
        *self == ParamLocks::default()
    }

    /// Blend the locks both sides set. Anything only one side locks, and the
    /// discrete `reverse` and `ratchet`, stays as it is here.
    pub fn lerp_shared(&self, other: &ParamLocks, t: f32) -> ParamLocks {
        let mix = |a: Option<f32>, b: Option<f32>| match (a, b) {
            (Some(a), Some(b)) => Some(lerp(a, b, t)),
            (a, _) => a,
        };
        ParamLocks {
            pitch: mix(self.pitch, other.pitch),
            gain: mix(self.gain, other.gain),
            filter_cutoff: mix(self.filter_cutoff, other.filter_cutoff),
            filter_resonance: mix(self.filter_resonance, other.filter_resonance),
            decay_ms: mix(self.decay_ms, other.decay_ms),
            pan: mix(self.pan, other.pan),
            trim_start: mix(self.trim_start, other.trim_start),
            trim_length: mix(self.trim_length, other.trim_length),
            micro_timing_ms: mix(self.micro_timing_ms, other.micro_timing_ms),
            ..*self
        }
    }

    /// Overlay the set fields onto `base`. `base` itself is never touched.
    pub fn merge(&self, base: &TrackParams) -> TrackParams {
        TrackParams {
            pitch: self.pitch.unwrap_or(base.pitch),
            gain: self.gain.unwrap_or(base.gain),
            filter_cutoff: self.filter_cutoff.unwrap_or(base.filter_cutoff),
            filter_resonance: self.filter_resonance.unwrap_or(base.filter_resonance),
            decay_ms: self.decay_ms.unwrap_or(base.decay_ms),
            pan: self.pan.unwrap_or(base.pan),
            trim_start: self.trim_start.unwrap_or(base.trim_start),
            trim_length: self.trim_length.unwrap_or(base.trim_length),
        }
        .clamped()
    }

    /// The smallest lock set that turns `base` into `target`.
    pub fn diff(base: &TrackParams, target: &TrackParams) -> ParamLocks {
        fn changed(b: f32, t: f32) -> Option<f32> {
            if b != t { Some(t) } else { None }
        }
        ParamLocks {
            pitch: changed(base.pitch, target.pitch),
            gain: changed(base.gain, target.gain),
            filter_cutoff: changed(base.filter_cutoff, target.filter_cutoff),
            filter_resonance: changed(base.filter_resonance, target.filter_resonance),
            decay_ms: changed(base.decay_ms, target.decay_ms),
            pan: changed(base.pan, target.pan),
            trim_start: changed(base.trim_start, target.trim_start),
            trim_length: changed(base.trim_length, target.trim_length),
            ..ParamLocks::default()
        }
    }

    pub fn micro_timing(&self) -> f64 {
        self.micro_timing_ms
            .unwrap_or(0.0)
            .clamp(-MAX_MICRO_TIMING_MS, MAX_MICRO_TIMING_MS) as f64
    }

    pub fn ratchet_count(&self) -> u8 {
        self.ratchet.clamp(1, MAX_RATCHET)
    }
}
