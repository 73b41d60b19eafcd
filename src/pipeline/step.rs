use serde::{Deserialize, Serialize};

use super::params::ParamLocks;
use crate::shared::{MAX_PROBABILITY, MAX_VELOCITY};

/// Acid-style modifiers, resolved against the track's previous sounding step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcidMods {
    pub slide: bool,  // glide from the previous pitch, no envelope retrigger
    pub accent: bool, // velocity boost
    pub tie: bool,    // sustain the previous note
}

/// Rule deciding whether a step fires on a given pass through its pattern.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum TrigCondition {
    /// Fires on pass `a` out of every `b` (1-based).
    Ratio { a: u8, b: u8 },
    /// Fires on every pass `Ratio { a, b }` doesn't.
    InverseRatio { a: u8, b: u8 },
    Fill,
    NotFill,
    Pre,
    NotPre,
    #[serde(rename = "none")]
    Always,
}

impl TrigCondition {
    pub fn ratio(a: u8, b: u8) -> Self {
        let (a, b) = clamp_ratio(a, b);
        TrigCondition::Ratio { a, b }
    }

    pub fn inverse_ratio(a: u8, b: u8) -> Self {
        let (a, b) = clamp_ratio(a, b);
        TrigCondition::InverseRatio { a, b }
    }

    pub fn normalized(self) -> Self {
        match self {
            TrigCondition::Ratio { a, b } => TrigCondition::ratio(a, b),
            TrigCondition::InverseRatio { a, b } => TrigCondition::inverse_ratio(a, b),
            other => other,
        }
    }
}

fn clamp_ratio(a: u8, b: u8) -> (u8, u8) {
    let b = b.max(1);
    (a.clamp(1, b), b)
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Step {
    pub active: bool,
    pub velocity: u8,    // 0..127
    pub probability: u8, // 0..100 percent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locks: Option<ParamLocks>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acid: Option<AcidMods>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<TrigCondition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slice_index: Option<u16>,
}

impl Default for Step {
    fn default() -> Self {
        Self {
            active: false,
            velocity: 100,
            probability: MAX_PROBABILITY,
            locks: None,
            acid: None,
            condition: None,
            slice_index: None,
        }
    }
}

impl Step {
    pub fn on() -> Self {
        Self { active: true, ..Self::default() }
    }

    pub fn with_velocity(mut self, velocity: u8) -> Self {
        self.velocity = velocity.min(MAX_VELOCITY);
        self
    }

    pub fn with_probability(mut self, probability: u8) -> Self {
        self.probability = probability.min(MAX_PROBABILITY);
        self
    }

    pub fn with_locks(mut self, locks: ParamLocks) -> Self {
        self.locks = (!locks.is_empty()).then_some(locks);
        self
    }

    pub fn with_acid(mut self, acid: AcidMods) -> Self {
        self.acid = Some(acid);
        self
    }

    pub fn with_condition(mut self, condition: TrigCondition) -> Self {
        self.condition = Some(condition.normalized());
        self
    }

    /// Pull every field back into its documented range.
    pub fn normalized(mut self) -> Self {
        self.velocity = self.velocity.min(MAX_VELOCITY);
        self.probability = self.probability.min(MAX_PROBABILITY);
        self.condition = self.condition.map(TrigCondition::normalized);
        self
    }
}
