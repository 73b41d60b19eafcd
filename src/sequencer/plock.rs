use crate::audio_api::{EnvelopeMode, TriggerParams};
use crate::pipeline::{ParamLocks, Step, Track};
use crate::shared::MAX_VELOCITY;

/// Per-track memory for slide and tie: the pitch of the last step that sounded.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AcidState {
    pub last_pitch: Option<f32>,
}

/// Where and how long one step sits on the clock, before its own locks apply.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepSlot {
    pub track: usize,
    pub step: usize,
    /// nominal + swing + humanize, absolute ms
    pub time_ms: f64,
    pub interval_ms: f64,
}

/// Turn one sounding step into its trigger(s).
///
/// The track's base params are read, never written; whatever the locks change
/// lives only in the returned triggers. A ratchet of N gives N triggers spread
/// evenly over the step, and only the first of them carries slide or tie.
pub fn resolve(
    track: &Track,
    step: &Step,
    slot: StepSlot,
    accent_boost: u8,
    acid: &mut AcidState,
) -> Vec<TriggerParams> {
    let default_locks = ParamLocks::default();
    let locks = step.locks.as_ref().unwrap_or(&default_locks);
    let mut params = locks.merge(&track.params);
    let mods = step.acid.unwrap_or_default();

    let envelope = match (mods.tie, mods.slide, acid.last_pitch) {
        (true, _, Some(prev)) => {
            params.pitch = prev;
            EnvelopeMode::Tie
        }
        (false, true, Some(prev)) => EnvelopeMode::Slide { from_pitch: prev },
        _ => EnvelopeMode::Retrigger,
    };
    acid.last_pitch = Some(params.pitch);

    let velocity = if mods.accent {
        step.velocity.saturating_add(accent_boost).min(MAX_VELOCITY)
    } else {
        step.velocity.min(MAX_VELOCITY)
    };

    let count = locks.ratchet_count();
    let start = slot.time_ms + locks.micro_timing();
    let sub = slot.interval_ms / count as f64;

    (0..count)
        .map(|i| TriggerParams {
            track: slot.track,
            kind: track.kind,
            step: slot.step,
            time_ms: start + sub * i as f64,
            velocity,
            params,
            waveform: track.waveform,
            reverse: locks.reverse,
            envelope: if i == 0 { envelope } else { EnvelopeMode::Retrigger },
            accent: mods.accent,
            ratchet_index: i,
            ratchet_count: count,
            slice_index: step.slice_index,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{AcidMods, TrackKind, TrackParams};

    fn slot(time_ms: f64) -> StepSlot {
        StepSlot { track: 2, step: 5, time_ms, interval_ms: 125.0 }
    }

    fn synth() -> Track {
        let mut track = Track::new(TrackKind::Synth);
        track.params.pitch = 3.0;
        track
    }

    #[test]
    fn locks_override_without_touching_base() {
        let track = synth();
        let locks = ParamLocks { gain: Some(0.2), reverse: true, ..ParamLocks::default() };
        let step = Step::on().with_locks(locks);
        let mut acid = AcidState::default();

        let out = resolve(&track, &step, slot(1000.0), 32, &mut acid);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].params.gain, 0.2);
        assert_eq!(out[0].params.pitch, 3.0);
        assert!(out[0].reverse);
        assert_eq!(track.params.gain, TrackParams::default().gain);
    }

    #[test]
    fn ratchet_splits_the_step() {
        let locks = ParamLocks { ratchet: 4, micro_timing_ms: Some(10.0), ..ParamLocks::default() };
        let step = Step::on().with_locks(locks);
        let mut acid = AcidState::default();

        let out = resolve(&synth(), &step, slot(1000.0), 32, &mut acid);
        let times: Vec<f64> = out.iter().map(|t| t.time_ms).collect();
        assert_eq!(times, vec![1010.0, 1041.25, 1072.5, 1103.75]);
        assert!(out.iter().all(|t| t.ratchet_count == 4));
        assert_eq!(out[3].ratchet_index, 3);
    }

    #[test]
    fn accent_boosts_and_caps_velocity() {
        let accent = AcidMods { accent: true, ..AcidMods::default() };
        let mut acid = AcidState::default();
        let soft = Step::on().with_velocity(60).with_acid(accent);
        let loud = Step::on().with_velocity(120).with_acid(accent);
        assert_eq!(resolve(&synth(), &soft, slot(0.0), 32, &mut acid)[0].velocity, 92);
        assert_eq!(resolve(&synth(), &loud, slot(0.0), 32, &mut acid)[0].velocity, 127);
    }

    #[test]
    fn slide_and_tie_need_a_previous_note() {
        let slide = Step::on().with_acid(AcidMods { slide: true, ..AcidMods::default() });
        let mut acid = AcidState::default();
        let first = resolve(&synth(), &slide, slot(0.0), 32, &mut acid);
        assert_eq!(first[0].envelope, EnvelopeMode::Retrigger);

        let mut higher = synth();
        higher.params.pitch = 7.0;
        let second = resolve(&higher, &slide, slot(125.0), 32, &mut acid);
        assert_eq!(second[0].envelope, EnvelopeMode::Slide { from_pitch: 3.0 });
        assert_eq!(second[0].params.pitch, 7.0);
        assert_eq!(acid.last_pitch, Some(7.0));
    }

    #[test]
    fn tie_holds_previous_pitch() {
        let mut acid = AcidState { last_pitch: Some(-5.0) };
        let tie = Step::on().with_acid(AcidMods { tie: true, ..AcidMods::default() });
        let out = resolve(&synth(), &tie, slot(0.0), 32, &mut acid);
        assert_eq!(out[0].envelope, EnvelopeMode::Tie);
        assert_eq!(out[0].params.pitch, -5.0);
        assert_eq!(acid.last_pitch, Some(-5.0));
    }

    #[test]
    fn only_first_ratchet_slides() {
        let mut acid = AcidState { last_pitch: Some(0.0) };
        let step = Step::on()
            .with_locks(ParamLocks { ratchet: 3, ..ParamLocks::default() })
            .with_acid(AcidMods { slide: true, ..AcidMods::default() });
        let out = resolve(&synth(), &step, slot(0.0), 32, &mut acid);
        assert_eq!(out[0].envelope, EnvelopeMode::Slide { from_pitch: 0.0 });
        assert!(out[1..].iter().all(|t| t.envelope == EnvelopeMode::Retrigger));
    }
}
