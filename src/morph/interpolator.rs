use crate::pipeline::{Pattern, SceneSnapshot};
use crate::shared::lerp;

/// Cubic ease-in-out over `[0, 1]`.
pub fn ease_in_out_cubic(p: f32) -> f32 {
    let p = p.clamp(0.0, 1.0);
    if p < 0.5 {
        4.0 * p * p * p
    } else {
        1.0 - (-2.0 * p + 2.0).powi(3) / 2.0
    }
}

/// Blend two scenes at `progress`.
///
/// Continuous values (tempo, swing, humanize, volume, track params, and the
/// velocity and shared locks of steps that sound in both patterns) follow the
/// eased progress. Everything discrete stays on `from` until progress reaches
/// 1, where `commit_discrete` swaps it all in at once. Tracks and steps are
/// paired by index; unpaired ones only change at the commit.
pub fn interpolate(from: &SceneSnapshot, to: &SceneSnapshot, progress: f32) -> SceneSnapshot {
    let progress = if progress.is_nan() { 0.0 } else { progress.clamp(0.0, 1.0) };
    let t = ease_in_out_cubic(progress);

    let mut out = from.clone();
    out.bpm = lerp(from.bpm, to.bpm, t);
    out.swing = lerp(from.swing, to.swing, t);
    out.humanize_ms = lerp(from.humanize_ms, to.humanize_ms, t);
    out.master_volume = lerp(from.master_volume, to.master_volume, t);
    for (track, target) in out.tracks.iter_mut().zip(&to.tracks) {
        track.params = track.params.lerp(&target.params, t);
        blend_steps(&mut track.pattern, &target.pattern, t);
    }

    if progress >= 1.0 {
        commit_discrete(&mut out, to);
    }
    out
}

fn blend_steps(pattern: &mut Pattern, target: &Pattern, t: f32) {
    for (i, goal) in target.steps().iter().enumerate() {
        let Some(step) = pattern.step_mut(i) else { break };
        if !(step.active && goal.active) {
            continue;
        }
        step.velocity = lerp(step.velocity as f32, goal.velocity as f32, t).round() as u8;
        if let (Some(locks), Some(goal_locks)) = (step.locks.as_mut(), goal.locks.as_ref()) {
            *locks = locks.lerp_shared(goal_locks, t);
        }
    }
}

/// Copy every discrete field of `to` into `scene`: names, kinds, patterns,
/// mutes, waveforms and the track list itself.
pub fn commit_discrete(scene: &mut SceneSnapshot, to: &SceneSnapshot) {
    scene.format_version = to.format_version;
    scene.name.clone_from(&to.name);
    scene.tracks.truncate(to.tracks.len());
    for (track, target) in scene.tracks.iter_mut().zip(&to.tracks) {
        track.name.clone_from(&target.name);
        track.kind = target.kind;
        track.pattern.clone_from(&target.pattern);
        track.muted = target.muted;
        track.waveform = target.waveform;
    }
    let have = scene.tracks.len();
    scene.tracks.extend(to.tracks[have..].iter().cloned());
}

#[derive(Clone, Debug, PartialEq)]
pub struct MorphFrame {
    pub scene: SceneSnapshot,
    pub progress: f32,
    /// Discrete state has been committed; this is the last frame.
    pub committed: bool,
}

#[derive(Clone, Debug)]
struct Transition {
    from: SceneSnapshot,
    to: SceneSnapshot,
    start_ms: f64,
    duration_ms: f64,
}

/// Drives scene blends, either on a clock (`start_transition` + `on_frame`)
/// or from an external amount control (`set_morph_amount`).
#[derive(Clone, Debug, Default)]
pub struct SceneInterpolator {
    transition: Option<Transition>,
    endpoints: Option<(SceneSnapshot, SceneSnapshot)>,
    amount: f32,
}

impl SceneInterpolator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Any transition already running is dropped where it stands.
    pub fn start_transition(
        &mut self,
        from: SceneSnapshot,
        to: SceneSnapshot,
        duration_ms: f64,
        now_ms: f64,
    ) {
        let duration_ms = duration_ms.max(0.0);
        self.transition = Some(Transition { from, to, start_ms: now_ms, duration_ms });
    }

    pub fn cancel(&mut self) {
        self.transition = None;
    }

    pub fn is_transitioning(&self) -> bool {
        self.transition.is_some()
    }

    pub fn on_frame(&mut self, now_ms: f64) -> Option<MorphFrame> {
        let tr = self.transition.as_ref()?;
        let progress = if tr.duration_ms <= 0.0 {
            1.0
        } else {
            ((now_ms - tr.start_ms) / tr.duration_ms).clamp(0.0, 1.0) as f32
        };
        let scene = interpolate(&tr.from, &tr.to, progress);
        let committed = progress >= 1.0;
        if committed {
            self.transition = None;
        }
        Some(MorphFrame { scene, progress, committed })
    }

    pub fn set_morph_endpoints(&mut self, from: SceneSnapshot, to: SceneSnapshot) {
        self.endpoints = Some((from, to));
    }

    pub fn clear_morph(&mut self) {
        self.endpoints = None;
        self.amount = 0.0;
    }

    pub fn has_morph(&self) -> bool {
        self.endpoints.is_some()
    }

    pub fn morph_amount(&self) -> f32 {
        self.amount
    }

    /// Re-render the morph at `amount`. Takes over from any timed transition.
    pub fn set_morph_amount(&mut self, amount: f32) -> Option<MorphFrame> {
        self.transition = None;
        self.amount = if amount.is_nan() { 0.0 } else { amount.clamp(0.0, 1.0) };
        let (from, to) = self.endpoints.as_ref()?;
        Some(MorphFrame {
            scene: interpolate(from, to, self.amount),
            progress: self.amount,
            committed: self.amount >= 1.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{ParamLocks, Step, Track, TrackKind, Waveform};

    fn scenes() -> (SceneSnapshot, SceneSnapshot) {
        let from = SceneSnapshot::default_kit();
        let mut to = SceneSnapshot::default_kit();
        to.name = "b".into();
        to.bpm = 140.0;
        to.swing = 0.5;
        to.master_volume = 0.3;
        to.tracks[0].params.filter_cutoff = 400.0;
        to.tracks[0].params.pitch = -12.0;
        to.tracks[0].pattern = Pattern::from_gates(&[true, false, true]);
        to.tracks[3].waveform = Waveform::Saw;
        to.tracks[2].muted = true;
        (from, to)
    }

    #[test]
    fn ease_endpoints_and_middle() {
        assert_eq!(ease_in_out_cubic(0.0), 0.0);
        assert_eq!(ease_in_out_cubic(0.5), 0.5);
        assert_eq!(ease_in_out_cubic(1.0), 1.0);
        assert!(ease_in_out_cubic(0.25) < 0.25);
        assert!(ease_in_out_cubic(0.75) > 0.75);
    }

    #[test]
    fn endpoints_are_exact() {
        let (from, to) = scenes();
        assert_eq!(interpolate(&from, &to, 0.0), from);
        assert_eq!(interpolate(&from, &to, 1.0), to);
    }

    #[test]
    fn discrete_holds_until_the_end() {
        let (from, to) = scenes();
        for p in [0.1, 0.5, 0.9, 0.999] {
            let mid = interpolate(&from, &to, p);
            assert_eq!(mid.tracks[0].pattern, from.tracks[0].pattern);
            assert_eq!(mid.tracks[3].waveform, from.tracks[3].waveform);
            assert_eq!(mid.tracks[2].muted, from.tracks[2].muted);
            assert_eq!(mid.name, from.name);
        }
        let half = interpolate(&from, &to, 0.5);
        assert_eq!(half.bpm, 130.0);
        assert_eq!(half.tracks[0].params.pitch, -6.0);
    }

    #[test]
    fn paired_steps_blend_velocity_and_shared_locks() {
        let (mut from, mut to) = scenes();
        let mut a = Pattern::new(4);
        let locks =
            ParamLocks { filter_cutoff: Some(200.0), pitch: Some(3.0), ..ParamLocks::default() };
        a.set_step(0, Step::on().with_velocity(40).with_locks(locks));
        a.set_step(1, Step::on().with_velocity(90));
        let mut b = Pattern::new(4);
        let locks = ParamLocks { filter_cutoff: Some(1_000.0), ..ParamLocks::default() };
        b.set_step(0, Step::on().with_velocity(120).with_locks(locks));
        b.set_step(2, Step::on().with_velocity(10));
        from.tracks[0].pattern = a.clone();
        to.tracks[0].pattern = b.clone();

        let half = interpolate(&from, &to, 0.5);
        let steps = half.tracks[0].pattern.steps();
        assert_eq!(steps[0].velocity, 80);
        let locks = steps[0].locks.unwrap();
        assert_eq!(locks.filter_cutoff, Some(600.0));
        assert_eq!(locks.pitch, Some(3.0));
        // only one side sounds: held until the commit
        assert_eq!(steps[1], a.steps()[1]);
        assert_eq!(steps[2], a.steps()[2]);

        assert_eq!(interpolate(&from, &to, 1.0).tracks[0].pattern, b);
    }

    #[test]
    fn unmatched_tracks_switch_on_commit() {
        let (from, mut to) = scenes();
        to.tracks.push(Track::new(TrackKind::Sample).named("extra"));
        assert_eq!(interpolate(&from, &to, 0.7).tracks.len(), 5);
        assert_eq!(interpolate(&from, &to, 1.0).tracks.len(), 6);

        to.tracks.truncate(2);
        assert_eq!(interpolate(&from, &to, 0.7).tracks.len(), 5);
        assert_eq!(interpolate(&from, &to, 1.0), to);
    }

    #[test]
    fn timed_transition_runs_and_finishes() {
        let (from, to) = scenes();
        let mut morph = SceneInterpolator::new();
        morph.start_transition(from.clone(), to.clone(), 1_000.0, 100.0);

        let half = morph.on_frame(600.0).unwrap();
        assert_eq!(half.progress, 0.5);
        assert!(!half.committed);
        assert_eq!(half.scene.bpm, 130.0);

        let last = morph.on_frame(1_200.0).unwrap();
        assert!(last.committed);
        assert_eq!(last.scene, to);
        assert!(!morph.is_transitioning());
        assert!(morph.on_frame(1_300.0).is_none());
    }

    #[test]
    fn new_transition_replaces_old() {
        let (from, to) = scenes();
        let mut morph = SceneInterpolator::new();
        morph.start_transition(from.clone(), to.clone(), 1_000.0, 0.0);
        morph.start_transition(to.clone(), from.clone(), 1_000.0, 500.0);
        let frame = morph.on_frame(500.0).unwrap();
        assert_eq!(frame.scene, to);
    }

    #[test]
    fn morph_amount_cancels_timed_transition() {
        let (from, to) = scenes();
        let mut morph = SceneInterpolator::new();
        assert!(morph.set_morph_amount(0.5).is_none());

        morph.set_morph_endpoints(from.clone(), to.clone());
        morph.start_transition(from.clone(), to.clone(), 1_000.0, 0.0);
        let frame = morph.set_morph_amount(0.25).unwrap();
        assert!(!morph.is_transitioning());
        assert_eq!(frame.scene.tracks[0].pattern, from.tracks[0].pattern);
        assert_eq!(morph.set_morph_amount(3.0).unwrap().scene, to);
        assert_eq!(morph.morph_amount(), 1.0);
    }
}
