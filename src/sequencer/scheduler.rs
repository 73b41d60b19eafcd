use std::collections::VecDeque;

use rand::Rng;
use tracing::{debug, info, warn};

use super::bar::{BarEvent, BarHub, BarSubscription};
use super::condition::{should_fire, ConditionContext};
use super::plock::{self, AcidState, StepSlot};
use super::transport::{FillState, ScheduledFill};
use crate::audio_api::AudioCommand;
use crate::context::EngineContext;
use crate::pipeline::{SceneSnapshot, Track, TrackParams};
use crate::shared::{
    step_interval_ms, TransportState, DEFAULT_BPM, MAX_BPM, MAX_HUMANIZE_MS, MAX_SWING, MIN_BPM,
};

// fraction of the unswung gap that humanize may eat on either side
const HUMANIZE_HEADROOM: f64 = 0.49;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct TrackCursor {
    step_index: usize,
    repeat_count: u64,
    acid: AcidState,
}

// cursor state as it was right before a tick that was scheduled ahead of now,
// so pause can hand those ticks back
#[derive(Clone, Debug)]
struct Rewind {
    tick: u64,
    time_ms: f64,
    // latest trigger the tick sent; swing, humanize, micro timing and
    // ratchets can put it well after `time_ms`
    last_trigger_ms: f64,
    cursors: Vec<TrackCursor>,
}

impl Rewind {
    fn is_spent(&self, now: f64) -> bool {
        self.time_ms.max(self.last_trigger_ms) < now
    }
}

/// What one `poll` did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PollReport {
    pub triggers: usize,
    pub overruns: u32,
    pub missed_steps: u64,
    pub bars: usize,
    /// `poll_to_bar` stopped at a bar line it just announced.
    pub bar_pending: bool,
}

impl PollReport {
    pub fn absorb(&mut self, other: PollReport) {
        self.triggers += other.triggers;
        self.overruns += other.overruns;
        self.missed_steps += other.missed_steps;
        self.bars += other.bars;
        self.bar_pending = other.bar_pending;
    }
}

/// Lookahead step scheduler.
///
/// Every track shares one global tick clock; each keeps its own step index,
/// so a 12-step track against a 16-step one drifts and realigns every
/// `polyrhythm_period` steps. `poll` hands out every trigger whose nominal
/// time falls in `[now, now + lookahead)`, stamped with absolute clock time.
pub struct Scheduler {
    state: TransportState,
    name: String,
    tracks: Vec<Track>,
    cursors: Vec<TrackCursor>,
    bpm: f32,
    swing: f32,
    humanize_ms: f32,
    master_volume: f32,
    fill: FillState,
    next_tick: u64,
    next_tick_time: f64,
    pending: VecDeque<Rewind>,
    last_bar_tick: Option<u64>,
    bars: BarHub,
    overruns: u64,
}

impl Scheduler {
    pub fn new(scene: &SceneSnapshot) -> Self {
        let mut scheduler = Self {
            state: TransportState::Stopped,
            name: String::new(),
            tracks: Vec::new(),
            cursors: Vec::new(),
            bpm: DEFAULT_BPM,
            swing: 0.0,
            humanize_ms: 0.0,
            master_volume: 0.8,
            fill: FillState::default(),
            next_tick: 0,
            next_tick_time: 0.0,
            pending: VecDeque::new(),
            last_bar_tick: None,
            bars: BarHub::default(),
            overruns: 0,
        };
        scheduler.apply_scene(scene);
        scheduler
    }

    // --- transport ---

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == TransportState::Playing
    }

    pub fn play(&mut self, ctx: &EngineContext) {
        if self.state == TransportState::Playing {
            return;
        }
        let from = self.state;
        self.state = TransportState::Playing;
        self.next_tick_time = ctx.now_ms();
        info!(?from, tick = self.next_tick, bpm = self.bpm, "transport: play");
    }

    /// Keeps every track's position. Triggers already handed out past `now`
    /// are cancelled and their ticks replayed on resume.
    pub fn pause(&mut self, ctx: &mut EngineContext) {
        if self.state != TransportState::Playing {
            return;
        }
        let now = ctx.now_ms();
        ctx.send(AudioCommand::CancelFrom { time_ms: now });
        self.rewind_to(now);
        self.state = TransportState::Paused;
        info!(tick = self.next_tick, "transport: pause");
    }

    pub fn stop(&mut self, ctx: &mut EngineContext) {
        if self.state == TransportState::Stopped {
            return;
        }
        if self.state == TransportState::Playing {
            let now = ctx.now_ms();
            ctx.send(AudioCommand::CancelFrom { time_ms: now });
        }
        self.state = TransportState::Stopped;
        self.reset_position();
        info!("transport: stop");
    }

    fn reset_position(&mut self) {
        self.cursors.iter_mut().for_each(|c| *c = TrackCursor::default());
        self.next_tick = 0;
        self.pending.clear();
        self.last_bar_tick = None;
        self.fill.clear();
    }

    // back to the first tick with anything at or after `now`, which is
    // everything `CancelFrom { now }` takes away
    fn rewind_to(&mut self, now: f64) {
        while self.pending.front().is_some_and(|r| r.is_spent(now)) {
            self.pending.pop_front();
        }
        if let Some(r) = self.pending.pop_front() {
            self.next_tick = r.tick;
            self.next_tick_time = r.time_ms;
            // tracks added since then keep their fresh cursors
            for (cursor, saved) in self.cursors.iter_mut().zip(r.cursors) {
                *cursor = saved;
            }
        }
        self.pending.clear();
    }

    pub fn set_bpm(&mut self, bpm: f32) {
        self.bpm = bpm.clamp(MIN_BPM, MAX_BPM);
    }

    pub fn set_swing(&mut self, swing: f32) {
        self.swing = swing.clamp(0.0, MAX_SWING);
    }

    pub fn set_humanize(&mut self, humanize_ms: f32) {
        self.humanize_ms = humanize_ms.clamp(0.0, MAX_HUMANIZE_MS);
    }

    pub fn set_master_volume(&mut self, volume: f32) -> f32 {
        self.master_volume = volume.clamp(0.0, 1.0);
        self.master_volume
    }

    pub fn bpm(&self) -> f32 {
        self.bpm
    }

    pub fn swing(&self) -> f32 {
        self.swing
    }

    pub fn humanize_ms(&self) -> f32 {
        self.humanize_ms
    }

    pub fn master_volume(&self) -> f32 {
        self.master_volume
    }

    pub fn interval_ms(&self) -> f64 {
        step_interval_ms(self.bpm)
    }

    // --- fills ---

    pub fn set_fill(&mut self, on: bool) {
        self.fill.manual = on;
    }

    pub fn schedule_fill(&mut self, bars: u32, ctx: &EngineContext) -> ScheduledFill {
        let fill = self.fill.schedule(self.next_tick, ctx.config.steps_per_bar, bars);
        debug!(start = fill.start_tick, end = fill.end_tick, "fill scheduled");
        fill
    }

    pub fn fill_state(&self) -> FillState {
        self.fill
    }

    // --- bars ---

    pub fn on_bar(&mut self, capacity: usize) -> BarSubscription {
        self.bars.subscribe(capacity)
    }

    // --- scene / tracks ---

    /// Swap in a scene's tracks and tempo settings without touching the
    /// transport. Positions carry over by track index; a shorter pattern
    /// wraps the position into range.
    pub fn apply_scene(&mut self, scene: &SceneSnapshot) {
        self.name.clone_from(&scene.name);
        self.tracks.clone_from(&scene.tracks);
        self.cursors.resize(self.tracks.len(), TrackCursor::default());
        for (cursor, track) in self.cursors.iter_mut().zip(&self.tracks) {
            cursor.step_index %= track.len().max(1);
        }
        self.set_bpm(scene.bpm);
        self.set_swing(scene.swing);
        self.set_humanize(scene.humanize_ms);
        self.set_master_volume(scene.master_volume);
    }

    pub fn snapshot(&self) -> SceneSnapshot {
        SceneSnapshot {
            name: self.name.clone(),
            bpm: self.bpm,
            swing: self.swing,
            humanize_ms: self.humanize_ms,
            master_volume: self.master_volume,
            tracks: self.tracks.clone(),
            ..SceneSnapshot::default()
        }
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn track_mut(&mut self, index: usize) -> Option<&mut Track> {
        self.tracks.get_mut(index)
    }

    /// Base params are read when a step fires, so this takes effect on the
    /// next trigger that isn't already queued.
    pub fn set_track_params(&mut self, index: usize, params: TrackParams) -> bool {
        match self.tracks.get_mut(index) {
            Some(track) => {
                track.params = params.clamped();
                true
            }
            None => false,
        }
    }

    pub fn step_positions(&self) -> Vec<usize> {
        self.cursors.iter().map(|c| c.step_index).collect()
    }

    pub fn repeat_counts(&self) -> Vec<u64> {
        self.cursors.iter().map(|c| c.repeat_count).collect()
    }

    pub fn next_tick(&self) -> u64 {
        self.next_tick
    }

    pub fn total_overruns(&self) -> u64 {
        self.overruns
    }

    // --- the poll ---

    pub fn poll(&mut self, ctx: &mut EngineContext) -> PollReport {
        self.advance(ctx, false)
    }

    /// Like `poll`, but stops in front of a bar line after announcing it, so
    /// bar subscribers get to swap the scene before that bar's first step is
    /// scheduled. Call again until `bar_pending` comes back false.
    pub fn poll_to_bar(&mut self, ctx: &mut EngineContext) -> PollReport {
        self.advance(ctx, true)
    }

    fn advance(&mut self, ctx: &mut EngineContext, stop_at_bar: bool) -> PollReport {
        let mut report = PollReport::default();
        if self.state != TransportState::Playing {
            return report;
        }
        let now = ctx.now_ms();
        let horizon = now + ctx.config.lookahead_ms;

        while self.pending.front().is_some_and(|r| r.is_spent(now)) {
            self.pending.pop_front();
        }

        // anything already in the past is lost; keep counting so bars and
        // repeats stay in step with the clock
        while self.next_tick_time < now {
            self.run_tick(ctx, false, &mut report);
            report.missed_steps += 1;
        }
        if report.missed_steps > 0 {
            report.overruns += 1;
            self.overruns += 1;
            warn!(
                missed = report.missed_steps,
                tick = self.next_tick,
                "lookahead window overrun"
            );
        }

        while self.next_tick_time < horizon {
            if self.publish_bar(ctx, &mut report) && stop_at_bar {
                report.bar_pending = true;
                break;
            }
            let (tick, time_ms) = (self.next_tick, self.next_tick_time);
            let cursors = self.cursors.clone();
            let last_trigger_ms = self.run_tick(ctx, true, &mut report);
            self.pending.push_back(Rewind { tick, time_ms, last_trigger_ms, cursors });
        }
        report
    }

    // announce the bar starting at next_tick, once
    fn publish_bar(&mut self, ctx: &EngineContext, report: &mut PollReport) -> bool {
        let tick = self.next_tick;
        let steps_per_bar = ctx.config.steps_per_bar.max(1) as u64;
        if tick % steps_per_bar != 0 || self.last_bar_tick.is_some_and(|t| tick <= t) {
            return false;
        }
        let bar = tick / steps_per_bar;
        for track in 0..self.tracks.len() {
            self.bars.publish(BarEvent { track, bar, tick, time_ms: self.next_tick_time });
        }
        self.last_bar_tick = Some(tick);
        report.bars += 1;
        true
    }

    // returns the time of the latest trigger sent, or -inf for a silent tick
    fn run_tick(&mut self, ctx: &mut EngineContext, sound: bool, report: &mut PollReport) -> f64 {
        let tick = self.next_tick;
        let time_ms = self.next_tick_time;
        let interval = self.interval_ms();
        self.publish_bar(ctx, report);

        self.fill.expire(tick);
        let fill = self.fill.is_fill(tick);
        let pre_fill = self.fill.is_pre(tick);

        let swing_ms = self.swing as f64 * interval;
        let jitter_bound =
            (self.humanize_ms as f64).min((1.0 - self.swing as f64) * interval * HUMANIZE_HEADROOM);
        let accent_boost = ctx.config.accent_boost;
        let mut last_trigger_ms = f64::NEG_INFINITY;

        let tracks = self.tracks.iter().zip(self.cursors.iter_mut());
        for (index, (track, cursor)) in tracks.enumerate() {
            let len = track.len().max(1);
            let step_index = cursor.step_index % len;

            if sound && !track.muted {
                let cx = ConditionContext { repeat_count: cursor.repeat_count, fill, pre_fill };
                if let Some(step) = track.pattern.step(step_index)
                    && should_fire(step, &cx, ctx.rng())
                {
                    let mut at = time_ms;
                    if step_index % 2 == 1 {
                        at += swing_ms;
                    }
                    if jitter_bound > 0.0 {
                        at += ctx.rng().gen_range(-jitter_bound..=jitter_bound);
                    }
                    let slot = StepSlot {
                        track: index,
                        step: step_index,
                        time_ms: at,
                        interval_ms: interval,
                    };
                    let resolved =
                        plock::resolve(track, step, slot, accent_boost, &mut cursor.acid);
                    for trigger in resolved {
                        last_trigger_ms = last_trigger_ms.max(trigger.time_ms);
                        if ctx.send(AudioCommand::Trigger(trigger)) {
                            report.triggers += 1;
                        }
                    }
                }
            }

            cursor.step_index = step_index + 1;
            if cursor.step_index >= len {
                cursor.step_index = 0;
                cursor.repeat_count += 1;
            }
        }

        self.next_tick += 1;
        self.next_tick_time += interval;
        last_trigger_ms
    }
}
