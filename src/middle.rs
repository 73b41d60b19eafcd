// The control layer. Owns the engine context and every piece of sequencer
// state, and is the only thing that writes to them. The host calls `tick`
// once per poll interval and the transport/scene methods whenever the user
// does something; the renderer only ever hears from us through the
// context's command queue.

use std::collections::BTreeMap;

use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;
use tracing::{debug, info, warn};

use crate::audio_api::AudioCommand;
use crate::context::EngineContext;
use crate::error::SnapshotError;
use crate::generate::{self, RandomPatternGenerator};
use crate::morph::{MorphFrame, SceneInterpolator};
use crate::pipeline::{PatternChain, SceneSnapshot, TrackParams};
use crate::sequencer::{
    BarSubscription, ChainAction, PatternChainController, PollReport, ScheduledFill, Scheduler,
};
use crate::shared::{SceneId, TransportState};

/// What happened during one `Middle::tick`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickReport {
    pub poll: PollReport,
    pub morph_progress: Option<f32>,
    pub switched_to: Option<SceneId>,
    pub chain_finished: bool,
}

pub struct Middle {
    ctx: EngineContext,
    scheduler: Scheduler,
    bars: BarSubscription,
    chain: PatternChainController,
    morph: SceneInterpolator,
    morph_target: Option<SceneId>,
    last_frame_ms: Option<f64>,
    scenes: BTreeMap<SceneId, SceneSnapshot>,
    current: Option<SceneId>,
}

impl Middle {
    pub fn new(ctx: EngineContext, scene: SceneSnapshot) -> Self {
        let mut scheduler = Scheduler::new(&scene);
        let bars = scheduler.on_bar(ctx.config.bar_queue);
        Self {
            ctx,
            scheduler,
            bars,
            chain: PatternChainController::default(),
            morph: SceneInterpolator::new(),
            morph_target: None,
            last_frame_ms: None,
            scenes: BTreeMap::new(),
            current: None,
        }
    }

    pub fn tick(&mut self) -> TickReport {
        let mut report = TickReport::default();

        if let Some(frame) = self.next_morph_frame() {
            report.morph_progress = Some(frame.progress);
            self.apply_frame(frame);
        }

        loop {
            let poll = self.scheduler.poll_to_bar(&mut self.ctx);
            report.poll.absorb(poll);
            for event in self.bars.drain() {
                match self.chain.on_bar(&event) {
                    Some(ChainAction::Switch(id)) => {
                        if self.load_from_bank(id) {
                            report.switched_to = Some(id);
                        } else {
                            warn!(scene = id.0, "chain points at an empty scene slot");
                        }
                    }
                    Some(ChainAction::Finished) => report.chain_finished = true,
                    None => {}
                }
            }
            if !poll.bar_pending {
                break;
            }
        }
        report
    }

    fn next_morph_frame(&mut self) -> Option<MorphFrame> {
        if !self.morph.is_transitioning() {
            self.last_frame_ms = None;
            return None;
        }
        let now = self.ctx.now_ms();
        if self.last_frame_ms.is_some_and(|t| now - t < self.ctx.config.morph_frame_ms) {
            return None;
        }
        self.last_frame_ms = Some(now);
        self.morph.on_frame(now)
    }

    fn apply_frame(&mut self, frame: MorphFrame) {
        self.apply(&frame.scene);
        if frame.committed {
            if let Some(id) = self.morph_target.take() {
                self.current = Some(id);
                self.chain.select_scene(id);
            }
            debug!("morph committed");
        }
    }

    // hand a scene to the scheduler, telling the renderer if the volume moved
    fn apply(&mut self, scene: &SceneSnapshot) {
        let before = self.scheduler.master_volume();
        self.scheduler.apply_scene(scene);
        let after = self.scheduler.master_volume();
        if after != before {
            self.ctx.send(AudioCommand::SetMasterVolume(after));
        }
    }

    fn load_from_bank(&mut self, id: SceneId) -> bool {
        let Some(scene) = self.scenes.get(&id).cloned() else {
            return false;
        };
        self.morph.cancel();
        self.morph.clear_morph();
        self.morph_target = None;
        self.apply(&scene);
        self.current = Some(id);
        info!(scene = id.0, name = %scene.name, "scene loaded");
        true
    }

    // --- transport ---

    pub fn play(&mut self) {
        self.scheduler.play(&self.ctx);
    }

    pub fn pause(&mut self) {
        self.scheduler.pause(&mut self.ctx);
    }

    pub fn stop(&mut self) {
        self.scheduler.stop(&mut self.ctx);
        // the bar count restarts with the transport
        self.chain.reset_bar_count();
    }

    pub fn transport(&self) -> TransportState {
        self.scheduler.state()
    }

    pub fn set_bpm(&mut self, bpm: f32) {
        self.scheduler.set_bpm(bpm);
    }

    pub fn set_swing(&mut self, swing: f32) {
        self.scheduler.set_swing(swing);
    }

    pub fn set_humanize(&mut self, humanize_ms: f32) {
        self.scheduler.set_humanize(humanize_ms);
    }

    pub fn set_master_volume(&mut self, volume: f32) {
        let v = self.scheduler.set_master_volume(volume);
        self.ctx.send(AudioCommand::SetMasterVolume(v));
    }

    pub fn set_fill(&mut self, on: bool) {
        self.scheduler.set_fill(on);
    }

    pub fn schedule_fill(&mut self, bars: u32) -> ScheduledFill {
        self.scheduler.schedule_fill(bars, &self.ctx)
    }

    // --- tracks ---

    pub fn set_track_params(&mut self, track: usize, params: TrackParams) -> bool {
        self.scheduler.set_track_params(track, params)
    }

    pub fn toggle_step(&mut self, track: usize, step: usize) -> bool {
        match self.scheduler.track_mut(track) {
            Some(t) if step < t.len() => {
                t.pattern.toggle(step);
                true
            }
            _ => false,
        }
    }

    pub fn set_track_length(&mut self, track: usize, len: usize) -> bool {
        match self.scheduler.track_mut(track) {
            Some(t) => {
                t.pattern.resize(len);
                true
            }
            None => false,
        }
    }

    pub fn euclidean_track(&mut self, track: usize, pulses: usize, rotation: usize) -> bool {
        match self.scheduler.track_mut(track) {
            Some(t) => {
                let gates = generate::euclidean(pulses, t.len(), rotation);
                t.pattern.apply_gates(&gates);
                true
            }
            None => false,
        }
    }

    pub fn apply_preset(&mut self, track: usize, name: &str) -> bool {
        let Some(preset) = generate::preset(name) else {
            return false;
        };
        match self.scheduler.track_mut(track) {
            Some(t) => {
                preset.apply(&mut t.pattern);
                true
            }
            None => false,
        }
    }

    /// Random gates from the engine's seeded rng, so a seed reproduces the pattern.
    pub fn randomize_track(&mut self, track: usize, generator: RandomPatternGenerator) -> bool {
        // fork so pattern generation doesn't shift the probability rolls of playback
        let mut rng = StdRng::seed_from_u64(self.ctx.rng().gen_range(0..u64::MAX));
        match self.scheduler.track_mut(track) {
            Some(t) => {
                generator.apply(&mut t.pattern, &mut rng);
                true
            }
            None => false,
        }
    }

    // --- scenes ---

    pub fn current_scene(&self) -> Option<SceneId> {
        self.current
    }

    pub fn snapshot(&self) -> SceneSnapshot {
        self.scheduler.snapshot()
    }

    pub fn scene(&self, id: SceneId) -> Option<&SceneSnapshot> {
        self.scenes.get(&id)
    }

    /// Save whatever is playing right now into slot `id`.
    pub fn store_scene(&mut self, id: SceneId) {
        self.scenes.insert(id, self.scheduler.snapshot());
        self.current = Some(id);
    }

    pub fn insert_scene(&mut self, id: SceneId, scene: SceneSnapshot) {
        self.scenes.insert(id, scene.normalized());
    }

    /// Jump straight to a stored scene. The chain, if it contains it, follows.
    pub fn recall_scene(&mut self, id: SceneId) -> bool {
        if !self.load_from_bank(id) {
            return false;
        }
        self.chain.select_scene(id);
        true
    }

    /// Glide from the current state to a stored scene over `duration_ms`.
    pub fn morph_to(&mut self, id: SceneId, duration_ms: f64) -> bool {
        let Some(to) = self.scenes.get(&id).cloned() else {
            return false;
        };
        let now = self.ctx.now_ms();
        self.morph.start_transition(self.scheduler.snapshot(), to, duration_ms, now);
        self.morph_target = Some(id);
        self.last_frame_ms = None;
        true
    }

    pub fn is_morphing(&self) -> bool {
        self.morph.is_transitioning()
    }

    /// Arm the morph control between two stored scenes.
    pub fn set_morph(&mut self, from: SceneId, to: SceneId) -> bool {
        match (self.scenes.get(&from), self.scenes.get(&to)) {
            (Some(a), Some(b)) => {
                self.morph.set_morph_endpoints(a.clone(), b.clone());
                true
            }
            _ => false,
        }
    }

    pub fn set_morph_amount(&mut self, amount: f32) -> Option<f32> {
        let frame = self.morph.set_morph_amount(amount)?;
        self.morph_target = None;
        let progress = frame.progress;
        self.apply(&frame.scene);
        Some(progress)
    }

    // --- chain ---

    pub fn set_chain(&mut self, chain: PatternChain) {
        self.chain.set_chain(chain);
    }

    pub fn chain(&self) -> &PatternChain {
        self.chain.chain()
    }

    /// Enable the chain from its first scene and load that scene.
    pub fn start_chain(&mut self) -> Option<SceneId> {
        let first = self.chain.start()?;
        if !self.load_from_bank(first) {
            warn!(scene = first.0, "chain starts on an empty scene slot");
        }
        Some(first)
    }

    pub fn stop_chain(&mut self) {
        self.chain.stop();
    }

    // --- documents ---

    pub fn export_scene(&self) -> Result<String, SnapshotError> {
        self.scheduler.snapshot().export_json()
    }

    pub fn import_scene(&mut self, data: &str) -> Result<(), SnapshotError> {
        let scene = SceneSnapshot::import_json(data)?;
        info!(name = %scene.name, tracks = scene.tracks.len(), "scene imported");
        self.morph.cancel();
        self.morph_target = None;
        self.apply(&scene);
        Ok(())
    }

    // --- access ---

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn context(&self) -> &EngineContext {
        &self.ctx
    }
}
