use tracing::debug;

use super::bar::BarEvent;
use crate::pipeline::PatternChain;
use crate::shared::SceneId;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChainAction {
    /// Load this scene now.
    Switch(SceneId),
    /// Reached the end of a non-looping chain; it has disabled itself.
    Finished,
}

/// Walks a `PatternChain` forward on bar events.
///
/// Only bars from `sync_track` count. Bar 0 is the downbeat the transport
/// starts on, so it opens the first pattern instead of closing one.
#[derive(Clone, Debug, Default)]
pub struct PatternChainController {
    chain: PatternChain,
    pub sync_track: usize,
    bars_elapsed: u32,
}

impl PatternChainController {
    pub fn new(chain: PatternChain) -> Self {
        Self { chain, sync_track: 0, bars_elapsed: 0 }
    }

    pub fn chain(&self) -> &PatternChain {
        &self.chain
    }

    pub fn set_chain(&mut self, chain: PatternChain) {
        self.chain = chain;
        self.chain.cursor = 0;
        self.bars_elapsed = 0;
    }

    pub fn is_enabled(&self) -> bool {
        self.chain.enabled && !self.chain.is_empty()
    }

    /// Enable from the top; returns the scene to load first.
    pub fn start(&mut self) -> Option<SceneId> {
        self.chain.enabled = true;
        self.chain.cursor = 0;
        self.bars_elapsed = 0;
        self.chain.current()
    }

    pub fn reset_bar_count(&mut self) {
        self.bars_elapsed = 0;
    }

    pub fn stop(&mut self) {
        self.chain.enabled = false;
        self.bars_elapsed = 0;
    }

    pub fn on_bar(&mut self, event: &BarEvent) -> Option<ChainAction> {
        if !self.is_enabled() || event.track != self.sync_track || event.bar == 0 {
            return None;
        }
        self.bars_elapsed += 1;
        if self.bars_elapsed < self.chain.bars_per_pattern() as u32 {
            return None;
        }
        self.bars_elapsed = 0;

        let next = self.chain.cursor + 1;
        if next < self.chain.scenes.len() {
            self.chain.cursor = next;
        } else if self.chain.looping {
            self.chain.cursor = 0;
        } else {
            self.chain.enabled = false;
            debug!(bar = event.bar, "chain finished");
            return Some(ChainAction::Finished);
        }
        let scene = self.chain.current()?;
        debug!(bar = event.bar, cursor = self.chain.cursor, scene = scene.0, "chain advance");
        Some(ChainAction::Switch(scene))
    }

    /// A scene picked by hand: jump the cursor to its first slot in the chain,
    /// if it has one, and start counting bars again.
    pub fn select_scene(&mut self, id: SceneId) {
        if let Some(pos) = self.chain.position_of(id) {
            self.chain.cursor = pos;
            self.bars_elapsed = 0;
        }
    }
}
