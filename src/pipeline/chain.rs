use serde::{Deserialize, Serialize};

use crate::shared::{SceneId, MAX_BARS_PER_PATTERN};

/// An ordered playlist of scenes, each held for `bars_per_pattern` bars.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PatternChain {
    pub scenes: Vec<SceneId>,
    bars_per_pattern: u8,
    pub looping: bool,
    pub enabled: bool,
    #[serde(skip)]
    pub cursor: usize,
}

impl Default for PatternChain {
    fn default() -> Self {
        Self {
            scenes: Vec::new(),
            bars_per_pattern: 1,
            looping: true,
            enabled: false,
            cursor: 0,
        }
    }
}

impl PatternChain {
    pub fn new(scenes: Vec<SceneId>, bars_per_pattern: u8, looping: bool) -> Self {
        let mut chain = Self { scenes, looping, ..Self::default() };
        chain.set_bars_per_pattern(bars_per_pattern);
        chain
    }

    pub fn bars_per_pattern(&self) -> u8 {
        self.bars_per_pattern
    }

    pub fn set_bars_per_pattern(&mut self, bars: u8) {
        self.bars_per_pattern = bars.clamp(1, MAX_BARS_PER_PATTERN);
    }

    pub fn current(&self) -> Option<SceneId> {
        self.scenes.get(self.cursor).copied()
    }

    pub fn position_of(&self, id: SceneId) -> Option<usize> {
        self.scenes.iter().position(|&s| s == id)
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }
}
