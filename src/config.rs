use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Runtime knobs for the engine. Everything has a default, so a config file
/// only needs the keys it changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How often the control thread polls the scheduler.
    pub poll_interval_ms: f64,
    /// How far ahead of `now` each poll schedules triggers.
    pub lookahead_ms: f64,
    pub steps_per_bar: u32,
    /// Velocity added by an accented step.
    pub accent_boost: u8,
    /// Seed for probability, humanize and random patterns.
    pub seed: u64,
    /// Redraw period for timed scene transitions.
    pub morph_frame_ms: f64,
    pub renderer_queue: usize,
    pub bar_queue: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 25.0,
            lookahead_ms: 100.0,
            steps_per_bar: 16,
            accent_boost: 32,
            seed: 0x5eed,
            morph_frame_ms: 16.0,
            renderer_queue: 1024,
            bar_queue: 64,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(data: &str) -> anyhow::Result<Self> {
        let config: EngineConfig = serde_json::from_str(data).context("invalid engine config")?;
        Ok(config.validated())
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_json_str(&data)
    }

    /// The lookahead has to cover at least one poll interval or steps fall
    /// between windows.
    pub fn validated(mut self) -> Self {
        self.poll_interval_ms = self.poll_interval_ms.clamp(1.0, 1_000.0);
        self.lookahead_ms = self.lookahead_ms.max(self.poll_interval_ms);
        self.steps_per_bar = self.steps_per_bar.max(1);
        self.morph_frame_ms = self.morph_frame_ms.max(1.0);
        self.renderer_queue = self.renderer_queue.max(1);
        self.bar_queue = self.bar_queue.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let config = EngineConfig::from_json_str(r#"{ "lookahead_ms": 150, "seed": 7 }"#).unwrap();
        assert_eq!(config.lookahead_ms, 150.0);
        assert_eq!(config.seed, 7);
        assert_eq!(config.poll_interval_ms, 25.0);
        assert_eq!(config.steps_per_bar, 16);
    }

    #[test]
    fn lookahead_never_shorter_than_poll() {
        let json = r#"{ "poll_interval_ms": 40, "lookahead_ms": 10 }"#;
        let config = EngineConfig::from_json_str(json).unwrap();
        assert_eq!(config.lookahead_ms, 40.0);
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(EngineConfig::from_json_str("[1, 2").is_err());
    }
}
