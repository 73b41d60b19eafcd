// grooveseq: a step-sequencer core. It decides when every step fires and with
// what parameters, and hands timestamped triggers to an external renderer.

pub mod audio;
pub mod audio_api;
pub mod config;
pub mod context;
pub mod error;
pub mod generate;
pub mod loader;
pub mod middle;
pub mod morph;
pub mod pipeline;
pub mod sequencer;
pub mod shared;

pub use config::EngineConfig;
pub use context::{Clock, EngineContext, ManualClock, SystemClock};
pub use error::SnapshotError;
pub use middle::{Middle, TickReport};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
