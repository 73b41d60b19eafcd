use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender, TrySendError};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::warn;

use crate::audio_api::AudioCommand;
use crate::config::EngineConfig;

/// A monotonic clock shared with the renderer, in milliseconds.
///
/// Triggers are stamped against this clock, so the poll loop can wake up
/// late without the lateness reaching the audio.
pub trait Clock: Send {
    fn now_ms(&self) -> f64;
}

pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Clone, Default)]
pub struct ManualClock {
    bits: Arc<AtomicU64>, // f64 bit pattern
}

impl ManualClock {
    pub fn new(start_ms: f64) -> Self {
        let clock = Self::default();
        clock.set(start_ms);
        clock
    }

    pub fn set(&self, ms: f64) {
        self.bits.store(ms.to_bits(), Ordering::Relaxed);
    }

    pub fn advance(&self, ms: f64) {
        self.set(self.now_ms() + ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }
}

/// Everything the sequencer needs from the outside world, built once by the
/// owner and handed down explicitly: config, the clock, the seeded random
/// source and the renderer's command queue.
pub struct EngineContext {
    pub config: EngineConfig,
    clock: Box<dyn Clock>,
    rng: StdRng,
    renderer: Sender<AudioCommand>,
    dropped: u64,
}

impl EngineContext {
    pub fn new(
        config: EngineConfig,
        clock: impl Clock + 'static,
        renderer: Sender<AudioCommand>,
    ) -> Self {
        let config = config.validated();
        Self {
            rng: StdRng::seed_from_u64(config.seed),
            config,
            clock: Box::new(clock),
            renderer,
            dropped: 0,
        }
    }

    /// Build a context together with the receiving end of its renderer queue.
    pub fn with_channel(
        config: EngineConfig,
        clock: impl Clock + 'static,
    ) -> (Self, Receiver<AudioCommand>) {
        let (tx, rx) = crossbeam_channel::bounded(config.renderer_queue.max(1));
        (Self::new(config, clock, tx), rx)
    }

    pub fn now_ms(&self) -> f64 {
        self.clock.now_ms()
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Never blocks; a full or closed queue drops the command.
    pub fn send(&mut self, cmd: AudioCommand) -> bool {
        match self.renderer.try_send(cmd) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.dropped += 1;
                warn!(dropped = self.dropped, "renderer queue full, dropping command");
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                self.dropped += 1;
                false
            }
        }
    }

    pub fn dropped_commands(&self) -> u64 {
        self.dropped
    }
}
