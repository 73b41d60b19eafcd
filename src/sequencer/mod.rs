// Everything that runs on the control thread once per poll: deciding which
// steps fire, what they fire with, and when bars go by.

mod bar;
mod chain;
mod condition;
mod plock;
mod scheduler;
mod transport;

pub use bar::{BarEvent, BarHub, BarSubscription};
pub use chain::{ChainAction, PatternChainController};
pub use condition::{condition_passes, probability_passes, should_fire, ConditionContext};
pub use plock::{resolve as resolve_trigger, AcidState, StepSlot};
pub use scheduler::{PollReport, Scheduler};
pub use transport::{FillState, ScheduledFill};
