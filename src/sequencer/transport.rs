// Transport-wide fill flag. A fill is either held manually (set_fill) or
// scheduled to cover whole bars starting at the next bar boundary, which is
// what gives PRE steps something to look ahead to.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScheduledFill {
    pub start_tick: u64,
    pub end_tick: u64, // exclusive
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FillState {
    pub manual: bool,
    pub scheduled: Option<ScheduledFill>,
}

impl FillState {
    pub fn is_fill(&self, tick: u64) -> bool {
        self.manual || self.scheduled.is_some_and(|s| (s.start_tick..s.end_tick).contains(&tick))
    }

    /// True only on the tick right before a scheduled fill kicks in.
    pub fn is_pre(&self, tick: u64) -> bool {
        self.scheduled.is_some_and(|s| s.start_tick == tick + 1)
    }

    /// Start a fill on the first bar boundary after `next_tick`, lasting `bars` bars.
    pub fn schedule(&mut self, next_tick: u64, steps_per_bar: u32, bars: u32) -> ScheduledFill {
        let spb = steps_per_bar.max(1) as u64;
        let start_tick = (next_tick / spb + 1) * spb;
        let fill = ScheduledFill { start_tick, end_tick: start_tick + spb * bars.max(1) as u64 };
        self.scheduled = Some(fill);
        fill
    }

    // drop a scheduled fill once the clock has moved past it
    pub fn expire(&mut self, tick: u64) {
        if self.scheduled.is_some_and(|s| tick >= s.end_tick) {
            self.scheduled = None;
        }
    }

    pub fn clear(&mut self) {
        *self = FillState::default();
    }
}
