use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError};
use tracing::warn;

/// Fired when a track's own step counter crosses a bar line.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BarEvent {
    pub track: usize,
    /// 0 at transport start, then 1, 2, ...
    pub bar: u64,
    pub tick: u64,
    pub time_ms: f64,
}

/// Fan-out of bar events to any number of subscribers.
///
/// Sending never blocks. A full subscriber misses the event; a subscriber
/// whose receiver is gone is forgotten.
#[derive(Default)]
pub struct BarHub {
    subscribers: Vec<(u64, Sender<BarEvent>)>,
    next_id: u64,
}

impl BarHub {
    pub fn subscribe(&mut self, capacity: usize) -> BarSubscription {
        let (tx, rx) = crossbeam_channel::bounded(capacity.max(1));
        let id = self.next_id;
        self.next_id += 1;
        self.subscribers.push((id, tx));
        BarSubscription { id, rx }
    }

    pub fn publish(&mut self, event: BarEvent) {
        self.subscribers.retain(|(id, tx)| match tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(subscriber = id, bar = event.bar, "bar subscriber full, event dropped");
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        });
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

/// Receiving end of `Scheduler::on_bar`. Drop it (or call `unsubscribe`) to stop.
pub struct BarSubscription {
    id: u64,
    rx: Receiver<BarEvent>,
}

impl BarSubscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn try_recv(&self) -> Option<BarEvent> {
        match self.rx.try_recv() {
            Ok(ev) => Some(ev),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Everything queued right now, oldest first.
    pub fn drain(&self) -> Vec<BarEvent> {
        self.rx.try_iter().collect()
    }

    pub fn unsubscribe(self) {}
}
