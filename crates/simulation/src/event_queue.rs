//! Event ordering for the simulation queue.

use crate::NodeIndex;
use forklock_core::Event;
use std::time::Duration;

/// Key ordering events in the simulation queue.
///
/// Fields compare in declaration order. `sequence` is unique and increases
/// with every scheduled event, so two messages on the same link that land
/// at the same instant are still delivered in send order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventKey {
    /// Simulated time at which the event fires.
    pub time: Duration,
    /// Lower fires first among events at the same instant.
    pub priority: u8,
    /// Node the event is delivered to.
    pub node: NodeIndex,
    /// Global scheduling order.
    pub sequence: u64,
}

impl EventKey {
    /// Build the key for `event` at `node`.
    pub fn new(time: Duration, node: NodeIndex, sequence: u64, event: &Event) -> Self {
        Self {
            time,
            priority: Self::priority_of(event),
            node,
            sequence,
        }
    }

    /// Messages are delivered before local requests scheduled for the same
    /// instant, and releases happen before new lock requests.
    pub fn priority_of(event: &Event) -> u8 {
        match event {
            Event::MessageReceived { .. } => 0,
            Event::UnlockRequested => 1,
            Event::LockRequested => 2,
        }
    }
}
