//! Broadcast transport that queues events for a poller.

use parking_lot::RwLock;
use tracing::debug;

use crate::domain::Broadcast;
use crate::ports::BroadcastTransport;

/// Queues broadcasts until a consumer drains them.
///
/// The latest availability broadcast is also kept separately, as a sticky
/// broadcast would be for receivers that register late.
#[derive(Debug, Default)]
pub struct QueuedBroadcaster {
    pending: RwLock<Vec<Broadcast>>,
    sticky: RwLock<Option<Broadcast>>,
}

impl QueuedBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get and clear pending broadcasts.
    pub fn take_pending(&self) -> Vec<Broadcast> {
        std::mem::take(&mut *self.pending.write())
    }

    /// Check if there are pending broadcasts.
    pub fn has_pending(&self) -> bool {
        !self.pending.read().is_empty()
    }

    /// The last sticky broadcast sent, if any.
    pub fn sticky(&self) -> Option<Broadcast> {
        self.sticky.read().clone()
    }
}

impl BroadcastTransport for QueuedBroadcaster {
    fn send(&self, broadcast: Broadcast) {
        debug!(action = broadcast.action(), ?broadcast, "Broadcast");
        if broadcast.is_sticky() {
            *self.sticky.write() = Some(broadcast.clone());
        }
        self.pending.write().push(broadcast);
    }
}
