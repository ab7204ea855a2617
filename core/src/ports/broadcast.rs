//! Broadcast transport port (interface).

use crate::domain::Broadcast;

/// Port delivering addressed events to interested receivers.
pub trait BroadcastTransport: Send + Sync {
    fn send(&self, broadcast: Broadcast);
}
