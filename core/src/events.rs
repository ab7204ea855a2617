//! Owner-context event queue.
//!
//! Everything that reaches the proxy asynchronously (engine callbacks,
//! death notifications, settings changes) is posted here and applied later
//! by the owner, so cache and throttle state are only ever touched from one
//! context.

use tokio::sync::mpsc;
use tracing::trace;

use crate::domain::{CallerId, RequestId, ScanData};
use crate::registry::CallbackToken;

/// Which listener an engine callback arrived on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerSource {
    /// The single listener registered with the engine for every scan.
    Global,
    /// The listener created for one forwarded request.
    Request {
        request_id: RequestId,
        caller: CallerId,
    },
}

/// Input waiting to be applied on the owner context.
#[derive(Debug, Clone)]
pub enum ProxyEvent {
    ScanResults {
        source: ListenerSource,
        data: Vec<ScanData>,
    },
    ScanFailure {
        source: ListenerSource,
        code: i32,
        reason: String,
    },
    CallbackDied {
        token: CallbackToken,
        generation: u64,
    },
    ThrottleSettingChanged(bool),
}

/// Cloneable posting end of the event queue.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<ProxyEvent>,
}

impl EventSender {
    /// Post an event. Events posted after the proxy is gone are dropped.
    pub fn post(&self, event: ProxyEvent) {
        if let Err(e) = self.tx.send(event) {
            trace!(event = ?e.0, "Dropping event for stopped proxy");
        }
    }
}

/// Create a connected sender/receiver pair.
pub fn channel() -> (EventSender, mpsc::UnboundedReceiver<ProxyEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSender { tx }, rx)
}
