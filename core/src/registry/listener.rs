//! Engine-facing scan listeners.

use crate::domain::{CallerId, RequestId, ScanData};
use crate::events::{EventSender, ListenerSource, ProxyEvent};

/// Listener handed to the scan engine.
///
/// Callbacks may arrive from any thread; they are only posted to the
/// owner's event queue, never applied in place.
#[derive(Debug, Clone)]
pub struct ScanListener {
    source: ListenerSource,
    events: EventSender,
}

impl ScanListener {
    /// The listener registered once with the engine.
    pub fn global(events: EventSender) -> Self {
        Self {
            source: ListenerSource::Global,
            events,
        }
    }

    /// A listener bound to exactly one forwarded request.
    pub fn for_request(request_id: RequestId, caller: CallerId, events: EventSender) -> Self {
        Self {
            source: ListenerSource::Request { request_id, caller },
            events,
        }
    }

    /// Request this listener belongs to, `None` for the global listener.
    pub fn request_id(&self) -> Option<RequestId> {
        match &self.source {
            ListenerSource::Global => None,
            ListenerSource::Request { request_id, .. } => Some(*request_id),
        }
    }

    /// Engine callback: scan finished with data.
    pub fn on_results(&self, data: Vec<ScanData>) {
        self.events.post(ProxyEvent::ScanResults {
            source: self.source.clone(),
            data,
        });
    }

    /// Engine callback: scan failed.
    pub fn on_failure(&self, code: i32, reason: impl Into<String>) {
        self.events.post(ProxyEvent::ScanFailure {
            source: self.source.clone(),
            code,
            reason: reason.into(),
        });
    }
}

/// Listeners are the same listener iff they have the same source.
impl PartialEq for ScanListener {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for ScanListener {}
