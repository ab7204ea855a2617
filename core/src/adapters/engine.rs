//! Simulated scan engine.
//!
//! Records every call and lets a driver decide when and how each scan
//! completes. Used by the CLI simulator and by tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::domain::{RequestId, ScanData, ScanSettings, WorkSource};
use crate::ports::{EngineProvider, ScanEngine};
use crate::registry::ScanListener;

/// One `start_scan` call as seen by the engine.
#[derive(Debug, Clone)]
pub struct RecordedScan {
    pub settings: ScanSettings,
    pub listener: ScanListener,
    pub work_source: WorkSource,
}

/// In-process scan engine driven by the caller.
#[derive(Debug, Default)]
pub struct SimulatedScanEngine {
    enabled: AtomicBool,
    enable_calls: RwLock<Vec<bool>>,
    global_listeners: RwLock<Vec<ScanListener>>,
    requests: RwLock<Vec<RecordedScan>>,
}

impl SimulatedScanEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_scanning_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Every `set_scanning_enabled` argument, in call order.
    pub fn scanning_enabled_calls(&self) -> Vec<bool> {
        self.enable_calls.read().clone()
    }

    pub fn global_listener_count(&self) -> usize {
        self.global_listeners.read().len()
    }

    pub fn requests(&self) -> Vec<RecordedScan> {
        self.requests.read().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.read().len()
    }

    pub fn last_request(&self) -> Option<RecordedScan> {
        self.requests.read().last().cloned()
    }

    /// Report results to every global listener, as a finished scan would.
    ///
    /// Returns how many listeners were called.
    pub fn deliver_results(&self, data: Vec<ScanData>) -> usize {
        let listeners = self.global_listeners.read().clone();
        debug!(listeners = listeners.len(), data_sets = data.len(), "Delivering scan results");
        for listener in &listeners {
            listener.on_results(data.clone());
        }
        listeners.len()
    }

    /// Report a failure to every global listener.
    pub fn fail_globally(&self, code: i32, reason: &str) -> usize {
        let listeners = self.global_listeners.read().clone();
        for listener in &listeners {
            listener.on_failure(code, reason);
        }
        listeners.len()
    }

    /// Report a failure on one request's own listener.
    pub fn fail_request(&self, request_id: RequestId, code: i32, reason: &str) -> bool {
        let listener = self
            .requests
            .read()
            .iter()
            .find(|r| r.listener.request_id() == Some(request_id))
            .map(|r| r.listener.clone());

        match listener {
            Some(listener) => {
                debug!(%request_id, code, reason, "Failing scan request");
                listener.on_failure(code, reason);
                true
            }
            None => false,
        }
    }

    /// Report a failure on the most recent request's listener.
    pub fn fail_last_request(&self, code: i32, reason: &str) -> bool {
        let last = self.last_request().and_then(|r| r.listener.request_id());
        match last {
            Some(request_id) => self.fail_request(request_id, code, reason),
            None => false,
        }
    }
}

impl ScanEngine for SimulatedScanEngine {
    fn register_scan_listener(&self, listener: ScanListener) {
        self.global_listeners.write().push(listener);
    }

    fn set_scanning_enabled(&self, enable: bool) {
        self.enabled.store(enable, Ordering::SeqCst);
        self.enable_calls.write().push(enable);
    }

    fn start_scan(&self, settings: ScanSettings, listener: ScanListener, work_source: WorkSource) {
        debug!(work_source = %work_source, "Simulated scan started");
        self.requests.write().push(RecordedScan {
            settings,
            listener,
            work_source,
        });
    }
}

/// Engine provider returning a fixed, swappable handle.
#[derive(Default)]
pub struct StaticEngineProvider {
    engine: RwLock<Option<Arc<dyn ScanEngine>>>,
}

impl StaticEngineProvider {
    pub fn new(engine: Arc<dyn ScanEngine>) -> Self {
        Self {
            engine: RwLock::new(Some(engine)),
        }
    }

    /// A provider whose engine can never be obtained.
    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn set_engine(&self, engine: Option<Arc<dyn ScanEngine>>) {
        *self.engine.write() = engine;
    }
}

impl EngineProvider for StaticEngineProvider {
    fn scan_engine(&self) -> Option<Arc<dyn ScanEngine>> {
        self.engine.read().clone()
    }
}
