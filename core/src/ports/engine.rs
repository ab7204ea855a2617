//! Scan engine port (interface).

use std::sync::Arc;

use crate::domain::{ScanSettings, WorkSource};
use crate::registry::ScanListener;

/// Port for the underlying scan engine.
///
/// Calls never block; outcomes arrive later through the listeners.
pub trait ScanEngine: Send + Sync {
    /// Register the listener that receives every scan outcome.
    fn register_scan_listener(&self, listener: ScanListener);

    /// Turn scanning on or off.
    fn set_scanning_enabled(&self, enable: bool);

    /// Start one scan. `listener` receives only this request's outcome.
    fn start_scan(&self, settings: ScanSettings, listener: ScanListener, work_source: WorkSource);
}

/// Port for obtaining the engine handle.
///
/// Returns `None` while the engine is unreachable.
pub trait EngineProvider: Send + Sync {
    fn scan_engine(&self) -> Option<Arc<dyn ScanEngine>>;
}
