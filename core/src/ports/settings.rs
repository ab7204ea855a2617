//! Settings persistence port (interface).

use crate::error::Result;

/// Callback fired with the new value whenever the throttle flag changes.
pub type SettingsListener = Box<dyn Fn(bool) + Send + Sync>;

/// Port for the persisted scan-throttle flag.
pub trait SettingsStore: Send + Sync {
    fn scan_throttle_enabled(&self) -> bool;

    fn set_scan_throttle_enabled(&self, enabled: bool) -> Result<()>;

    /// Subscribe to changes, including ones made by other writers.
    fn register_change_listener(&self, listener: SettingsListener);
}
