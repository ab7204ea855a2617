//! Metrics sink port (interface).

use crate::domain::WorkSource;

/// Port for scan request metrics.
pub trait ScanMetrics: Send + Sync {
    /// An app request went through throttle evaluation.
    fn increment_external_app_oneshot_scan_requests(&self);

    fn increment_foreground_app_oneshot_scan_requests_throttled(&self);

    fn increment_background_app_oneshot_scan_requests_throttled(&self);

    /// Attribution of the request being forwarded.
    fn set_work_source(&self, work_source: &WorkSource);

    /// Importance of the caller being forwarded.
    fn set_importance(&self, importance: i32);
}
