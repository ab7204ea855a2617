//! In-process metrics counters.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use serde::Serialize;

use crate::domain::WorkSource;
use crate::ports::ScanMetrics;

/// Point-in-time copy of [`CountingMetrics`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub external_app_oneshot_scan_requests: u64,
    pub foreground_app_oneshot_scan_requests_throttled: u64,
    pub background_app_oneshot_scan_requests_throttled: u64,
    pub work_source_updates: u64,
    pub importance_updates: u64,
    pub last_work_source: Option<WorkSource>,
    pub last_importance: Option<i32>,
}

/// Metrics sink that keeps plain counters.
#[derive(Debug, Default)]
pub struct CountingMetrics {
    external_requests: AtomicU64,
    foreground_throttled: AtomicU64,
    background_throttled: AtomicU64,
    work_source_updates: AtomicU64,
    importance_updates: AtomicU64,
    last_work_source: RwLock<Option<WorkSource>>,
    last_importance: RwLock<Option<i32>>,
}

impl CountingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            external_app_oneshot_scan_requests: self.external_requests.load(Ordering::SeqCst),
            foreground_app_oneshot_scan_requests_throttled: self
                .foreground_throttled
                .load(Ordering::SeqCst),
            background_app_oneshot_scan_requests_throttled: self
                .background_throttled
                .load(Ordering::SeqCst),
            work_source_updates: self.work_source_updates.load(Ordering::SeqCst),
            importance_updates: self.importance_updates.load(Ordering::SeqCst),
            last_work_source: self.last_work_source.read().clone(),
            last_importance: *self.last_importance.read(),
        }
    }
}

impl ScanMetrics for CountingMetrics {
    fn increment_external_app_oneshot_scan_requests(&self) {
        self.external_requests.fetch_add(1, Ordering::SeqCst);
    }

    fn increment_foreground_app_oneshot_scan_requests_throttled(&self) {
        self.foreground_throttled.fetch_add(1, Ordering::SeqCst);
    }

    fn increment_background_app_oneshot_scan_requests_throttled(&self) {
        self.background_throttled.fetch_add(1, Ordering::SeqCst);
    }

    fn set_work_source(&self, work_source: &WorkSource) {
        self.work_source_updates.fetch_add(1, Ordering::SeqCst);
        *self.last_work_source.write() = Some(work_source.clone());
    }

    fn set_importance(&self, importance: i32) {
        self.importance_updates.fetch_add(1, Ordering::SeqCst);
        *self.last_importance.write() = Some(importance);
    }
}
