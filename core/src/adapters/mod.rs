//! Adapters layer - Collaborator implementations.
//!
//! This module contains implementations of the port traits defined in
//! `ports`: in-process stand-ins for the host environment, a simulated scan
//! engine, and the file-backed settings store.

pub mod broadcast;
pub mod engine;
pub mod hidden;
pub mod metrics;
pub mod oracle;
pub mod settings;

// Re-export main types for convenience
pub use broadcast::QueuedBroadcaster;
pub use engine::{RecordedScan, SimulatedScanEngine, StaticEngineProvider};
pub use hidden::StaticHiddenNetworks;
pub use metrics::{CountingMetrics, MetricsSnapshot};
pub use oracle::{StaticImportanceOracle, StaticPermissionOracle};
pub use settings::{MemorySettingsStore, PersistentSettingsStore};
