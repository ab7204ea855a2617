//! Ports layer - Trait definitions (interfaces).
//!
//! This module defines the interfaces the proxy uses to talk to its
//! collaborators. Implementations live in `adapters`.

mod broadcast;
mod engine;
mod hidden;
mod metrics;
mod oracle;
mod settings;

pub use broadcast::BroadcastTransport;
pub use engine::{EngineProvider, ScanEngine};
pub use hidden::HiddenNetworkProvider;
pub use metrics::ScanMetrics;
pub use oracle::{ImportanceOracle, PermissionOracle};
pub use settings::{SettingsListener, SettingsStore};
