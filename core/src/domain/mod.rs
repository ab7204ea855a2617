//! Domain layer - Pure data models.
//!
//! This module contains the entities exchanged between callers, the proxy
//! and the scan engine. These types have no I/O dependencies and can be
//! tested in isolation.

mod broadcast;
mod caller;
mod network;
mod scan;

// Re-export all domain types
pub use broadcast::{Broadcast, BroadcastTarget, DeliveryGroupPolicy, DeliveryOptions};
pub use caller::{CallerClass, CallerId, WorkSource};
pub use network::{HiddenNetwork, NetworkObservation};
pub use scan::{ReportEvents, RequestId, ScanBands, ScanData, ScanOutcome, ScanSettings, ScanType};
