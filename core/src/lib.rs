//! ScanProxy Core Library
//!
//! Request arbitration and result caching between apps asking for network
//! scans and the single scan engine that performs them.
//! Provides functionality to:
//! - Admit or throttle one-shot scan requests per caller
//! - Forward admitted requests to the scan engine with a per-request listener
//! - Keep a deduplicated cache of the latest scan results
//! - Notify broadcast receivers and registered callbacks of outcomes
//!
//! # Architecture
//! This library follows hexagonal architecture (ports & adapters):
//! - `domain`: Pure data models
//! - `ports`: Trait definitions (interfaces) for external collaborators
//! - `adapters`: In-process collaborator implementations
//!
//! The stateful core is `throttle`, `cache` and `registry`, tied together by
//! `proxy`. All asynchronous input reaches the proxy through the `events`
//! queue; `service` runs a proxy on a single tokio task.

// Hexagonal architecture layers
pub mod adapters;
pub mod domain;
pub mod ports;

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod proxy;
pub mod registry;
pub mod service;
pub mod throttle;

// Re-export domain types (primary API)
pub use domain::{
    Broadcast, BroadcastTarget, CallerClass, CallerId, HiddenNetwork, NetworkObservation,
    RequestId, ScanBands, ScanData, ScanOutcome, ScanSettings, ScanType,
};

// Re-export other commonly used types
pub use cache::ScanResultCache;
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::{Config, ConfigStore, ThrottleConfig};
pub use error::{Error, Result};
pub use events::{EventSender, ProxyEvent};
pub use proxy::{Collaborators, ScanRequestProxy};
pub use registry::{CallbackToken, DeathRecipient, ScanResultsCallback};
pub use service::{ProxyHandle, ProxyService};
pub use throttle::{Admission, Decision, ThrottlePolicy};
