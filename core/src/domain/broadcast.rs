//! System-wide events emitted by the proxy.

use serde::{Deserialize, Serialize};

/// Who receives a broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BroadcastTarget {
    /// Every interested receiver, across all users.
    AllUsers,
    /// Only receivers inside the named package.
    Package(String),
}

/// How the transport may coalesce queued deliveries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeliveryGroupPolicy {
    /// Only the most recent queued broadcast with the same matching key.
    MostRecent,
}

/// Delivery hints attached to successful results broadcasts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryOptions {
    pub policy: DeliveryGroupPolicy,
    pub matching_key: String,
    /// Hold delivery to cached (inactive) receivers until they resume.
    pub defer_until_active: bool,
}

impl DeliveryOptions {
    /// Options for a "scan results available" broadcast.
    ///
    /// Only successful results are coalesced; failures go out as-is.
    pub fn for_scan_results(succeeded: bool) -> Option<Self> {
        succeeded.then(|| Self {
            policy: DeliveryGroupPolicy::MostRecent,
            matching_key: Broadcast::SCAN_RESULTS_AVAILABLE.to_string(),
            defer_until_active: true,
        })
    }
}

/// Event delivered through the broadcast transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Broadcast {
    /// Scanning became available or unavailable. Sticky.
    ScanAvailabilityChanged { available: bool },
    /// A scan attempt finished.
    ScanResultsAvailable {
        updated: bool,
        target: BroadcastTarget,
        options: Option<DeliveryOptions>,
    },
}

impl Broadcast {
    pub const SCAN_AVAILABILITY_CHANGED: &'static str = "scan_availability_changed";
    pub const SCAN_RESULTS_AVAILABLE: &'static str = "scan_results_available";

    pub fn availability(available: bool) -> Self {
        Broadcast::ScanAvailabilityChanged { available }
    }

    /// Results broadcast addressed to every receiver.
    pub fn results(updated: bool) -> Self {
        Broadcast::ScanResultsAvailable {
            updated,
            target: BroadcastTarget::AllUsers,
            options: DeliveryOptions::for_scan_results(updated),
        }
    }

    /// Failure broadcast addressed to a single package.
    pub fn failure_to_package(package: impl Into<String>) -> Self {
        Broadcast::ScanResultsAvailable {
            updated: false,
            target: BroadcastTarget::Package(package.into()),
            options: DeliveryOptions::for_scan_results(false),
        }
    }

    pub fn action(&self) -> &'static str {
        match self {
            Broadcast::ScanAvailabilityChanged { .. } => Self::SCAN_AVAILABILITY_CHANGED,
            Broadcast::ScanResultsAvailable { .. } => Self::SCAN_RESULTS_AVAILABLE,
        }
    }

    /// Sticky broadcasts stay around for receivers registered later.
    pub fn is_sticky(&self) -> bool {
        matches!(self, Broadcast::ScanAvailabilityChanged { .. })
    }
}
