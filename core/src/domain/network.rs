//! Network observation models.

use serde::{Deserialize, Serialize};

// ============================================================================
// NetworkObservation
// ============================================================================

/// One access point seen by a scan.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkObservation {
    /// Hardware address of the access point.
    pub bssid: String,
    /// Network name; empty for hidden networks seen without a probe.
    pub ssid: String,
    /// Centre frequency in MHz.
    pub frequency_mhz: u32,
    /// Received signal strength in dBm.
    pub rssi_dbm: i32,
    /// Capture time, microseconds since boot.
    pub timestamp_us: u64,
}

impl NetworkObservation {
    pub fn new(bssid: impl Into<String>, ssid: impl Into<String>, frequency_mhz: u32) -> Self {
        Self {
            bssid: bssid.into(),
            ssid: ssid.into(),
            frequency_mhz,
            rssi_dbm: -60,
            timestamp_us: 0,
        }
    }

    pub fn with_rssi(mut self, rssi_dbm: i32) -> Self {
        self.rssi_dbm = rssi_dbm;
        self
    }

    pub fn with_timestamp(mut self, timestamp_us: u64) -> Self {
        self.timestamp_us = timestamp_us;
        self
    }

    /// Cache key: BSSIDs compare case-insensitively.
    pub fn key(&self) -> String {
        self.bssid.to_ascii_lowercase()
    }

    /// Whether the observation carries a network name.
    pub fn has_ssid(&self) -> bool {
        !self.ssid.is_empty()
    }
}

// ============================================================================
// HiddenNetwork
// ============================================================================

/// A network that must be probed for explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HiddenNetwork {
    pub ssid: String,
}

impl HiddenNetwork {
    pub fn new(ssid: impl Into<String>) -> Self {
        Self { ssid: ssid.into() }
    }
}
