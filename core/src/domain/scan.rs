//! Scan request and scan result models.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{HiddenNetwork, NetworkObservation};

// ============================================================================
// ScanBands
// ============================================================================

/// Set of frequency bands covered by a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScanBands(u32);

impl ScanBands {
    pub const NONE: ScanBands = ScanBands(0);
    pub const GHZ_24: ScanBands = ScanBands(1 << 0);
    pub const GHZ_5: ScanBands = ScanBands(1 << 1);
    pub const GHZ_5_DFS: ScanBands = ScanBands(1 << 2);
    pub const GHZ_6: ScanBands = ScanBands(1 << 3);
    pub const GHZ_60: ScanBands = ScanBands(1 << 4);
    /// 2.4GHz plus non-DFS 5GHz.
    pub const BOTH: ScanBands = ScanBands(Self::GHZ_24.0 | Self::GHZ_5.0);
    pub const ALL: ScanBands = ScanBands(
        Self::GHZ_24.0 | Self::GHZ_5.0 | Self::GHZ_5_DFS.0 | Self::GHZ_6.0 | Self::GHZ_60.0,
    );

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn from_bits(bits: u32) -> Self {
        ScanBands(bits & Self::ALL.0)
    }

    pub const fn union(self, other: ScanBands) -> Self {
        ScanBands(self.0 | other.0)
    }

    pub const fn contains(self, other: ScanBands) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether every band relevant to full-scan detection was covered.
    ///
    /// 6GHz and 60GHz are optional radios and never required.
    pub const fn is_full_band(self) -> bool {
        (self.0 | Self::GHZ_6.0 | Self::GHZ_60.0) == Self::ALL.0
    }
}

// ============================================================================
// ScanData
// ============================================================================

/// One homogeneous result set delivered by the scan engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanData {
    pub id: u32,
    pub scanned_bands: ScanBands,
    pub results: Vec<NetworkObservation>,
}

impl ScanData {
    pub fn new(id: u32, scanned_bands: ScanBands, results: Vec<NetworkObservation>) -> Self {
        Self {
            id,
            scanned_bands,
            results,
        }
    }

    /// Build a data set from bare frequencies, one synthetic access point each.
    ///
    /// BSSIDs are derived from `id` and the position so separate sets never
    /// collide unless the caller wants them to.
    pub fn synthetic(id: u32, scanned_bands: ScanBands, frequencies: &[u32]) -> Self {
        let results = frequencies
            .iter()
            .enumerate()
            .map(|(i, &freq)| {
                let bssid = format!(
                    "02:00:{:02x}:{:02x}:{:02x}:{:02x}",
                    (id >> 8) & 0xff,
                    id & 0xff,
                    freq & 0xff,
                    i
                );
                NetworkObservation::new(bssid, format!("ssid-{}-{}", id, i), freq)
                    .with_rssi(-40 - i as i32)
                    .with_timestamp(u64::from(id) * 1_000 + i as u64)
            })
            .collect();
        Self::new(id, scanned_bands, results)
    }

    /// Full-band sets replace the cache; anything narrower is merged.
    pub fn is_full_band(&self) -> bool {
        self.scanned_bands.is_full_band()
    }
}

// ============================================================================
// ScanSettings
// ============================================================================

/// Scan priority requested from the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScanType {
    LowLatency,
    HighAccuracy,
}

/// When the engine reports results back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReportEvents(u8);

impl ReportEvents {
    pub const AFTER_EACH_SCAN: ReportEvents = ReportEvents(1 << 0);
    pub const FULL_SCAN_RESULT: ReportEvents = ReportEvents(1 << 1);

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn union(self, other: ReportEvents) -> Self {
        ReportEvents(self.0 | other.0)
    }

    pub const fn contains(self, other: ReportEvents) -> bool {
        self.0 & other.0 == other.0
    }
}

/// Configuration handed to the engine for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanSettings {
    pub band: ScanBands,
    pub scan_type: ScanType,
    pub report_events: ReportEvents,
    pub hidden_networks: Vec<HiddenNetwork>,
    /// Restrict 6GHz scanning to preferred scanning channels.
    pub six_ghz_psc_only: bool,
}

impl ScanSettings {
    /// Settings for a one-shot request on behalf of an app.
    pub fn one_shot(elevated: bool, hidden_networks: Vec<HiddenNetwork>) -> Self {
        Self {
            band: ScanBands::ALL,
            scan_type: if elevated {
                ScanType::HighAccuracy
            } else {
                ScanType::LowLatency
            },
            report_events: ReportEvents::AFTER_EACH_SCAN.union(ReportEvents::FULL_SCAN_RESULT),
            hidden_networks,
            six_ghz_psc_only: !elevated,
        }
    }
}

// ============================================================================
// RequestId / ScanOutcome
// ============================================================================

/// Opaque token issued when a request is admitted.
///
/// Threaded through the engine call and its per-request listener so a
/// failure can be correlated with the request that caused it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Summary of one completed scan attempt as processed by the proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanOutcome {
    pub success: bool,
    pub is_full_band_scan: bool,
    /// Set when the outcome came through a per-request listener.
    pub request_id: Option<RequestId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_bands() {
        assert!(ScanBands::ALL.is_full_band());
        assert!(!ScanBands::BOTH.is_full_band());
        assert!(!ScanBands::GHZ_6.union(ScanBands::GHZ_60).is_full_band());
        assert!(ScanBands::ALL.contains(ScanBands::GHZ_6));
        assert!(!ScanBands::GHZ_24.contains(ScanBands::BOTH));
        assert_eq!(ScanBands::GHZ_24.union(ScanBands::GHZ_5), ScanBands::BOTH);
        assert_eq!(ScanBands::from_bits(0xff), ScanBands::ALL);
    }

    #[test]
    fn test_full_band_without_optional_radios() {
        let legacy = ScanBands::GHZ_24
            .union(ScanBands::GHZ_5)
            .union(ScanBands::GHZ_5_DFS);
        assert!(legacy.is_full_band());
        assert!(legacy.union(ScanBands::GHZ_6).is_full_band());
        assert!(!ScanBands::BOTH.union(ScanBands::GHZ_6).is_full_band());
    }

    #[test]
    fn test_synthetic_scan_data() {
        let data = ScanData::synthetic(1, ScanBands::ALL, &[2417, 2427, 5180]);
        assert_eq!(data.results.len(), 3);
        assert!(data.is_full_band());
        assert_ne!(data.results[0].bssid, data.results[1].bssid);

        let other = ScanData::synthetic(2, ScanBands::GHZ_24, &[2417]);
        assert!(!other.is_full_band());
        assert_ne!(other.results[0].bssid, data.results[0].bssid);
    }

    #[test]
    fn test_one_shot_settings() {
        let normal = ScanSettings::one_shot(false, Vec::new());
        assert_eq!(normal.band, ScanBands::ALL);
        assert_eq!(normal.scan_type, ScanType::LowLatency);
        assert!(normal
            .report_events
            .contains(ReportEvents::AFTER_EACH_SCAN.union(ReportEvents::FULL_SCAN_RESULT)));
        assert!(normal.six_ghz_psc_only);

        let elevated = ScanSettings::one_shot(true, vec![HiddenNetwork::new("test_ssid_1")]);
        assert_eq!(elevated.scan_type, ScanType::HighAccuracy);
        assert!(!elevated.six_ghz_psc_only);
        assert_eq!(elevated.hidden_networks.len(), 1);
    }

    #[test]
    fn test_request_ids_are_distinct() {
        assert_ne!(RequestId::new(), RequestId::new());
    }
}
