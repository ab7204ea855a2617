//! Scan result cache.
//!
//! Holds at most one observation per BSSID. Full-band scans replace the
//! whole cache, narrower scans are upserted into it. When two observations
//! share a BSSID the one carrying an SSID wins, whichever arrived first:
//! hidden networks are often reported twice, once blank and once with the
//! probed name.

use std::collections::HashMap;

use crate::domain::{NetworkObservation, ScanData};
use crate::error::{Error, Result};

/// What a successful [`ScanResultCache::apply`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The cache was replaced; `entries` is its new size.
    Replaced { entries: usize },
    /// Results were upserted; `added` counts BSSIDs new to the cache.
    Merged { added: usize },
}

/// Deduplicated mapping from BSSID to its latest observation.
#[derive(Debug, Default)]
pub struct ScanResultCache {
    entries: HashMap<String, NetworkObservation>,
}

impl ScanResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one engine results callback.
    ///
    /// The callback must carry exactly one scan data set; anything else is
    /// malformed and leaves the cache untouched.
    pub fn apply(&mut self, data: &[ScanData]) -> Result<MergeOutcome> {
        let [scan_data] = data else {
            return Err(Error::MalformedResult {
                data_sets: data.len(),
            });
        };

        let full = scan_data.is_full_band();
        let before = self.entries.len();
        self.merge(&scan_data.results, full);

        Ok(if full {
            MergeOutcome::Replaced {
                entries: self.entries.len(),
            }
        } else {
            MergeOutcome::Merged {
                added: self.entries.len() - before,
            }
        })
    }

    /// Merge observations; `full_band` replaces instead of upserting.
    pub fn merge(&mut self, results: &[NetworkObservation], full_band: bool) {
        if full_band {
            let mut fresh = HashMap::with_capacity(results.len());
            for observation in results {
                upsert(&mut fresh, observation);
            }
            self.entries = fresh;
        } else {
            for observation in results {
                upsert(&mut self.entries, observation);
            }
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Independent copy of every cached observation.
    pub fn snapshot(&self) -> Vec<NetworkObservation> {
        self.entries.values().cloned().collect()
    }

    pub fn lookup(&self, bssid: &str) -> Option<NetworkObservation> {
        self.entries.get(&bssid.to_ascii_lowercase()).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Insert unless that would replace a named entry with a blank one.
fn upsert(entries: &mut HashMap<String, NetworkObservation>, observation: &NetworkObservation) {
    let key = observation.key();
    let keep_existing = !observation.has_ssid()
        && entries.get(&key).is_some_and(NetworkObservation::has_ssid);

    if !keep_existing {
        entries.insert(key, observation.clone());
    }
}
