//! Settings store adapters.
//!
//! [`MemorySettingsStore`] keeps the flag in process. [`PersistentSettingsStore`]
//! mirrors it into the JSON config file managed by [`ConfigStore`].

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::config::ConfigStore;
use crate::error::{Error, Result};
use crate::ports::{SettingsListener, SettingsStore};

/// Flag value plus the listeners watching it.
struct ObservedFlag {
    value: RwLock<bool>,
    listeners: RwLock<Vec<SettingsListener>>,
}

impl ObservedFlag {
    fn new(value: bool) -> Self {
        Self {
            value: RwLock::new(value),
            listeners: RwLock::new(Vec::new()),
        }
    }

    fn get(&self) -> bool {
        *self.value.read()
    }

    /// Store `value`, notifying listeners if it changed.
    fn set(&self, value: bool) -> bool {
        let changed = {
            let mut current = self.value.write();
            let changed = *current != value;
            *current = value;
            changed
        };

        if changed {
            for listener in self.listeners.read().iter() {
                listener(value);
            }
        }
        changed
    }

    fn subscribe(&self, listener: SettingsListener) {
        self.listeners.write().push(listener);
    }
}

// ============================================================================
// MemorySettingsStore
// ============================================================================

/// In-process settings store.
pub struct MemorySettingsStore {
    flag: ObservedFlag,
}

impl MemorySettingsStore {
    pub fn new(scan_throttle_enabled: bool) -> Self {
        Self {
            flag: ObservedFlag::new(scan_throttle_enabled),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.flag.listeners.read().len()
    }
}

impl Default for MemorySettingsStore {
    fn default() -> Self {
        Self::new(true)
    }
}

impl SettingsStore for MemorySettingsStore {
    fn scan_throttle_enabled(&self) -> bool {
        self.flag.get()
    }

    fn set_scan_throttle_enabled(&self, enabled: bool) -> Result<()> {
        self.flag.set(enabled);
        Ok(())
    }

    fn register_change_listener(&self, listener: SettingsListener) {
        self.flag.subscribe(listener);
    }
}

// ============================================================================
// PersistentSettingsStore
// ============================================================================

struct PersistentInner {
    store: ConfigStore,
    flag: ObservedFlag,
    /// Serializes writes to the config file.
    write_lock: tokio::sync::Mutex<()>,
}

/// Settings store backed by the config file.
///
/// Reads come from the cached flag. Writes update the cache immediately and
/// persist in the background when called from inside a tokio runtime, or
/// inline on a short-lived runtime otherwise. Use [`flush`](Self::flush) to
/// wait for the file to match the cache.
#[derive(Clone)]
pub struct PersistentSettingsStore {
    inner: Arc<PersistentInner>,
}

impl PersistentSettingsStore {
    /// Load the flag from `store`.
    pub async fn open(store: ConfigStore) -> Result<Self> {
        let enabled = store.get_scan_throttle_enabled().await?;
        debug!(path = %store.config_path().display(), enabled, "Loaded scan throttle setting");
        Ok(Self {
            inner: Arc::new(PersistentInner {
                store,
                flag: ObservedFlag::new(enabled),
                write_lock: tokio::sync::Mutex::new(()),
            }),
        })
    }

    pub fn config_store(&self) -> &ConfigStore {
        &self.inner.store
    }

    /// Write the cached flag to disk.
    pub async fn flush(&self) -> Result<()> {
        persist(self.inner.clone()).await
    }
}

async fn persist(inner: Arc<PersistentInner>) -> Result<()> {
    let _guard = inner.write_lock.lock().await;
    // Read under the lock so the last writer always stores the latest value.
    let enabled = inner.flag.get();
    inner.store.set_scan_throttle_enabled(enabled).await
}

impl SettingsStore for PersistentSettingsStore {
    fn scan_throttle_enabled(&self) -> bool {
        self.inner.flag.get()
    }

    fn set_scan_throttle_enabled(&self, enabled: bool) -> Result<()> {
        self.inner.flag.set(enabled);

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let inner = self.inner.clone();
                handle.spawn(async move {
                    if let Err(e) = persist(inner).await {
                        warn!(error = %e, "Failed to persist scan throttle setting");
                    }
                });
                Ok(())
            }
            Err(_) => {
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .map_err(Error::Io)?;
                runtime.block_on(persist(self.inner.clone()))
            }
        }
    }

    fn register_change_listener(&self, listener: SettingsListener) {
        self.inner.flag.subscribe(listener);
    }
}
