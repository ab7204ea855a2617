//! Table-driven importance and permission oracles.

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;

use crate::ports::{ImportanceOracle, PermissionOracle};

/// Importance of a visible, foreground app.
pub const IMPORTANCE_FOREGROUND: i32 = 100;
/// Importance of an app running a foreground service.
pub const IMPORTANCE_FOREGROUND_SERVICE: i32 = 125;
/// Importance of a cached, backgrounded app.
pub const IMPORTANCE_CACHED: i32 = 400;

/// Importance oracle backed by a package table.
#[derive(Debug)]
pub struct StaticImportanceOracle {
    default_importance: i32,
    importance: RwLock<HashMap<String, i32>>,
}

impl StaticImportanceOracle {
    /// Unknown packages report `default_importance`.
    pub fn new(default_importance: i32) -> Self {
        Self {
            default_importance,
            importance: RwLock::new(HashMap::new()),
        }
    }

    pub fn set_importance(&self, package: impl Into<String>, importance: i32) {
        self.importance.write().insert(package.into(), importance);
    }
}

impl Default for StaticImportanceOracle {
    fn default() -> Self {
        Self::new(IMPORTANCE_FOREGROUND)
    }
}

impl ImportanceOracle for StaticImportanceOracle {
    fn package_importance(&self, package: &str) -> i32 {
        self.importance
            .read()
            .get(package)
            .copied()
            .unwrap_or(self.default_importance)
    }
}

/// Permission oracle backed by uid sets.
#[derive(Debug, Default)]
pub struct StaticPermissionOracle {
    network_settings: RwLock<HashSet<u32>>,
    setup_wizard: RwLock<HashSet<u32>>,
}

impl StaticPermissionOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant_network_settings(&self, uid: u32) {
        self.network_settings.write().insert(uid);
    }

    pub fn grant_setup_wizard(&self, uid: u32) {
        self.setup_wizard.write().insert(uid);
    }

    pub fn revoke_all(&self, uid: u32) {
        self.network_settings.write().remove(&uid);
        self.setup_wizard.write().remove(&uid);
    }
}

impl PermissionOracle for StaticPermissionOracle {
    fn has_network_settings_permission(&self, uid: u32) -> bool {
        self.network_settings.read().contains(&uid)
    }

    fn has_network_setup_wizard_permission(&self, uid: u32) -> bool {
        self.setup_wizard.read().contains(&uid)
    }
}
