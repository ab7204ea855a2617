//! Caller importance and permission oracles (interfaces).

/// Port reporting how visible an app currently is to the user.
///
/// Lower values are more important.
pub trait ImportanceOracle: Send + Sync {
    fn package_importance(&self, package: &str) -> i32;
}

/// Port answering privilege questions about a caller uid.
pub trait PermissionOracle: Send + Sync {
    /// Caller may manage network settings.
    fn has_network_settings_permission(&self, uid: u32) -> bool;

    /// Caller is the device setup wizard.
    fn has_network_setup_wizard_permission(&self, uid: u32) -> bool;

    /// Either privilege exempts the caller from throttling.
    fn is_elevated(&self, uid: u32) -> bool {
        self.has_network_settings_permission(uid) || self.has_network_setup_wizard_permission(uid)
    }
}
