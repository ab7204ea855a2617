//! Caller identity and classification.

use serde::{Deserialize, Serialize};

/// Identity of an app requesting scans.
///
/// The same package installed for two users has two distinct uids, so both
/// fields take part in equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallerId {
    pub uid: u32,
    pub package: String,
}

impl CallerId {
    pub fn new(uid: u32, package: impl Into<String>) -> Self {
        Self {
            uid,
            package: package.into(),
        }
    }
}

impl std::fmt::Display for CallerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.package, self.uid)
    }
}

/// Attribution attached to every request forwarded to the scan engine.
pub type WorkSource = CallerId;

/// Throttling class of a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CallerClass {
    /// Visible to the user, or listed in the throttle exception list.
    Foreground,
    /// Everything else; shares one global rate limit.
    Background,
}

impl std::fmt::Display for CallerClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallerClass::Foreground => write!(f, "foreground"),
            CallerClass::Background => write!(f, "background"),
        }
    }
}
