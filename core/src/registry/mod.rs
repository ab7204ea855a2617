//! Listener and callback registry.
//!
//! Two kinds of engine listeners feed the proxy:
//! - one global [`ScanListener`] that sees every scan outcome
//! - a fresh per-request [`ScanListener`] for each forwarded request
//!
//! External subscribers register [`ScanResultsCallback`]s with the
//! [`CallbackRegistry`] and are notified when new full results land.

mod callbacks;
mod listener;

pub use callbacks::{CallbackRegistry, CallbackToken, DeathRecipient, ScanResultsCallback};
pub use listener::ScanListener;
