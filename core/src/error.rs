//! Error types for the scanproxy-core library.

use thiserror::Error;

use crate::domain::{CallerClass, CallerId};

/// Result type alias for scan proxy operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while arbitrating scan requests.
///
/// The first four variants are the scan outcome taxonomy. None of them is
/// fatal to the proxy: the caller observes a failed request and may retry.
#[derive(Error, Debug)]
pub enum Error {
    /// The scan engine handle could not be obtained.
    #[error("Scan engine unavailable")]
    EngineUnavailable,

    /// Admission control rejected the request.
    #[error("Scan request from {caller} throttled ({class} policy)")]
    Throttled { caller: CallerId, class: CallerClass },

    /// The engine reported an asynchronous failure for a forwarded request.
    #[error("Scan engine reported failure {code}: {reason}")]
    EngineReportedFailure { code: i32, reason: String },

    /// The engine reported success with an unusable result shape.
    #[error("Malformed scan result: expected exactly one scan data set, got {data_sets}")]
    MalformedResult { data_sets: usize },

    /// A results callback could not be linked because its owner is already gone.
    #[error("Callback owner is dead: {0}")]
    CallbackDead(String),

    /// The proxy service task is no longer running.
    #[error("Scan proxy service stopped")]
    ServiceStopped,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}
