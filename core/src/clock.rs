//! Monotonic time source used for every throttling decision.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Elapsed-time source.
///
/// Only differences between readings are meaningful; the origin is
/// implementation defined.
pub trait Clock: Send + Sync {
    /// Milliseconds elapsed since the clock's origin.
    fn elapsed_since_boot_ms(&self) -> u64;
}

/// Clock backed by [`std::time::Instant`], with its origin at construction.
#[derive(Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn elapsed_since_boot_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// Manually driven clock for simulations and tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicU64,
}

impl ManualClock {
    /// Create a clock reading `start_ms`.
    pub fn new(start_ms: u64) -> Self {
        Self {
            now_ms: AtomicU64::new(start_ms),
        }
    }

    /// Jump to an absolute reading.
    pub fn set(&self, now_ms: u64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }

    /// Move the clock forward and return the new reading.
    pub fn advance(&self, delta_ms: u64) -> u64 {
        self.now_ms.fetch_add(delta_ms, Ordering::SeqCst) + delta_ms
    }
}

impl Clock for ManualClock {
    fn elapsed_since_boot_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}
