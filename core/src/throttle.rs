//! Scan request admission control.
//!
//! Foreground callers get a per-(uid, package) sliding window. Background
//! callers share a single process-wide minimum interval, so background
//! throttling limits the rate across all apps together rather than per app.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::config::ThrottleConfig;
use crate::domain::{CallerClass, CallerId};
use crate::ports::ImportanceOracle;

/// Why a request skipped throttle evaluation entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BypassReason {
    ThrottleDisabled,
    Elevated,
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Decision {
    /// Admitted without any bookkeeping.
    Bypassed(BypassReason),
    Admitted(CallerClass),
    Throttled(CallerClass),
}

/// Decision plus the caller importance it was based on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Admission {
    pub decision: Decision,
    pub importance: i32,
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        !matches!(self.decision, Decision::Throttled(_))
    }

    /// Whether the request went through throttle evaluation.
    pub fn was_evaluated(&self) -> bool {
        !matches!(self.decision, Decision::Bypassed(_))
    }
}

/// Mutable caller state owned by the policy.
#[derive(Debug, Default)]
struct ThrottleState {
    /// Admitted request times per app, oldest first.
    foreground: HashMap<CallerId, VecDeque<u64>>,
    /// Last admitted background request, across all apps.
    last_background_ms: Option<u64>,
}

/// Admission control engine.
pub struct ThrottlePolicy {
    config: ThrottleConfig,
    enabled: bool,
    state: ThrottleState,
    clock: Arc<dyn Clock>,
    importance: Arc<dyn ImportanceOracle>,
}

impl ThrottlePolicy {
    pub fn new(
        config: ThrottleConfig,
        enabled: bool,
        clock: Arc<dyn Clock>,
        importance: Arc<dyn ImportanceOracle>,
    ) -> Self {
        Self {
            config,
            enabled,
            state: ThrottleState::default(),
            clock,
            importance,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Classify a caller by importance and exception-list membership.
    pub fn classify(&self, package: &str, importance: i32) -> CallerClass {
        if self.config.is_exception(package)
            || importance <= self.config.foreground_importance_threshold
        {
            CallerClass::Foreground
        } else {
            CallerClass::Background
        }
    }

    /// Decide whether `caller` may scan now, recording the admission if so.
    pub fn admit(&mut self, caller: &CallerId, elevated: bool) -> Admission {
        let importance = self.importance.package_importance(&caller.package);

        let decision = if !self.enabled {
            Decision::Bypassed(BypassReason::ThrottleDisabled)
        } else if elevated {
            Decision::Bypassed(BypassReason::Elevated)
        } else {
            let class = self.classify(&caller.package, importance);
            let now_ms = self.clock.elapsed_since_boot_ms();
            let throttled = if self.config.is_exception(&caller.package) {
                false
            } else {
                match class {
                    CallerClass::Foreground => self.throttle_foreground(caller, now_ms),
                    CallerClass::Background => self.throttle_background(now_ms),
                }
            };

            if throttled {
                Decision::Throttled(class)
            } else {
                Decision::Admitted(class)
            }
        };

        Admission {
            decision,
            importance,
        }
    }

    fn throttle_foreground(&mut self, caller: &CallerId, now_ms: u64) -> bool {
        let window_ms = self.config.foreground_window_ms;
        let timestamps = self.state.foreground.entry(caller.clone()).or_default();

        while timestamps
            .front()
            .is_some_and(|&first| now_ms.saturating_sub(first) > window_ms)
        {
            timestamps.pop_front();
        }

        if timestamps.len() >= self.config.foreground_max_requests {
            return true;
        }
        timestamps.push_back(now_ms);
        false
    }

    fn throttle_background(&mut self, now_ms: u64) -> bool {
        if let Some(last) = self.state.last_background_ms {
            if now_ms.saturating_sub(last) < self.config.background_interval_ms {
                return true;
            }
        }
        self.state.last_background_ms = Some(now_ms);
        false
    }

    /// Forget the foreground window of exactly this (uid, package).
    pub fn clear_timestamps_for_caller(&mut self, caller: &CallerId) -> bool {
        self.state.foreground.remove(caller).is_some()
    }

    /// Recorded foreground admissions for a caller, oldest first.
    pub fn foreground_timestamps(&self, caller: &CallerId) -> Vec<u64> {
        self.state
            .foreground
            .get(caller)
            .map(|t| t.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn last_background_admission_ms(&self) -> Option<u64> {
        self.state.last_background_ms
    }
}
