//! Per-service circuit breakers.
//!
//! Each downstream service gets one isolated state machine behind its own
//! lock; the registry only maps service names to entries:
//!
//! ```text
//! Closed --(failures > threshold)--> Open --(open_timeout elapsed)--> HalfOpen
//!   ^                                  ^                                 |
//!   |                                  +---------(any failure)-----------+
//!   +--------------------(probe budget met, no failures)-----------------+
//! ```
//!
//! Every transition, and every new Closed counting window, starts a new
//! generation. `allow` hands out a [`Permit`] stamped with the current one;
//! a permit from an older generation settles as a no-op.

mod registry;
mod state;

pub use registry::BreakerRegistry;
pub use state::{BreakerSnapshot, BreakerState, CircuitBreaker, CircuitState, Outcome, Permit};

use std::time::Duration;

/// Tuning for every breaker in a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerConfig {
    /// The breaker opens once consecutive failures exceed this value.
    pub failure_threshold: u32,
    /// Probe calls let through in HalfOpen, and successes needed to close.
    pub half_open_probe_budget: u32,
    /// How long the breaker stays Open before probing.
    pub open_timeout: Duration,
    /// Closed-state failure counts older than this are discarded.
    pub reset_interval: Option<Duration>,
}

impl BreakerConfig {
    pub fn new(failure_threshold: u32, half_open_probe_budget: u32, open_timeout: Duration) -> Self {
        Self {
            failure_threshold,
            half_open_probe_budget: half_open_probe_budget.max(1),
            open_timeout,
            reset_interval: None,
        }
    }

    pub fn with_reset_interval(mut self, interval: Option<Duration>) -> Self {
        self.reset_interval = interval.filter(|d| !d.is_zero());
        self
    }
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self::new(3, 5, Duration::from_secs(5)).with_reset_interval(Some(Duration::from_secs(10)))
    }
}
