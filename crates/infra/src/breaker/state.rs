use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info, warn};

use zyra_core::{Clock, ServiceName};

use super::BreakerConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// Result of an attempt, as far as the breaker is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

/// Admission handed out by [`CircuitBreaker::allow`].
///
/// Carries the generation it was issued in. Every state change starts a new
/// generation, and outcomes or abandonments from an older one are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "a permit must be settled with `record` or `abandon`"]
pub struct Permit {
    generation: u64,
}

impl Permit {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Mutable state of one breaker. Only reachable through [`CircuitBreaker`].
#[derive(Debug, Clone)]
pub struct BreakerState {
    pub state: CircuitState,
    pub generation: u64,
    pub consecutive_failures: u32,
    pub last_transition_at: Instant,
    /// Successes still required in HalfOpen before closing.
    pub half_open_probe_budget: u32,
    /// HalfOpen admissions still available to `allow`.
    probe_permits: u32,
    /// Start of the current Closed-state counting window.
    window_started_at: Instant,
}

impl BreakerState {
    fn closed(now: Instant, generation: u64) -> Self {
        Self {
            state: CircuitState::Closed,
            generation,
            consecutive_failures: 0,
            last_transition_at: now,
            half_open_probe_budget: 0,
            probe_permits: 0,
            window_started_at: now,
        }
    }

    fn permit(&self) -> Permit {
        Permit {
            generation: self.generation,
        }
    }
}

/// Read-only view of a breaker for health reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BreakerSnapshot {
    pub service: ServiceName,
    pub state: CircuitState,
    pub generation: u64,
    pub consecutive_failures: u32,
    pub half_open_probe_budget: u32,
    pub ms_since_transition: u64,
}

/// One downstream service's failure-tracking state machine.
#[derive(Debug)]
pub struct CircuitBreaker {
    service: ServiceName,
    config: BreakerConfig,
    clock: Arc<dyn Clock>,
    inner: Mutex<BreakerState>,
}

impl CircuitBreaker {
    pub fn new(service: ServiceName, config: BreakerConfig, clock: Arc<dyn Clock>) -> Self {
        let now = clock.now();
        Self {
            service,
            config,
            clock,
            inner: Mutex::new(BreakerState::closed(now, 0)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// May a call proceed right now? `Some` carries the permit the caller
    /// must later settle.
    ///
    /// In Open this is where the cooldown is checked; once it has elapsed the
    /// breaker moves to HalfOpen and this call becomes the first probe.
    pub fn allow(&self) -> Option<Permit> {
        let now = self.clock.now();
        let mut st = self.lock();

        match st.state {
            CircuitState::Closed => {
                self.roll_window(&mut st, now);
                Some(st.permit())
            }
            CircuitState::Open => {
                if now.duration_since(st.last_transition_at) < self.config.open_timeout {
                    return None;
                }
                st.state = CircuitState::HalfOpen;
                st.generation += 1;
                st.last_transition_at = now;
                st.half_open_probe_budget = self.config.half_open_probe_budget;
                st.probe_permits = self.config.half_open_probe_budget - 1;
                info!(service = %self.service, "circuit breaker half-open; probing downstream");
                Some(st.permit())
            }
            CircuitState::HalfOpen => {
                if st.probe_permits == 0 {
                    return None;
                }
                st.probe_permits -= 1;
                Some(st.permit())
            }
        }
    }

    /// Record the outcome of a call that `allow` let through. Outcomes from an
    /// earlier generation are dropped.
    pub fn record(&self, permit: Permit, outcome: Outcome) {
        let now = self.clock.now();
        let mut st = self.lock();

        if st.state == CircuitState::Closed {
            self.roll_window(&mut st, now);
        }
        if permit.generation != st.generation {
            debug!(
                service = %self.service,
                permit_generation = permit.generation,
                generation = st.generation,
                "ignoring outcome from an earlier breaker generation"
            );
            return;
        }

        match (st.state, outcome) {
            (CircuitState::Closed, Outcome::Success) => st.consecutive_failures = 0,
            (CircuitState::Closed, Outcome::Failure) => {
                st.consecutive_failures += 1;
                if st.consecutive_failures > self.config.failure_threshold {
                    st.state = CircuitState::Open;
                    st.generation += 1;
                    st.last_transition_at = now;
                    warn!(
                        service = %self.service,
                        consecutive_failures = st.consecutive_failures,
                        threshold = self.config.failure_threshold,
                        "circuit breaker opened"
                    );
                }
            }
            (CircuitState::HalfOpen, Outcome::Failure) => {
                st.state = CircuitState::Open;
                st.generation += 1;
                st.last_transition_at = now;
                st.half_open_probe_budget = 0;
                st.probe_permits = 0;
                warn!(service = %self.service, "probe failed; circuit breaker re-opened");
            }
            (CircuitState::HalfOpen, Outcome::Success) => {
                st.half_open_probe_budget = st.half_open_probe_budget.saturating_sub(1);
                if st.half_open_probe_budget == 0 {
                    let generation = st.generation + 1;
                    *st = BreakerState::closed(now, generation);
                    info!(service = %self.service, "circuit breaker closed after successful probes");
                }
            }
            // Unreachable with a current permit: entering Open bumps the generation.
            (CircuitState::Open, _) => {}
        }
    }

    /// Give back a HalfOpen probe permit for a call whose caller went away
    /// before an outcome was observed.
    pub fn abandon(&self, permit: Permit) {
        let mut st = self.lock();
        if st.state == CircuitState::HalfOpen && permit.generation == st.generation {
            st.probe_permits = (st.probe_permits + 1).min(st.half_open_probe_budget);
        }
    }

    /// Start a fresh Closed counting window once `reset_interval` has passed.
    fn roll_window(&self, st: &mut BreakerState, now: Instant) {
        let Some(interval) = self.config.reset_interval else {
            return;
        };
        if now.duration_since(st.window_started_at) >= interval {
            st.generation += 1;
            st.consecutive_failures = 0;
            st.window_started_at = now;
        }
    }

    /// Force the breaker back to Closed (management action).
    pub fn reset(&self) {
        let now = self.clock.now();
        let mut st = self.lock();
        let generation = st.generation + 1;
        *st = BreakerState::closed(now, generation);
        info!(service = %self.service, "circuit breaker reset");
    }

    pub fn state(&self) -> BreakerState {
        self.lock().clone()
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let now = self.clock.now();
        let st = self.lock();
        BreakerSnapshot {
            service: self.service,
            state: st.state,
            generation: st.generation,
            consecutive_failures: st.consecutive_failures,
            half_open_probe_budget: st.half_open_probe_budget,
            ms_since_transition: duration_ms(now.saturating_duration_since(st.last_transition_at)),
        }
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
