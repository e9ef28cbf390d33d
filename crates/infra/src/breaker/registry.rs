use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use zyra_core::{Clock, ServiceName, SystemClock};

use super::{BreakerConfig, BreakerSnapshot, CircuitBreaker, Outcome, Permit};

/// Breakers keyed by downstream service, created on first reference.
///
/// Entries never share state: tripping one service's breaker has no effect
/// on calls to any other service.
#[derive(Debug)]
pub struct BreakerRegistry {
    config: BreakerConfig,
    clock: Arc<dyn Clock>,
    breakers: RwLock<HashMap<ServiceName, Arc<CircuitBreaker>>>,
}

impl BreakerRegistry {
    pub fn new(config: BreakerConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: BreakerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            breakers: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &BreakerConfig {
        &self.config
    }

    /// Breaker for `service`, creating it if this is the first reference.
    pub fn breaker(&self, service: ServiceName) -> Arc<CircuitBreaker> {
        if let Some(b) = self
            .breakers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&service)
        {
            return b.clone();
        }

        let mut breakers = self.breakers.write().unwrap_or_else(|e| e.into_inner());
        breakers
            .entry(service)
            .or_insert_with(|| Arc::new(CircuitBreaker::new(service, self.config, self.clock.clone())))
            .clone()
    }

    pub fn allow(&self, service: ServiceName) -> Option<Permit> {
        self.breaker(service).allow()
    }

    pub fn record(&self, service: ServiceName, permit: Permit, outcome: Outcome) {
        self.breaker(service).record(permit, outcome);
    }

    pub fn abandon(&self, service: ServiceName, permit: Permit) {
        self.breaker(service).abandon(permit);
    }

    pub fn reset(&self, service: ServiceName) {
        self.breaker(service).reset();
    }

    pub fn snapshot(&self, service: ServiceName) -> BreakerSnapshot {
        self.breaker(service).snapshot()
    }

    /// Snapshots of every breaker referenced so far, ordered by service.
    pub fn snapshots(&self) -> Vec<BreakerSnapshot> {
        let breakers = self.breakers.read().unwrap_or_else(|e| e.into_inner());
        let mut out: Vec<BreakerSnapshot> = breakers.values().map(|b| b.snapshot()).collect();
        out.sort_by_key(|s| s.service);
        out
    }
}
