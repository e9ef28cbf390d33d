//! Breaker-gated downstream dispatch.
//!
//! Every downstream call goes through [`DispatchExecutor::dispatch`]:
//!
//! ```text
//! allow(svc)? ── no ──> ServiceUnavailable (call never runs)
//!     │
//!    yes
//!     ↓
//! call() under deadline ──> classify ──> record(svc, outcome) ──> result
//! ```
//!
//! Every attempt that was let through is recorded exactly once: completed
//! calls, timeouts and panics count, and a caller that goes away mid-call
//! hands its HalfOpen probe permit back instead.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use thiserror::Error;
use tracing::{debug, warn};

use zyra_core::ServiceName;

use crate::breaker::{BreakerRegistry, Outcome, Permit};

/// Default deadline for a single downstream call.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(5);

/// Failure reported by a downstream channel for a call that was attempted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DownstreamError {
    /// Could not reach the service or the connection broke mid-call.
    #[error("transport error: {0}")]
    Transport(String),

    /// The service answered with a server-side failure status.
    #[error("downstream status {status}: {message}")]
    Status { status: u16, message: String },

    /// The service answered with something that is not a valid response.
    #[error("invalid downstream response: {0}")]
    InvalidResponse(String),
}

impl DownstreamError {
    /// Classification code exposed to callers in place of the detail.
    pub fn classification(&self) -> &'static str {
        match self {
            DownstreamError::Transport(_) => "downstream_unreachable",
            DownstreamError::Status { .. } => "downstream_error",
            DownstreamError::InvalidResponse(_) => "downstream_bad_response",
        }
    }
}

/// Uniform failure of [`DispatchExecutor::dispatch`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("service unavailable")]
    ServiceUnavailable,

    #[error("downstream call failed ({detail})")]
    DownstreamFailed { detail: String },

    #[error("downstream call timed out")]
    Timeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionCause {
    BreakerOpen,
}

/// What happened to one dispatch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    Success,
    DownstreamError(&'static str),
    Timeout,
    Rejected(RejectionCause),
}

impl CallOutcome {
    /// How the attempt feeds the breaker; `None` when the call never ran.
    pub fn breaker_outcome(&self) -> Option<Outcome> {
        match self {
            CallOutcome::Success => Some(Outcome::Success),
            CallOutcome::DownstreamError(_) | CallOutcome::Timeout => Some(Outcome::Failure),
            CallOutcome::Rejected(_) => None,
        }
    }
}

/// Runs downstream calls through their service's breaker.
#[derive(Debug, Clone)]
pub struct DispatchExecutor {
    breakers: Arc<BreakerRegistry>,
    call_timeout: Duration,
}

impl DispatchExecutor {
    pub fn new(breakers: Arc<BreakerRegistry>) -> Self {
        Self {
            breakers,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn breakers(&self) -> &Arc<BreakerRegistry> {
        &self.breakers
    }

    /// Dispatch `call` to `service`.
    ///
    /// `call` is only invoked if the service's breaker allows it. Dropping
    /// the returned future abandons the in-flight call.
    pub async fn dispatch<T, F, Fut>(&self, service: ServiceName, call: F) -> Result<T, DispatchError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, DownstreamError>>,
    {
        let Some(permit) = self.breakers.allow(service) else {
            debug!(
                %service,
                outcome = ?CallOutcome::Rejected(RejectionCause::BreakerOpen),
                "dispatch rejected by open breaker"
            );
            return Err(DispatchError::ServiceUnavailable);
        };

        let guard = Attempt::new(&self.breakers, service, permit);

        let attempt = AssertUnwindSafe(async { tokio::time::timeout(self.call_timeout, call()).await })
            .catch_unwind()
            .await;

        let (outcome, result) = match attempt {
            Ok(Ok(Ok(response))) => (CallOutcome::Success, Ok(response)),
            Ok(Ok(Err(e))) => {
                warn!(%service, error = %e, "downstream call failed");
                let code = e.classification();
                (
                    CallOutcome::DownstreamError(code),
                    Err(DispatchError::DownstreamFailed {
                        detail: code.to_string(),
                    }),
                )
            }
            Ok(Err(_elapsed)) => {
                let timeout_ms = u64::try_from(self.call_timeout.as_millis()).unwrap_or(u64::MAX);
                warn!(%service, timeout_ms, "downstream call timed out");
                (CallOutcome::Timeout, Err(DispatchError::Timeout))
            }
            Err(panic) => {
                warn!(%service, "downstream call panicked");
                guard.settle(Outcome::Failure);
                std::panic::resume_unwind(panic);
            }
        };

        if let Some(o) = outcome.breaker_outcome() {
            guard.settle(o);
        }
        debug!(%service, ?outcome, "dispatch finished");
        result
    }
}

/// Ensures an allowed attempt is accounted for even if the dispatch future
/// is dropped before the call completes.
struct Attempt<'a> {
    breakers: &'a BreakerRegistry,
    service: ServiceName,
    permit: Permit,
    settled: bool,
}

impl<'a> Attempt<'a> {
    fn new(breakers: &'a BreakerRegistry, service: ServiceName, permit: Permit) -> Self {
        Self {
            breakers,
            service,
            permit,
            settled: false,
        }
    }

    fn settle(mut self, outcome: Outcome) {
        self.settled = true;
        self.breakers.record(self.service, self.permit, outcome);
    }
}

impl Drop for Attempt<'_> {
    fn drop(&mut self) {
        if !self.settled {
            debug!(service = %self.service, "dispatch abandoned by caller");
            self.breakers.abandon(self.service, self.permit);
        }
    }
}
