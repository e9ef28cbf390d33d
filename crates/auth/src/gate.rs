//! Request admission: header shape, revocation, signature/claims, role.
//!
//! The checks run in a fixed order and stop at the first failure:
//!
//! 1. `Authorization` header shape (no IO)
//! 2. revocation lookup (fail-closed on store trouble)
//! 3. credential validation
//! 4. role match
//!
//! Revocation runs before claims parsing so a revoked token is rejected the
//! same way whatever its payload looks like.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use zyra_core::SubjectId;

use crate::revocation::{RevocationStore, StoreUnavailable};
use crate::validator::CredentialValidator;
use crate::Role;

/// Default upper bound for a single revocation lookup.
pub const DEFAULT_REVOCATION_TIMEOUT: Duration = Duration::from_millis(500);

/// Why a request was refused admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    MissingOrMalformedHeader,
    AdmissionUnavailable,
    SessionRevoked,
    InvalidCredential,
    RoleMismatch,
}

impl RejectReason {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            RejectReason::MissingOrMalformedHeader => "missing_or_malformed_header",
            RejectReason::AdmissionUnavailable => "admission_unavailable",
            RejectReason::SessionRevoked => "session_revoked",
            RejectReason::InvalidCredential => "invalid_credential",
            RejectReason::RoleMismatch => "role_mismatch",
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            RejectReason::MissingOrMalformedHeader
            | RejectReason::SessionRevoked
            | RejectReason::InvalidCredential => 401,
            RejectReason::RoleMismatch => 403,
            RejectReason::AdmissionUnavailable => 500,
        }
    }

    /// Message safe to show to the caller.
    pub fn message(&self) -> &'static str {
        match self {
            RejectReason::MissingOrMalformedHeader => "Authorization token required",
            RejectReason::AdmissionUnavailable => "Server error while checking token",
            RejectReason::SessionRevoked => "Session expired. Please log in again.",
            RejectReason::InvalidCredential => "Invalid token",
            RejectReason::RoleMismatch => "Access denied for this role",
        }
    }
}

impl core::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}

/// Outcome of [`AuthGate::admit`]. Per request, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissionDecision {
    Admitted { subject_id: SubjectId, role: Role },
    Rejected { reason: RejectReason, http_status: u16 },
}

impl AdmissionDecision {
    pub fn reject(reason: RejectReason) -> Self {
        Self::Rejected {
            reason,
            http_status: reason.http_status(),
        }
    }

    pub fn is_admitted(&self) -> bool {
        matches!(self, AdmissionDecision::Admitted { .. })
    }
}

/// Admission gate composed of a credential validator and a revocation store.
#[derive(Clone)]
pub struct AuthGate {
    validator: Arc<dyn CredentialValidator>,
    revocations: Arc<dyn RevocationStore>,
    revocation_timeout: Duration,
}

impl AuthGate {
    pub fn new(
        validator: Arc<dyn CredentialValidator>,
        revocations: Arc<dyn RevocationStore>,
    ) -> Self {
        Self {
            validator,
            revocations,
            revocation_timeout: DEFAULT_REVOCATION_TIMEOUT,
        }
    }

    pub fn with_revocation_timeout(mut self, timeout: Duration) -> Self {
        self.revocation_timeout = timeout;
        self
    }

    /// Decide whether a request carrying `authorization` (the full header
    /// value, `Bearer <token>`) may proceed to an endpoint requiring `required`.
    pub async fn admit(&self, authorization: &str, required: Role) -> AdmissionDecision {
        self.admit_at(authorization, required, Utc::now()).await
    }

    /// [`admit`](Self::admit) with an explicit clock reading.
    pub async fn admit_at(
        &self,
        authorization: &str,
        required: Role,
        now: DateTime<Utc>,
    ) -> AdmissionDecision {
        let Some(token) = bearer_token(authorization) else {
            debug!("rejecting request: missing or malformed authorization header");
            return AdmissionDecision::reject(RejectReason::MissingOrMalformedHeader);
        };

        match self.lookup_revocation(token).await {
            Ok(false) => {}
            Ok(true) => {
                debug!("rejecting request: credential revoked");
                return AdmissionDecision::reject(RejectReason::SessionRevoked);
            }
            Err(e) => {
                warn!(error = %e, "revocation status unknown; denying admission");
                return AdmissionDecision::reject(RejectReason::AdmissionUnavailable);
            }
        }

        let credential = match self.validator.validate(token, now) {
            Ok(c) => c,
            Err(e) => {
                debug!(error = %e, "rejecting request: invalid credential");
                return AdmissionDecision::reject(RejectReason::InvalidCredential);
            }
        };

        if credential.role != required {
            debug!(
                subject_id = %credential.subject_id,
                role = %credential.role,
                required = %required,
                "rejecting request: role mismatch"
            );
            return AdmissionDecision::reject(RejectReason::RoleMismatch);
        }

        AdmissionDecision::Admitted {
            subject_id: credential.subject_id,
            role: credential.role,
        }
    }

    async fn lookup_revocation(&self, token: &str) -> Result<bool, StoreUnavailable> {
        tokio::time::timeout(self.revocation_timeout, self.revocations.is_revoked(token))
            .await
            .map_err(|_| StoreUnavailable("revocation lookup timed out".to_string()))?
    }
}

impl core::fmt::Debug for AuthGate {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AuthGate")
            .field("revocation_timeout", &self.revocation_timeout)
            .finish_non_exhaustive()
    }
}

/// The literal token after a single `Bearer ` prefix. Padding is rejected, not
/// trimmed, so the revocation key is always the token exactly as sent.
fn bearer_token(authorization: &str) -> Option<&str> {
    let token = authorization.strip_prefix("Bearer ")?;
    if token.is_empty() || token.contains(char::is_whitespace) {
        return None;
    }
    Some(token)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::Duration as ChronoDuration;
    use jsonwebtoken::{Algorithm, EncodingKey, Header};
    use proptest::prelude::*;

    use super::*;
    use crate::claims::CredentialClaims;
    use crate::revocation::InMemoryRevocationStore;
    use crate::validator::HmacCredentialValidator;

    const SECRET: &str = "gate-test-secret";

    struct DownStore;

    #[async_trait]
    impl RevocationStore for DownStore {
        async fn is_revoked(&self, _raw: &str) -> Result<bool, StoreUnavailable> {
            Err(StoreUnavailable("connection refused".to_string()))
        }
    }

    struct StalledStore;

    #[async_trait]
    impl RevocationStore for StalledStore {
        async fn is_revoked(&self, _raw: &str) -> Result<bool, StoreUnavailable> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(false)
        }
    }

    fn mint(secret: &str, subject: &str, role: &str) -> String {
        let claims = CredentialClaims {
            user_id: subject.to_string(),
            role: Some(role.to_string()),
            exp: (Utc::now() + ChronoDuration::minutes(10)).timestamp(),
        };
        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn gate_with(store: Arc<dyn RevocationStore>) -> AuthGate {
        AuthGate::new(Arc::new(HmacCredentialValidator::new(SECRET)), store)
    }

    fn rejected(reason: RejectReason) -> AdmissionDecision {
        AdmissionDecision::reject(reason)
    }

    #[tokio::test]
    async fn admits_matching_role() {
        let gate = gate_with(Arc::new(InMemoryRevocationStore::new()));
        let token = mint(SECRET, "u-1", "client");

        let decision = gate.admit(&format!("Bearer {token}"), Role::Client).await;
        assert_eq!(
            decision,
            AdmissionDecision::Admitted {
                subject_id: SubjectId::new("u-1").unwrap(),
                role: Role::Client,
            }
        );
    }

    #[tokio::test]
    async fn header_shape_is_checked_first() {
        let gate = gate_with(Arc::new(DownStore));
        let token = mint(SECRET, "u-1", "client");

        for header in [
            "",
            "Bearer",
            "Bearer ",
            "Basic abc",
            token.as_str(),
            "bearer x.y.z",
            "Bearer a b",
        ] {
            assert_eq!(
                gate.admit(header, Role::Client).await,
                rejected(RejectReason::MissingOrMalformedHeader),
                "header {header:?}"
            );
        }
    }

    #[tokio::test]
    async fn padded_token_is_rejected_not_trimmed() {
        let store = Arc::new(InMemoryRevocationStore::new());
        let gate = gate_with(store.clone());
        let token = mint(SECRET, "u-1", "client");

        for header in [
            format!("Bearer {token} "),
            format!("Bearer  {token}"),
            format!("Bearer {token}\t"),
        ] {
            assert_eq!(
                gate.admit(&header, Role::Client).await,
                rejected(RejectReason::MissingOrMalformedHeader),
                "header {header:?}"
            );
        }

        // The exact token is what gets looked up.
        store.revoke(&token);
        assert_eq!(
            gate.admit(&format!("Bearer {token}"), Role::Client).await,
            rejected(RejectReason::SessionRevoked)
        );
    }

    #[tokio::test]
    async fn revoked_token_is_rejected_whatever_its_signature() {
        let store = Arc::new(InMemoryRevocationStore::new());
        let good = mint(SECRET, "u-1", "admin");
        let forged = mint("not-the-secret", "u-1", "admin");
        store.revoke(&good);
        store.revoke(&forged);
        store.revoke("not-even-a-jwt");
        let gate = gate_with(store);

        for token in [good.as_str(), forged.as_str(), "not-even-a-jwt"] {
            assert_eq!(
                gate.admit(&format!("Bearer {token}"), Role::Admin).await,
                rejected(RejectReason::SessionRevoked)
            );
        }
    }

    #[tokio::test]
    async fn store_failure_fails_closed() {
        let gate = gate_with(Arc::new(DownStore));
        let token = mint(SECRET, "u-1", "admin");

        let decision = gate.admit(&format!("Bearer {token}"), Role::Admin).await;
        assert_eq!(decision, rejected(RejectReason::AdmissionUnavailable));
        assert!(matches!(decision, AdmissionDecision::Rejected { http_status: 500, .. }));
    }

    #[tokio::test]
    async fn stalled_store_times_out_closed() {
        let gate = gate_with(Arc::new(StalledStore)).with_revocation_timeout(Duration::from_millis(20));
        let token = mint(SECRET, "u-1", "admin");

        assert_eq!(
            gate.admit(&format!("Bearer {token}"), Role::Admin).await,
            rejected(RejectReason::AdmissionUnavailable)
        );
    }

    #[tokio::test]
    async fn bad_signature_is_invalid_credential() {
        let gate = gate_with(Arc::new(InMemoryRevocationStore::new()));
        let forged = mint("not-the-secret", "u-1", "admin");

        assert_eq!(
            gate.admit(&format!("Bearer {forged}"), Role::Admin).await,
            rejected(RejectReason::InvalidCredential)
        );
    }

    #[tokio::test]
    async fn vendor_on_admin_endpoint_is_forbidden() {
        let gate = gate_with(Arc::new(InMemoryRevocationStore::new()));
        let token = mint(SECRET, "v-7", "vendor");

        let decision = gate.admit(&format!("Bearer {token}"), Role::Admin).await;
        assert_eq!(decision, rejected(RejectReason::RoleMismatch));
        assert!(matches!(decision, AdmissionDecision::Rejected { http_status: 403, .. }));
    }

    fn block_on<F: std::future::Future>(fut: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap()
            .block_on(fut)
    }

    fn any_role() -> impl Strategy<Value = Role> {
        prop_oneof![Just(Role::Admin), Just(Role::Vendor), Just(Role::Client)]
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 64,
            ..ProptestConfig::default()
        })]

        /// Property: when revocation status is unknown nothing is admitted,
        /// whatever the header says.
        #[test]
        fn unavailable_store_never_admits(
            header in prop_oneof![
                ".*",
                "Bearer [A-Za-z0-9_.-]{1,64}",
            ],
            subject in "[a-z0-9-]{1,16}",
            role in any_role(),
            required in any_role(),
        ) {
            let gate = gate_with(Arc::new(DownStore));
            let valid = format!("Bearer {}", mint(SECRET, &subject, role.as_str()));

            prop_assert!(!block_on(gate.admit(&header, required)).is_admitted());
            prop_assert!(!block_on(gate.admit(&valid, required)).is_admitted());
        }

        /// Property: well-formed, live, unrevoked credentials with the
        /// required role are admitted as their subject.
        #[test]
        fn matching_credentials_are_admitted(
            subject in "[a-zA-Z0-9-]{1,32}",
            role in any_role(),
        ) {
            let gate = gate_with(Arc::new(InMemoryRevocationStore::new()));
            let header = format!("Bearer {}", mint(SECRET, &subject, role.as_str()));

            let decision = block_on(gate.admit(&header, role));
            prop_assert_eq!(
                decision,
                AdmissionDecision::Admitted { subject_id: SubjectId::new(subject).unwrap(), role }
            );
        }
    }
}
