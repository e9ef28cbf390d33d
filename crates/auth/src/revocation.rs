//! Credential revocation lookup.
//!
//! A revoked credential is recorded externally (logout, administrative
//! block) as a key `blacklist:<raw token>` in a fast cache. The gate only
//! reads; the store owns expiry.

use std::collections::HashSet;
use std::sync::RwLock;

use async_trait::async_trait;
use thiserror::Error;

/// Namespace prefix for revocation keys.
pub const REVOCATION_NAMESPACE: &str = "blacklist:";

/// Build the store key for a raw credential.
pub fn revocation_key(raw_credential: &str) -> String {
    format!("{REVOCATION_NAMESPACE}{raw_credential}")
}

/// The revocation status could not be determined.
///
/// Callers must treat this as "deny"; it is never a reason to admit.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("revocation store unavailable: {0}")]
pub struct StoreUnavailable(pub String);

#[async_trait]
pub trait RevocationStore: Send + Sync {
    async fn is_revoked(&self, raw_credential: &str) -> Result<bool, StoreUnavailable>;
}

/// Process-local revocation set (dev/test).
#[derive(Debug, Default)]
pub struct InMemoryRevocationStore {
    keys: RwLock<HashSet<String>>,
}

impl InMemoryRevocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn revoke(&self, raw_credential: &str) {
        self.keys
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(revocation_key(raw_credential));
    }
}

#[async_trait]
impl RevocationStore for InMemoryRevocationStore {
    async fn is_revoked(&self, raw_credential: &str) -> Result<bool, StoreUnavailable> {
        let keys = self.keys.read().map_err(|e| StoreUnavailable(e.to_string()))?;
        Ok(keys.contains(&revocation_key(raw_credential)))
    }
}
