//! Payment-provider webhook verification.
//!
//! Webhooks carry no bearer credential; the signature header is the only
//! proof of origin. The verifier is a port so the HTTP layer never sees the
//! signing secret.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Default accepted age of a signed timestamp.
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// A webhook whose signature checked out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedEvent {
    pub event_type: String,
    /// The raw body, forwarded downstream untouched.
    pub payload: String,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WebhookRejected {
    #[error("signature header is missing or malformed")]
    MalformedHeader,

    #[error("no signature matches the payload")]
    SignatureMismatch,

    #[error("signed timestamp is outside the tolerance window")]
    Stale,

    #[error("payload is not a valid event: {0}")]
    InvalidPayload(String),
}

pub trait WebhookVerifier: Send + Sync {
    fn verify_at(&self, payload: &[u8], signature: &str, now: DateTime<Utc>)
    -> Result<VerifiedEvent, WebhookRejected>;

    fn verify(&self, payload: &[u8], signature: &str) -> Result<VerifiedEvent, WebhookRejected> {
        self.verify_at(payload, signature, Utc::now())
    }
}

/// Stripe-style signatures: `t=<unix>,v1=<hex hmac-sha256 of "t.body">`.
#[derive(Clone)]
pub struct StripeSignatureVerifier {
    secret: Vec<u8>,
    tolerance_secs: i64,
}

impl core::fmt::Debug for StripeSignatureVerifier {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StripeSignatureVerifier")
            .field("tolerance_secs", &self.tolerance_secs)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct EventEnvelope {
    #[serde(rename = "type")]
    event_type: String,
}

impl StripeSignatureVerifier {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
            tolerance_secs: DEFAULT_TOLERANCE_SECS,
        }
    }

    pub fn with_tolerance_secs(mut self, tolerance_secs: i64) -> Self {
        self.tolerance_secs = tolerance_secs;
        self
    }

    fn mac_for(&self, timestamp: &str, payload: &[u8]) -> Result<HmacSha256, WebhookRejected> {
        let mut mac = HmacSha256::new_from_slice(&self.secret).map_err(|_| WebhookRejected::SignatureMismatch)?;
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(payload);
        Ok(mac)
    }
}

impl WebhookVerifier for StripeSignatureVerifier {
    fn verify_at(
        &self,
        payload: &[u8],
        signature: &str,
        now: DateTime<Utc>,
    ) -> Result<VerifiedEvent, WebhookRejected> {
        let mut timestamp = None;
        let mut candidates = Vec::new();
        for part in signature.split(',') {
            match part.trim().split_once('=') {
                Some(("t", t)) => timestamp = Some(t),
                Some(("v1", sig)) => candidates.push(sig),
                _ => {}
            }
        }

        let timestamp = timestamp.ok_or(WebhookRejected::MalformedHeader)?;
        let signed_at: i64 = timestamp.parse().map_err(|_| WebhookRejected::MalformedHeader)?;
        if candidates.is_empty() {
            return Err(WebhookRejected::MalformedHeader);
        }

        let matched = candidates.iter().any(|sig| {
            let Ok(bytes) = hex::decode(sig) else { return false };
            self.mac_for(timestamp, payload)
                .is_ok_and(|mac| mac.verify_slice(&bytes).is_ok())
        });
        if !matched {
            return Err(WebhookRejected::SignatureMismatch);
        }

        if (now.timestamp() - signed_at).abs() > self.tolerance_secs {
            return Err(WebhookRejected::Stale);
        }

        let envelope: EventEnvelope =
            serde_json::from_slice(payload).map_err(|e| WebhookRejected::InvalidPayload(e.to_string()))?;
        let payload = String::from_utf8(payload.to_vec()).map_err(|e| WebhookRejected::InvalidPayload(e.to_string()))?;

        Ok(VerifiedEvent {
            event_type: envelope.event_type,
            payload,
        })
    }
}
