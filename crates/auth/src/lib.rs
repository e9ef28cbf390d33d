//! `zyra-auth`: admission boundary for the gateway (zero-trust).
//!
//! No HTTP types and no concrete store live here: the revocation lookup is
//! injected, and rejections carry a plain numeric status for the transport
//! layer to use.

pub mod claims;
pub mod gate;
pub mod revocation;
pub mod roles;
pub mod validator;
pub mod webhook;

pub use claims::{Credential, CredentialClaims, validate_claims};
pub use gate::{AdmissionDecision, AuthGate, RejectReason};
pub use revocation::{InMemoryRevocationStore, RevocationStore, StoreUnavailable, revocation_key};
pub use roles::Role;
pub use validator::{CredentialValidator, HmacCredentialValidator, InvalidCredential};
pub use webhook::{StripeSignatureVerifier, VerifiedEvent, WebhookRejected, WebhookVerifier};
