//! Signed bearer credential verification.
//!
//! Tokens are compact JWS (JWT) values signed with a process-wide shared
//! secret. Only the HMAC-SHA family is accepted.

use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use thiserror::Error;

use crate::claims::{Credential, CredentialClaims, validate_claims};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum InvalidCredential {
    #[error("credential missing")]
    Missing,

    #[error("credential malformed")]
    Malformed,

    #[error("credential signature mismatch")]
    SignatureMismatch,

    #[error("credential expired")]
    Expired,
}

/// Verifies a raw credential (scheme prefix already stripped).
///
/// Implementations must be pure: same input, key and `now` give the same
/// answer.
pub trait CredentialValidator: Send + Sync {
    fn validate(&self, raw_credential: &str, now: DateTime<Utc>)
    -> Result<Credential, InvalidCredential>;
}

/// HMAC-SHA (HS256/HS384/HS512) validator over a shared secret.
pub struct HmacCredentialValidator {
    key: DecodingKey,
    validation: Validation,
}

impl HmacCredentialValidator {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
        // Expiry is checked against the caller's clock in `validate_claims`.
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        Self {
            key: DecodingKey::from_secret(secret.as_ref()),
            validation,
        }
    }
}

impl core::fmt::Debug for HmacCredentialValidator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HmacCredentialValidator")
            .field("algorithms", &self.validation.algorithms)
            .finish_non_exhaustive()
    }
}

impl CredentialValidator for HmacCredentialValidator {
    fn validate(
        &self,
        raw_credential: &str,
        now: DateTime<Utc>,
    ) -> Result<Credential, InvalidCredential> {
        if raw_credential.is_empty() {
            return Err(InvalidCredential::Missing);
        }
        if raw_credential.split('.').count() != 3 {
            return Err(InvalidCredential::Malformed);
        }

        let data = jsonwebtoken::decode::<CredentialClaims>(raw_credential, &self.key, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => InvalidCredential::SignatureMismatch,
                ErrorKind::ExpiredSignature => InvalidCredential::Expired,
                _ => InvalidCredential::Malformed,
            })?;

        validate_claims(&data.claims, now)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use jsonwebtoken::{EncodingKey, Header};

    use super::*;
    use crate::Role;

    const SECRET: &str = "unit-test-secret";

    fn mint(alg: Algorithm, secret: &str, role: Option<&str>, exp: DateTime<Utc>) -> String {
        let claims = CredentialClaims {
            user_id: "0f9d2c".to_string(),
            role: role.map(str::to_string),
            exp: exp.timestamp(),
        };
        jsonwebtoken::encode(&Header::new(alg), &claims, &EncodingKey::from_secret(secret.as_bytes()))
            .unwrap()
    }

    #[test]
    fn valid_token_yields_credential() {
        let now = Utc::now();
        let token = mint(Algorithm::HS256, SECRET, Some("vendor"), now + Duration::minutes(10));

        let cred = HmacCredentialValidator::new(SECRET).validate(&token, now).unwrap();
        assert_eq!(cred.role, Role::Vendor);
        assert_eq!(cred.subject_id.as_str(), "0f9d2c");
    }

    #[test]
    fn other_hmac_widths_are_accepted() {
        let now = Utc::now();
        let validator = HmacCredentialValidator::new(SECRET);
        for alg in [Algorithm::HS384, Algorithm::HS512] {
            let token = mint(alg, SECRET, Some("admin"), now + Duration::minutes(1));
            assert!(validator.validate(&token, now).is_ok(), "{alg:?}");
        }
    }

    #[test]
    fn empty_token_is_missing() {
        let v = HmacCredentialValidator::new(SECRET);
        assert_eq!(v.validate("", Utc::now()), Err(InvalidCredential::Missing));
    }

    #[test]
    fn wrong_segment_count_is_malformed() {
        let v = HmacCredentialValidator::new(SECRET);
        assert_eq!(v.validate("abc.def", Utc::now()), Err(InvalidCredential::Malformed));
        assert_eq!(v.validate("a.b.c.d", Utc::now()), Err(InvalidCredential::Malformed));
    }

    #[test]
    fn garbage_segments_are_malformed() {
        let v = HmacCredentialValidator::new(SECRET);
        assert_eq!(v.validate("a.b.c", Utc::now()), Err(InvalidCredential::Malformed));
    }

    #[test]
    fn foreign_secret_is_signature_mismatch() {
        let now = Utc::now();
        let token = mint(Algorithm::HS256, "someone-else", Some("admin"), now + Duration::minutes(1));
        assert_eq!(
            HmacCredentialValidator::new(SECRET).validate(&token, now),
            Err(InvalidCredential::SignatureMismatch)
        );
    }

    #[test]
    fn expired_token_is_rejected() {
        let now = Utc::now();
        let token = mint(Algorithm::HS256, SECRET, Some("client"), now - Duration::seconds(1));
        assert_eq!(
            HmacCredentialValidator::new(SECRET).validate(&token, now),
            Err(InvalidCredential::Expired)
        );
    }

    #[test]
    fn unsigned_token_is_malformed() {
        // {"alg":"none","typ":"JWT"} . {"user_id":"x","role":"admin","exp":9999999999} .
        let token = "eyJhbGciOiJub25lIiwidHlwIjoiSldUIn0.\
                     eyJ1c2VyX2lkIjoieCIsInJvbGUiOiJhZG1pbiIsImV4cCI6OTk5OTk5OTk5OX0.";
        assert_eq!(
            HmacCredentialValidator::new(SECRET).validate(token, Utc::now()),
            Err(InvalidCredential::Malformed)
        );
    }

    #[test]
    fn unknown_role_is_malformed_even_when_signed() {
        let now = Utc::now();
        let token = mint(Algorithm::HS256, SECRET, Some("superuser"), now + Duration::minutes(1));
        assert_eq!(
            HmacCredentialValidator::new(SECRET).validate(&token, now),
            Err(InvalidCredential::Malformed)
        );
    }
}
