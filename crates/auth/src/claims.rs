use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use zyra_core::SubjectId;

use crate::validator::InvalidCredential;
use crate::Role;

/// Claims as they appear inside a signed token issued by the auth service.
///
/// Fields are kept loose here so that a missing or unknown role surfaces as
/// [`InvalidCredential::Malformed`] from [`validate_claims`] instead of an
/// opaque decode failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialClaims {
    /// Subject identifier.
    #[serde(alias = "sub")]
    pub user_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// Expiry, unix seconds.
    pub exp: i64,
}

/// A fully validated credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub subject_id: SubjectId,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
}

/// Turn decoded claims into a [`Credential`], checking expiry against `now`.
///
/// Signature verification happens before this in the validator.
pub fn validate_claims(
    claims: &CredentialClaims,
    now: DateTime<Utc>,
) -> Result<Credential, InvalidCredential> {
    let role = claims
        .role
        .as_deref()
        .ok_or(InvalidCredential::Malformed)?
        .parse::<Role>()
        .map_err(|_| InvalidCredential::Malformed)?;

    let subject_id =
        SubjectId::new(claims.user_id.clone()).map_err(|_| InvalidCredential::Malformed)?;

    let expires_at =
        DateTime::<Utc>::from_timestamp(claims.exp, 0).ok_or(InvalidCredential::Malformed)?;
    if now >= expires_at {
        return Err(InvalidCredential::Expired);
    }

    Ok(Credential {
        subject_id,
        role,
        expires_at,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn claims(role: Option<&str>, exp: DateTime<Utc>) -> CredentialClaims {
        CredentialClaims {
            user_id: "9b2e5d".to_string(),
            role: role.map(str::to_string),
            exp: exp.timestamp(),
        }
    }

    #[test]
    fn accepts_known_role_before_expiry() {
        let now = Utc::now();
        let cred = validate_claims(&claims(Some("client"), now + Duration::minutes(5)), now).unwrap();
        assert_eq!(cred.role, Role::Client);
        assert_eq!(cred.subject_id.as_str(), "9b2e5d");
    }

    #[test]
    fn missing_or_unknown_role_is_malformed() {
        let now = Utc::now();
        let exp = now + Duration::minutes(5);
        assert_eq!(validate_claims(&claims(None, exp), now), Err(InvalidCredential::Malformed));
        assert_eq!(
            validate_claims(&claims(Some("root"), exp), now),
            Err(InvalidCredential::Malformed)
        );
    }

    #[test]
    fn expiry_is_inclusive() {
        let now = Utc::now();
        let exp = DateTime::<Utc>::from_timestamp(now.timestamp(), 0).unwrap();
        assert_eq!(
            validate_claims(&claims(Some("admin"), exp), exp),
            Err(InvalidCredential::Expired)
        );
    }

    #[test]
    fn blank_subject_is_malformed() {
        let now = Utc::now();
        let mut c = claims(Some("admin"), now + Duration::minutes(1));
        c.user_id = String::new();
        assert_eq!(validate_claims(&c, now), Err(InvalidCredential::Malformed));
    }
}
