use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use hosteldesk_core::AccountId;

/// Authorization attributes attached to an identity account.
///
/// These ride along in every issued token so that most requests can be
/// authorized without a record-store read. They may be stale; the employee
/// record is authoritative.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    #[serde(rename = "isAdmin", default)]
    pub is_admin: bool,

    #[serde(rename = "isOversight", alias = "isCRM", alias = "isHostelOffice", default)]
    pub is_oversight: bool,
}

/// Claims carried by a bearer token once its signature has been verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthClaims {
    /// Account id of the caller.
    pub sub: AccountId,

    pub email: String,

    /// Project the token was issued for.
    pub aud: String,

    pub iss: String,

    /// Issued-at (unix seconds).
    pub iat: i64,

    /// Expiry (unix seconds).
    pub exp: i64,

    #[serde(flatten)]
    pub authorization: AuthorizationClaims,
}

impl AuthClaims {
    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.iat, 0)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token is malformed")]
    Malformed,

    #[error("token has expired")]
    Expired,

    #[error("token has been revoked")]
    Revoked,

    #[error("token was issued for a different project")]
    ProjectMismatch,
}

impl TokenValidationError {
    /// Stable reason code reported alongside a 401.
    pub fn reason_code(&self) -> &'static str {
        match self {
            TokenValidationError::Malformed => "malformed",
            TokenValidationError::Expired => "expired",
            TokenValidationError::Revoked => "revoked",
            TokenValidationError::ProjectMismatch => "project-mismatch",
        }
    }
}

/// Deterministically validate decoded claims.
///
/// Signature verification and revocation lookups happen in the identity
/// gateway; this checks the time window and the project binding only.
pub fn validate_claims(
    claims: &AuthClaims,
    now: DateTime<Utc>,
    project_id: &str,
) -> Result<(), TokenValidationError> {
    if claims.exp <= claims.iat || claims.sub.as_str().is_empty() {
        return Err(TokenValidationError::Malformed);
    }
    if claims.aud != project_id {
        return Err(TokenValidationError::ProjectMismatch);
    }
    let now = now.timestamp();
    if now < claims.iat {
        return Err(TokenValidationError::Malformed);
    }
    if now >= claims.exp {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(iat: i64, exp: i64, aud: &str) -> AuthClaims {
        AuthClaims {
            sub: AccountId::new("acc-1"),
            email: "warden@hostel.test".to_string(),
            aud: aud.to_string(),
            iss: "hosteldesk".to_string(),
            iat,
            exp,
            authorization: AuthorizationClaims::default(),
        }
    }

    #[test]
    fn valid_window_passes() {
        let now = Utc::now();
        let c = claims(now.timestamp() - 10, now.timestamp() + 600, "proj");
        assert_eq!(validate_claims(&c, now, "proj"), Ok(()));
    }

    #[test]
    fn expired_token_is_rejected() {
        let now = Utc::now();
        let c = claims(now.timestamp() - 600, now.timestamp() - 1, "proj");
        assert_eq!(validate_claims(&c, now, "proj"), Err(TokenValidationError::Expired));
    }

    #[test]
    fn audience_must_match_project() {
        let now = Utc::now();
        let c = claims(now.timestamp() - 10, now.timestamp() + 600, "other");
        let err = validate_claims(&c, now, "proj").unwrap_err();
        assert_eq!(err.reason_code(), "project-mismatch");
    }

    #[test]
    fn inverted_window_is_malformed() {
        let now = Utc::now();
        let c = claims(now.timestamp(), now.timestamp(), "proj");
        assert_eq!(validate_claims(&c, now, "proj"), Err(TokenValidationError::Malformed));
    }

    #[test]
    fn legacy_claim_names_are_accepted() {
        let json = serde_json::json!({ "role": "CRM", "isCRM": true });
        let parsed: AuthorizationClaims = serde_json::from_value(json).unwrap();
        assert!(parsed.is_oversight);
        assert!(!parsed.is_admin);
    }
}
