//! Request authentication: bearer credential → reconciled [`Principal`].

use hosteldesk_auth::{Principal, RecordAuthorization, TokenValidationError, resolve_authorization};

use crate::error::ServiceError;
use crate::identity::IdentityGateway;
use crate::retry::with_retry;
use crate::store::EmployeeStore;

/// Extract the token from an `Authorization` header value.
///
/// Missing, non-`Bearer` and empty credentials are rejected here, before
/// any upstream lookup.
pub fn bearer_token(header: Option<&str>) -> Result<&str, TokenValidationError> {
    let header = header.ok_or(TokenValidationError::Malformed)?;
    let token = header
        .strip_prefix("Bearer ")
        .ok_or(TokenValidationError::Malformed)?
        .trim();
    if token.is_empty() {
        return Err(TokenValidationError::Malformed);
    }
    Ok(token)
}

/// Verify the credential and reconcile its claims with the employee record.
///
/// The record is always re-read; the gateway's claims memo is never used
/// here.
pub async fn authenticate(
    gateway: &IdentityGateway,
    employees: &dyn EmployeeStore,
    authorization_header: Option<&str>,
) -> Result<Principal, ServiceError> {
    let token = bearer_token(authorization_header)?;
    let claims = gateway.verify_token(token).await?;

    let policy = gateway.retry_policy();
    let stored = with_retry(policy, "employee lookup", policy.lookup_timeout, || {
        employees.find_by_account(&claims.sub)
    })
    .await?;

    let record = stored.as_ref().map(|s| RecordAuthorization::from(&s.employee));
    if record.as_ref().is_some_and(|r| !r.is_active) {
        tracing::info!(account_id = %claims.sub, "token for inactive employee record");
        return Err(TokenValidationError::Revoked.into());
    }

    let principal = resolve_authorization(&claims, record.as_ref());
    tracing::debug!(
        account_id = %principal.account_id,
        is_admin = principal.is_admin,
        is_oversight = principal.is_oversight,
        has_record = record.is_some(),
        "request authenticated"
    );
    Ok(principal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::Utc;
    use hosteldesk_auth::{Affiliation, AuthorizationClaims, Role};
    use hosteldesk_employees::Employee;

    use crate::config::IdentityConfig;
    use crate::identity::InMemoryIdentityProvider;
    use crate::retry::RetryPolicy;
    use crate::store::InMemoryEmployeeStore;

    fn gateway(provider: Arc<InMemoryIdentityProvider>) -> IdentityGateway {
        IdentityGateway::new(
            provider,
            &IdentityConfig {
                signing_secret: "access-test-secret".to_string(),
                project_id: "hosteldesk-test".to_string(),
                issuer: "hosteldesk".to_string(),
                token_ttl_secs: 600,
            },
            RetryPolicy::fixed(2, Duration::from_millis(1)),
        )
    }

    #[test]
    fn header_shapes_are_checked_before_lookup() {
        assert_eq!(bearer_token(None), Err(TokenValidationError::Malformed));
        assert_eq!(bearer_token(Some("Basic abc")), Err(TokenValidationError::Malformed));
        assert_eq!(bearer_token(Some("Bearer   ")), Err(TokenValidationError::Malformed));
        assert_eq!(bearer_token(Some("Bearer abc.def")), Ok("abc.def"));
    }

    #[tokio::test]
    async fn record_flags_elevate_stale_claims() {
        let provider = Arc::new(InMemoryIdentityProvider::new());
        let id = provider.seed_account("lead@hostel.test", "Lead", AuthorizationClaims::default());
        let gateway = gateway(provider);
        let store = InMemoryEmployeeStore::new();
        store
            .upsert(Employee {
                id: id.clone(),
                name: "Lead".to_string(),
                email: "lead@hostel.test".to_string(),
                role: Role::new(Role::SUPERVISOR),
                affiliation: Some(Affiliation::Department("Water".to_string())),
                is_admin: true,
                is_oversight: false,
                is_active: true,
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        let token = gateway.issue_token(&id).await.unwrap();
        let header = format!("Bearer {token}");
        let principal = authenticate(&gateway, &store, Some(&header)).await.unwrap();

        assert!(principal.is_admin);
        assert_eq!(principal.display_name.as_deref(), Some("Lead"));
        assert_eq!(
            principal.affiliation,
            Some(Affiliation::Department("Water".to_string()))
        );
    }

    #[tokio::test]
    async fn missing_header_never_reaches_the_provider() {
        let provider = Arc::new(InMemoryIdentityProvider::new());
        provider.inject_failures(10);
        let gateway = gateway(provider);
        let store = InMemoryEmployeeStore::new();

        let err = authenticate(&gateway, &store, None).await.unwrap_err();
        assert!(matches!(err, ServiceError::Unauthenticated(TokenValidationError::Malformed)));
    }
}
