use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use moka::future::Cache;
use rand::Rng;
use rand::distributions::Alphanumeric;

use hosteldesk_auth::{AuthClaims, AuthorizationClaims, TokenValidationError, validate_claims};
use hosteldesk_core::{AccountId, DomainError};

use crate::config::IdentityConfig;
use crate::error::ServiceError;
use crate::retry::{RetryPolicy, with_retry};

use super::{IdentityError, IdentityProvider};

const MEMO_CAPACITY: u64 = 10_000;
const MEMO_TTL: Duration = Duration::from_secs(15 * 60);

/// Outcome of a best-effort account removal.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AccountRemoval {
    Removed,
    AlreadyAbsent,
}

/// Verifies bearer tokens and performs account operations against the
/// identity provider, each under the configured retry/timeout policy.
pub struct IdentityGateway {
    provider: Arc<dyn IdentityProvider>,
    project_id: String,
    issuer: String,
    token_ttl: Duration,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    retry: RetryPolicy,
    /// Last claims seen per account. Advisory only.
    memo: Cache<AccountId, AuthorizationClaims>,
}

impl IdentityGateway {
    pub fn new(provider: Arc<dyn IdentityProvider>, config: &IdentityConfig, retry: RetryPolicy) -> Self {
        Self {
            provider,
            project_id: config.project_id.clone(),
            issuer: config.issuer.clone(),
            token_ttl: Duration::from_secs(config.token_ttl_secs),
            encoding_key: EncodingKey::from_secret(config.signing_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.signing_secret.as_bytes()),
            retry,
            memo: Cache::builder()
                .max_capacity(MEMO_CAPACITY)
                .time_to_live(MEMO_TTL)
                .build(),
        }
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Verify a bearer token: signature, time window, project binding, then
    /// account state (removed, disabled, or revoked after issue).
    pub async fn verify_token(&self, token: &str) -> Result<AuthClaims, ServiceError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Window and audience are checked by `validate_claims` so that each
        // failure maps to its own reason code.
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims = HashSet::new();

        let claims = decode::<AuthClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "bearer token rejected");
                TokenValidationError::Malformed
            })?;

        validate_claims(&claims, Utc::now(), &self.project_id)?;

        let account = with_retry(&self.retry, "account lookup", self.retry.lookup_timeout, || {
            self.provider.get_account(&claims.sub)
        })
        .await?;

        let Some(account) = account else {
            tracing::info!(account_id = %claims.sub, "token for removed account");
            return Err(TokenValidationError::Revoked.into());
        };
        if account.disabled {
            tracing::info!(account_id = %claims.sub, "token for disabled account");
            return Err(TokenValidationError::Revoked.into());
        }
        if let Some(valid_after) = account.tokens_valid_after {
            if claims.iat < valid_after.timestamp() {
                return Err(TokenValidationError::Revoked.into());
            }
        }

        self.memo
            .insert(claims.sub.clone(), claims.authorization.clone())
            .await;
        Ok(claims)
    }

    /// Get-or-create the account for `email`.
    ///
    /// A concurrent creation that surfaces as "email exists" resolves to the
    /// existing account.
    pub async fn provision_account(&self, email: &str, display_name: &str) -> Result<AccountId, ServiceError> {
        let existing = with_retry(&self.retry, "account lookup", self.retry.lookup_timeout, || {
            self.provider.get_account_by_email(email)
        })
        .await?;
        if let Some(account) = existing {
            tracing::info!(account_id = %account.account_id, "account already exists");
            return Ok(account.account_id);
        }

        let secret = one_time_password();
        let password = secret.as_str();
        let created = with_retry(&self.retry, "account creation", self.retry.lookup_timeout, move || async move {
            match self.provider.create_account(email, display_name, password).await {
                Ok(account) => Ok(Some(account)),
                Err(IdentityError::EmailExists(_)) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await?;

        if let Some(account) = created {
            tracing::info!(account_id = %account.account_id, "account created");
            return Ok(account.account_id);
        }

        let raced = with_retry(&self.retry, "account lookup", self.retry.lookup_timeout, || {
            self.provider.get_account_by_email(email)
        })
        .await?;
        raced.map(|a| a.account_id).ok_or_else(|| {
            DomainError::conflict(format!("an account with email {email} already exists")).into()
        })
    }

    pub async fn set_authorization_claims(
        &self,
        account_id: &AccountId,
        claims: AuthorizationClaims,
    ) -> Result<(), ServiceError> {
        with_retry(&self.retry, "claims update", self.retry.write_timeout, || {
            self.provider.set_claims(account_id, claims.clone())
        })
        .await?;
        self.memo.insert(account_id.clone(), claims).await;
        Ok(())
    }

    /// Disabling also revokes outstanding tokens.
    pub async fn set_login_enabled(&self, account_id: &AccountId, enabled: bool) -> Result<(), ServiceError> {
        with_retry(&self.retry, "account update", self.retry.write_timeout, || {
            self.provider.set_disabled(account_id, !enabled)
        })
        .await?;
        if !enabled {
            self.revoke_tokens(account_id).await?;
        }
        Ok(())
    }

    /// Tokens issued before now stop verifying.
    pub async fn revoke_tokens(&self, account_id: &AccountId) -> Result<(), ServiceError> {
        with_retry(&self.retry, "token revocation", self.retry.write_timeout, || {
            self.provider.revoke_tokens(account_id)
        })
        .await?;
        self.memo.invalidate(account_id).await;
        Ok(())
    }

    /// Idempotent: a missing account is reported, not failed.
    pub async fn remove_account(&self, account_id: &AccountId) -> Result<AccountRemoval, ServiceError> {
        let outcome = with_retry(&self.retry, "account removal", self.retry.write_timeout, move || async move {
            match self.provider.delete_account(account_id).await {
                Ok(()) => Ok(AccountRemoval::Removed),
                Err(IdentityError::AccountNotFound(_)) => Ok(AccountRemoval::AlreadyAbsent),
                Err(e) => Err(e),
            }
        })
        .await?;
        self.memo.invalidate(account_id).await;
        Ok(outcome)
    }

    pub async fn password_reset_link(&self, email: &str, continue_url: &str) -> Result<String, ServiceError> {
        with_retry(&self.retry, "password reset link", self.retry.write_timeout, || {
            self.provider.password_reset_link(email, continue_url)
        })
        .await
    }

    /// Mint a signed token carrying the account's current claims.
    pub async fn issue_token(&self, account_id: &AccountId) -> Result<String, ServiceError> {
        let account = with_retry(&self.retry, "account lookup", self.retry.lookup_timeout, || {
            self.provider.get_account(account_id)
        })
        .await?
        .ok_or_else(|| DomainError::not_found(format!("account {account_id}")))?;

        let now = Utc::now().timestamp();
        let claims = AuthClaims {
            sub: account.account_id,
            email: account.email,
            aud: self.project_id.clone(),
            iss: self.issuer.clone(),
            iat: now,
            exp: now + self.token_ttl.as_secs() as i64,
            authorization: account.claims,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| ServiceError::upstream("token signing", e.to_string()))
    }

    pub async fn last_seen_claims(&self, account_id: &AccountId) -> Option<AuthorizationClaims> {
        self.memo.get(account_id).await
    }
}

fn one_time_password() -> String {
    let body: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(12)
        .map(char::from)
        .collect();
    format!("{body}A1!")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::InMemoryIdentityProvider;

    fn config() -> IdentityConfig {
        IdentityConfig {
            signing_secret: "test-signing-secret".to_string(),
            project_id: "hosteldesk-test".to_string(),
            issuer: "hosteldesk".to_string(),
            token_ttl_secs: 3600,
        }
    }

    fn gateway(provider: Arc<InMemoryIdentityProvider>) -> IdentityGateway {
        IdentityGateway::new(
            provider,
            &config(),
            RetryPolicy::fixed(3, Duration::from_millis(1)),
        )
    }

    #[tokio::test]
    async fn issued_tokens_verify_with_their_claims() {
        let provider = Arc::new(InMemoryIdentityProvider::new());
        let gateway = gateway(provider.clone());
        let id = gateway.provision_account("warden@hostel.test", "Warden").await.unwrap();
        gateway
            .set_authorization_claims(
                &id,
                AuthorizationClaims {
                    role: Some("Supervisor".to_string()),
                    is_admin: false,
                    is_oversight: false,
                },
            )
            .await
            .unwrap();

        let token = gateway.issue_token(&id).await.unwrap();
        let claims = gateway.verify_token(&token).await.unwrap();
        assert_eq!(claims.sub, id);
        assert_eq!(claims.authorization.role.as_deref(), Some("Supervisor"));
        assert!(gateway.last_seen_claims(&id).await.is_some());
    }

    #[tokio::test]
    async fn provisioning_is_get_or_create() {
        let provider = Arc::new(InMemoryIdentityProvider::new());
        let gateway = gateway(provider.clone());
        let first = gateway.provision_account("a@hostel.test", "A").await.unwrap();
        let second = gateway.provision_account("A@hostel.test", "A").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn disabled_and_removed_accounts_are_revoked() {
        let provider = Arc::new(InMemoryIdentityProvider::new());
        let gateway = gateway(provider.clone());
        let id = gateway.provision_account("tm@hostel.test", "TM").await.unwrap();
        let token = gateway.issue_token(&id).await.unwrap();

        gateway.set_login_enabled(&id, false).await.unwrap();
        let err = gateway.verify_token(&token).await.unwrap_err();
        assert!(matches!(err, ServiceError::Unauthenticated(TokenValidationError::Revoked)));

        assert_eq!(gateway.remove_account(&id).await.unwrap(), AccountRemoval::Removed);
        assert_eq!(gateway.remove_account(&id).await.unwrap(), AccountRemoval::AlreadyAbsent);
    }

    #[tokio::test]
    async fn foreign_project_and_garbage_tokens_are_rejected() {
        let provider = Arc::new(InMemoryIdentityProvider::new());
        let ours = gateway(provider.clone());
        let id = ours.provision_account("x@hostel.test", "X").await.unwrap();

        let foreign = IdentityGateway::new(
            provider.clone(),
            &IdentityConfig {
                project_id: "someone-else".to_string(),
                ..config()
            },
            RetryPolicy::no_retry(),
        );
        let token = foreign.issue_token(&id).await.unwrap();
        let err = ours.verify_token(&token).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Unauthenticated(TokenValidationError::ProjectMismatch)
        ));

        let err = ours.verify_token("not.a.jwt").await.unwrap_err();
        assert!(matches!(err, ServiceError::Unauthenticated(TokenValidationError::Malformed)));
    }

    #[tokio::test]
    async fn transient_provider_failures_are_retried() {
        let provider = Arc::new(InMemoryIdentityProvider::new());
        let gateway = gateway(provider.clone());
        provider.inject_failures(2);
        assert!(gateway.provision_account("r@hostel.test", "R").await.is_ok());
    }
}
