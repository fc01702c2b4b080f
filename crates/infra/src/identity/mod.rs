//! Identity provider boundary.
//!
//! `IdentityProvider` abstracts the hosted account service (accounts, custom
//! claims, login state). `IdentityGateway` layers token verification,
//! retry/timeout policy and the claims memo on top of it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use hosteldesk_auth::AuthorizationClaims;
use hosteldesk_core::{AccountId, DomainError};

use crate::error::ServiceError;
use crate::retry::Retryable;

pub mod gateway;
pub mod memory;

pub use gateway::{AccountRemoval, IdentityGateway};
pub use memory::InMemoryIdentityProvider;

/// Account as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountRecord {
    pub account_id: AccountId,
    pub email: String,
    pub display_name: Option<String>,
    pub disabled: bool,
    pub claims: AuthorizationClaims,
    /// Tokens issued before this instant are revoked.
    pub tokens_valid_after: Option<DateTime<Utc>>,
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("account not found: {0}")]
    AccountNotFound(AccountId),

    #[error("an account with email {0} already exists")]
    EmailExists(String),

    #[error("identity provider rejected the request: {0}")]
    Rejected(String),

    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

impl Retryable for IdentityError {
    fn is_retryable(&self) -> bool {
        matches!(self, IdentityError::Unavailable(_))
    }
}

impl From<IdentityError> for ServiceError {
    fn from(value: IdentityError) -> Self {
        match value {
            IdentityError::AccountNotFound(id) => DomainError::not_found(format!("account {id}")).into(),
            IdentityError::EmailExists(email) => {
                DomainError::conflict(format!("an account with email {email} already exists")).into()
            }
            IdentityError::Rejected(msg) => DomainError::validation(msg).into(),
            IdentityError::Unavailable(msg) => ServiceError::upstream("identity provider", msg),
        }
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn get_account(&self, id: &AccountId) -> Result<Option<AccountRecord>, IdentityError>;

    async fn get_account_by_email(&self, email: &str) -> Result<Option<AccountRecord>, IdentityError>;

    /// Fails with `EmailExists` when the email is taken.
    async fn create_account(
        &self,
        email: &str,
        display_name: &str,
        password: &str,
    ) -> Result<AccountRecord, IdentityError>;

    /// Replaces the account's custom claims.
    async fn set_claims(&self, id: &AccountId, claims: AuthorizationClaims) -> Result<(), IdentityError>;

    async fn set_disabled(&self, id: &AccountId, disabled: bool) -> Result<(), IdentityError>;

    /// Revoke every token issued before now.
    async fn revoke_tokens(&self, id: &AccountId) -> Result<(), IdentityError>;

    async fn delete_account(&self, id: &AccountId) -> Result<(), IdentityError>;

    async fn password_reset_link(&self, email: &str, continue_url: &str) -> Result<String, IdentityError>;
}
