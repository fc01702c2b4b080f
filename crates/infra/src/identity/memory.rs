use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use rand::distributions::Alphanumeric;

use hosteldesk_auth::AuthorizationClaims;
use hosteldesk_core::AccountId;

use super::{AccountRecord, IdentityError, IdentityProvider};

const MIN_PASSWORD_LEN: usize = 6;

/// In-memory identity provider for tests/dev.
///
/// Emails are unique (case-insensitive). Supports injecting transient
/// failures and latency to exercise retry and timeout handling.
#[derive(Debug, Default)]
pub struct InMemoryIdentityProvider {
    accounts: RwLock<HashMap<AccountId, AccountRecord>>,
    next_id: AtomicU64,
    pending_failures: AtomicU32,
    latency_ms: AtomicU64,
}

impl InMemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` calls with `Unavailable`.
    pub fn inject_failures(&self, n: u32) {
        self.pending_failures.store(n, Ordering::SeqCst);
    }

    /// Delay every call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    /// Create an account directly, bypassing the gateway (seeding).
    pub fn seed_account(&self, email: &str, display_name: &str, claims: AuthorizationClaims) -> AccountId {
        let id = self.allocate_id();
        let record = AccountRecord {
            account_id: id.clone(),
            email: email.trim().to_lowercase(),
            display_name: Some(display_name.to_string()),
            disabled: false,
            claims,
            tokens_valid_after: None,
        };
        if let Ok(mut accounts) = self.accounts.write() {
            accounts.insert(id.clone(), record);
        }
        id
    }

    fn allocate_id(&self) -> AccountId {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(12)
            .map(char::from)
            .collect();
        AccountId::new(format!("uid{n}{suffix}"))
    }

    async fn enter(&self) -> Result<(), IdentityError> {
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        let injected = self
            .pending_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(IdentityError::Unavailable("injected failure".to_string()));
        }
        Ok(())
    }

    fn with_account<T>(
        &self,
        id: &AccountId,
        f: impl FnOnce(&mut AccountRecord) -> T,
    ) -> Result<T, IdentityError> {
        let mut accounts = self
            .accounts
            .write()
            .map_err(|_| IdentityError::Unavailable("account table lock poisoned".to_string()))?;
        accounts
            .get_mut(id)
            .map(f)
            .ok_or_else(|| IdentityError::AccountNotFound(id.clone()))
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn get_account(&self, id: &AccountId) -> Result<Option<AccountRecord>, IdentityError> {
        self.enter().await?;
        let accounts = self
            .accounts
            .read()
            .map_err(|_| IdentityError::Unavailable("account table lock poisoned".to_string()))?;
        Ok(accounts.get(id).cloned())
    }

    async fn get_account_by_email(&self, email: &str) -> Result<Option<AccountRecord>, IdentityError> {
        self.enter().await?;
        let accounts = self
            .accounts
            .read()
            .map_err(|_| IdentityError::Unavailable("account table lock poisoned".to_string()))?;
        Ok(accounts
            .values()
            .find(|a| a.email.eq_ignore_ascii_case(email.trim()))
            .cloned())
    }

    async fn create_account(
        &self,
        email: &str,
        display_name: &str,
        password: &str,
    ) -> Result<AccountRecord, IdentityError> {
        self.enter().await?;
        if password.len() < MIN_PASSWORD_LEN {
            return Err(IdentityError::Rejected(
                "password must be at least 6 characters".to_string(),
            ));
        }

        let email = email.trim().to_lowercase();
        let mut accounts = self
            .accounts
            .write()
            .map_err(|_| IdentityError::Unavailable("account table lock poisoned".to_string()))?;
        if accounts.values().any(|a| a.email == email) {
            return Err(IdentityError::EmailExists(email));
        }

        let record = AccountRecord {
            account_id: self.allocate_id(),
            email,
            display_name: Some(display_name.to_string()),
            disabled: false,
            claims: AuthorizationClaims::default(),
            tokens_valid_after: None,
        };
        accounts.insert(record.account_id.clone(), record.clone());
        Ok(record)
    }

    async fn set_claims(&self, id: &AccountId, claims: AuthorizationClaims) -> Result<(), IdentityError> {
        self.enter().await?;
        self.with_account(id, |a| a.claims = claims)
    }

    async fn set_disabled(&self, id: &AccountId, disabled: bool) -> Result<(), IdentityError> {
        self.enter().await?;
        self.with_account(id, |a| a.disabled = disabled)
    }

    async fn revoke_tokens(&self, id: &AccountId) -> Result<(), IdentityError> {
        self.enter().await?;
        self.with_account(id, |a| a.tokens_valid_after = Some(Utc::now()))
    }

    async fn delete_account(&self, id: &AccountId) -> Result<(), IdentityError> {
        self.enter().await?;
        let mut accounts = self
            .accounts
            .write()
            .map_err(|_| IdentityError::Unavailable("account table lock poisoned".to_string()))?;
        accounts
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| IdentityError::AccountNotFound(id.clone()))
    }

    async fn password_reset_link(&self, email: &str, continue_url: &str) -> Result<String, IdentityError> {
        self.enter().await?;
        if self.get_account_by_email_unchecked(email)?.is_none() {
            return Err(IdentityError::Rejected(format!("no account for {email}")));
        }
        let code: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(24)
            .map(char::from)
            .collect();
        Ok(format!(
            "{continue_url}?mode=resetPassword&oobCode={code}"
        ))
    }
}

impl InMemoryIdentityProvider {
    fn get_account_by_email_unchecked(&self, email: &str) -> Result<Option<AccountId>, IdentityError> {
        let accounts = self
            .accounts
            .read()
            .map_err(|_| IdentityError::Unavailable("account table lock poisoned".to_string()))?;
        Ok(accounts
            .values()
            .find(|a| a.email.eq_ignore_ascii_case(email.trim()))
            .map(|a| a.account_id.clone()))
    }
}
