//! Record store abstractions (employee, escalation and settings documents).
//!
//! Traits keep the lifecycle and workflow managers independent of the
//! backing document database; `memory` provides the dev/test adapters.

use async_trait::async_trait;
use thiserror::Error;

use hosteldesk_core::{AccountId, DocumentKey, EscalationId, ExpectedVersion, Settings};
use hosteldesk_employees::Employee;
use hosteldesk_escalations::Escalation;

use crate::error::ServiceError;
use crate::retry::Retryable;

pub mod memory;

pub use memory::{InMemoryEmployeeStore, InMemoryEscalationStore, InMemorySettingsStore};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    #[error("document already exists: {0}")]
    AlreadyExists(String),

    #[error("record store unavailable: {0}")]
    Unavailable(String),
}

impl Retryable for StoreError {
    fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Concurrency(msg) | StoreError::AlreadyExists(msg) => {
                hosteldesk_core::DomainError::conflict(msg).into()
            }
            StoreError::Unavailable(msg) => ServiceError::upstream("record store", msg),
        }
    }
}

/// An employee document together with its storage key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEmployee {
    pub key: DocumentKey,
    pub employee: Employee,
}

#[async_trait]
pub trait EmployeeStore: Send + Sync {
    /// Locate by the stored `id` attribute (never by document key).
    async fn find_by_account(&self, id: &AccountId) -> Result<Option<StoredEmployee>, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<StoredEmployee>, StoreError>;

    /// Merge-write the record for `employee.id`.
    ///
    /// An existing document keeps its key and `created_at`; a new one is
    /// keyed by the account id.
    async fn upsert(&self, employee: Employee) -> Result<StoredEmployee, StoreError>;

    /// Write under an explicit key (imports of records keyed elsewhere).
    async fn insert_with_key(&self, key: DocumentKey, employee: Employee) -> Result<(), StoreError>;

    async fn replace(&self, key: &DocumentKey, employee: Employee) -> Result<(), StoreError>;

    /// Returns `false` if there was nothing to remove.
    async fn remove(&self, key: &DocumentKey) -> Result<bool, StoreError>;

    async fn list(&self) -> Result<Vec<Employee>, StoreError>;
}

#[async_trait]
pub trait EscalationStore: Send + Sync {
    async fn insert(&self, escalation: Escalation) -> Result<(), StoreError>;

    async fn get(&self, id: &EscalationId) -> Result<Option<Escalation>, StoreError>;

    /// Replace the document if it is still at `expected`.
    async fn save(&self, escalation: Escalation, expected: ExpectedVersion) -> Result<(), StoreError>;

    /// Newest first.
    async fn list(&self) -> Result<Vec<Escalation>, StoreError>;

    async fn count_with_status(&self, status: &str) -> Result<usize, StoreError>;
}

#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn load(&self) -> Result<Settings, StoreError>;

    async fn save(&self, settings: Settings) -> Result<(), StoreError>;
}
