use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;

use hosteldesk_core::{AccountId, AggregateRoot, DocumentKey, EscalationId, ExpectedVersion, Settings};
use hosteldesk_employees::Employee;
use hosteldesk_escalations::Escalation;

use super::{EmployeeStore, EscalationStore, SettingsStore, StoreError, StoredEmployee};

fn poisoned() -> StoreError {
    StoreError::Unavailable("in-memory store lock poisoned".to_string())
}

/// In-memory employee collection for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryEmployeeStore {
    inner: RwLock<HashMap<DocumentKey, Employee>>,
    pending_failures: AtomicU32,
}

impl InMemoryEmployeeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` calls with `Unavailable`.
    pub fn inject_failures(&self, n: u32) {
        self.pending_failures.store(n, Ordering::SeqCst);
    }

    fn enter(&self) -> Result<(), StoreError> {
        let injected = self
            .pending_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(StoreError::Unavailable("injected failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl EmployeeStore for InMemoryEmployeeStore {
    async fn find_by_account(&self, id: &AccountId) -> Result<Option<StoredEmployee>, StoreError> {
        self.enter()?;
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map
            .iter()
            .find(|(_, e)| &e.id == id)
            .map(|(key, employee)| StoredEmployee {
                key: key.clone(),
                employee: employee.clone(),
            }))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<StoredEmployee>, StoreError> {
        self.enter()?;
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map
            .iter()
            .find(|(_, e)| e.email.eq_ignore_ascii_case(email))
            .map(|(key, employee)| StoredEmployee {
                key: key.clone(),
                employee: employee.clone(),
            }))
    }

    async fn upsert(&self, mut employee: Employee) -> Result<StoredEmployee, StoreError> {
        self.enter()?;
        let mut map = self.inner.write().map_err(|_| poisoned())?;

        let existing = map
            .iter()
            .find(|(_, e)| e.id == employee.id)
            .map(|(key, e)| (key.clone(), e.created_at));

        let key = match existing {
            Some((key, created_at)) => {
                employee.created_at = created_at;
                key
            }
            None => {
                let preferred = DocumentKey::for_account(&employee.id);
                if map.contains_key(&preferred) {
                    DocumentKey::generate()
                } else {
                    preferred
                }
            }
        };

        map.insert(key.clone(), employee.clone());
        Ok(StoredEmployee { key, employee })
    }

    async fn insert_with_key(&self, key: DocumentKey, employee: Employee) -> Result<(), StoreError> {
        self.enter()?;
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        if map.contains_key(&key) {
            return Err(StoreError::AlreadyExists(key.to_string()));
        }
        map.insert(key, employee);
        Ok(())
    }

    async fn replace(&self, key: &DocumentKey, employee: Employee) -> Result<(), StoreError> {
        self.enter()?;
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        match map.get_mut(key) {
            Some(slot) => {
                *slot = employee;
                Ok(())
            }
            None => Err(StoreError::Concurrency(format!(
                "employee document {key} was removed"
            ))),
        }
    }

    async fn remove(&self, key: &DocumentKey) -> Result<bool, StoreError> {
        self.enter()?;
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        Ok(map.remove(key).is_some())
    }

    async fn list(&self) -> Result<Vec<Employee>, StoreError> {
        self.enter()?;
        let map = self.inner.read().map_err(|_| poisoned())?;
        let mut all: Vec<Employee> = map.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(all)
    }
}

/// In-memory escalation collection for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryEscalationStore {
    inner: RwLock<HashMap<EscalationId, Escalation>>,
}

impl InMemoryEscalationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EscalationStore for InMemoryEscalationStore {
    async fn insert(&self, escalation: Escalation) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        let id = escalation.id_typed();
        if map.contains_key(&id) {
            return Err(StoreError::AlreadyExists(id.to_string()));
        }
        map.insert(id, escalation);
        Ok(())
    }

    async fn get(&self, id: &EscalationId) -> Result<Option<Escalation>, StoreError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map.get(id).cloned())
    }

    async fn save(&self, escalation: Escalation, expected: ExpectedVersion) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        let id = escalation.id_typed();
        let current = map.get(&id).map(AggregateRoot::version).unwrap_or(0);
        if !expected.matches(current) {
            return Err(StoreError::Concurrency(format!(
                "escalation {id} is at version {current}, expected {expected:?}"
            )));
        }
        map.insert(id, escalation);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Escalation>, StoreError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        let mut all: Vec<Escalation> = map.values().cloned().collect();
        // v7 ids are time-ordered.
        all.sort_by(|a, b| b.id_typed().cmp(&a.id_typed()));
        Ok(all)
    }

    async fn count_with_status(&self, status: &str) -> Result<usize, StoreError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map.values().filter(|e| e.status() == status).count())
    }
}

/// In-memory configuration document, seeded with the defaults.
#[derive(Debug, Default)]
pub struct InMemorySettingsStore {
    inner: RwLock<Settings>,
}

impl InMemorySettingsStore {
    pub fn new(settings: Settings) -> Self {
        Self {
            inner: RwLock::new(settings),
        }
    }
}

#[async_trait]
impl SettingsStore for InMemorySettingsStore {
    async fn load(&self) -> Result<Settings, StoreError> {
        Ok(self.inner.read().map_err(|_| poisoned())?.clone())
    }

    async fn save(&self, settings: Settings) -> Result<(), StoreError> {
        *self.inner.write().map_err(|_| poisoned())? = settings;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use hosteldesk_auth::{Affiliation, Role};

    fn employee(id: &str) -> Employee {
        Employee {
            id: AccountId::new(id),
            name: "Asha".to_string(),
            email: format!("{id}@hostel.test"),
            role: Role::new(Role::SUPERVISOR),
            affiliation: Some(Affiliation::Department("Water".to_string())),
            is_admin: false,
            is_oversight: false,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn lookup_goes_through_the_id_attribute() {
        let store = InMemoryEmployeeStore::new();
        store
            .insert_with_key(DocumentKey::new("legacy-doc-17"), employee("acc-1"))
            .await
            .unwrap();

        let found = store
            .find_by_account(&AccountId::new("acc-1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.key.as_str(), "legacy-doc-17");
        assert!(
            store
                .find_by_account(&AccountId::new("legacy-doc-17"))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn upsert_keeps_key_and_created_at() {
        let store = InMemoryEmployeeStore::new();
        let mut first = employee("acc-2");
        first.created_at = Utc::now() - Duration::days(3);
        let original = first.created_at;
        let stored = store.upsert(first).await.unwrap();
        assert_eq!(stored.key.as_str(), "acc-2");

        let mut again = employee("acc-2");
        again.name = "Asha R".to_string();
        let stored = store.upsert(again).await.unwrap();
        assert_eq!(stored.employee.created_at, original);
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn stale_escalation_save_is_rejected() {
        let store = InMemoryEscalationStore::new();
        let escalation = Escalation::empty(EscalationId::new());
        store.insert(escalation.clone()).await.unwrap();

        let err = store
            .save(escalation, ExpectedVersion::Exact(4))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Concurrency(_)));
    }
}
