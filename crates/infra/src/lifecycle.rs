//! Employee lifecycle: invite, edit, disable and delete staff accounts.
//!
//! Each operation is a short saga over the identity provider and the
//! employee store. Primary steps fail the call; secondary steps (claim
//! mirroring, login-account removal, reset links) are logged and reported
//! but never undo what already succeeded.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};

use hosteldesk_auth::{Action, Principal, authorize};
use hosteldesk_core::{AccountId, DomainError};
use hosteldesk_employees::{Employee, EmployeeStatusAction, EmployeeUpdate, NewEmployee};

use crate::error::ServiceError;
use crate::identity::{AccountRemoval, IdentityGateway};
use crate::retry::with_retry;
use crate::store::{EmployeeStore, SettingsStore, StoredEmployee};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeAdded {
    pub employee_id: AccountId,
    pub email: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeUpdated {
    pub message: String,
    pub updated_fields: Vec<&'static str>,
    #[serde(skip)]
    pub claims_mirrored: bool,
}

/// What happened to the login account when a record was deleted.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AccountCleanup {
    Removed,
    AlreadyAbsent,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChangeOutcome {
    pub message: String,
    /// `None` for disable.
    pub cleanup: Option<AccountCleanup>,
}

pub struct EmployeeLifecycle {
    gateway: Arc<IdentityGateway>,
    employees: Arc<dyn EmployeeStore>,
    settings: Arc<dyn SettingsStore>,
    reset_password_url: String,
}

impl EmployeeLifecycle {
    pub fn new(
        gateway: Arc<IdentityGateway>,
        employees: Arc<dyn EmployeeStore>,
        settings: Arc<dyn SettingsStore>,
        reset_password_url: impl Into<String>,
    ) -> Self {
        Self {
            gateway,
            employees,
            settings,
            reset_password_url: reset_password_url.into(),
        }
    }

    /// Invite a new employee (or re-invite an existing email).
    ///
    /// Steps: get-or-create account → set claims → merge-write record →
    /// password-reset link (best effort).
    pub async fn add_employee(&self, actor: &Principal, input: NewEmployee) -> Result<EmployeeAdded, ServiceError> {
        authorize(actor, Action::CreateEmployee)?;

        let settings = self.load_settings().await?;
        let validated = input.validate(&settings)?;

        let account_id = self
            .gateway
            .provision_account(&validated.email, &validated.name)
            .await?;
        tracing::info!(account_id = %account_id, email = %validated.email, "step 1/4: account provisioned");

        self.gateway
            .set_authorization_claims(&account_id, validated.authorization_claims())
            .await?;
        tracing::info!(account_id = %account_id, "step 2/4: claims set");

        let email = validated.email.clone();
        let name = validated.name.clone();
        let employee = Employee::from_validated(account_id.clone(), validated, Utc::now());
        let stored = self.write_record(employee).await?;
        tracing::info!(account_id = %account_id, key = %stored.key, "step 3/4: record written");

        match self
            .gateway
            .password_reset_link(&email, &self.reset_password_url)
            .await
        {
            Ok(_) => tracing::info!(account_id = %account_id, "step 4/4: password reset link issued"),
            Err(e) => tracing::warn!(account_id = %account_id, error = %e, "step 4/4: password reset link failed"),
        }

        Ok(EmployeeAdded {
            employee_id: account_id,
            email,
            message: format!(
                "{name} has been invited. A password reset email will be sent when they first attempt to log in."
            ),
        })
    }

    /// Partial update of department and/or role.
    ///
    /// Any other key rejects the whole patch before the record is read.
    pub async fn update_employee(
        &self,
        actor: &Principal,
        employee_id: &AccountId,
        updates: &Map<String, Value>,
    ) -> Result<EmployeeUpdated, ServiceError> {
        authorize(actor, Action::EditEmployee { target: employee_id })?;

        let patch = EmployeeUpdate::from_map(updates)?;
        let settings = self.load_settings().await?;
        patch.validate(&settings)?;

        let StoredEmployee { key, mut employee } = self.find_record(employee_id).await?;
        let elevated = (employee.is_admin, employee.is_oversight);
        let role_changed = patch.apply_to(&mut employee)?;
        let demoted = (elevated.0 && !employee.is_admin) || (elevated.1 && !employee.is_oversight);

        let policy = self.gateway.retry_policy();
        let record = &employee;
        with_retry(policy, "employee update", policy.write_timeout, || {
            self.employees.replace(&key, record.clone())
        })
        .await?;
        tracing::info!(account_id = %employee_id, fields = ?patch.updated_fields(), "employee updated");

        let mut claims_mirrored = false;
        if role_changed {
            match self
                .gateway
                .set_authorization_claims(employee_id, employee.authorization_claims())
                .await
            {
                Ok(()) => claims_mirrored = true,
                Err(e) => {
                    tracing::warn!(account_id = %employee_id, error = %e, "role saved but claims not mirrored")
                }
            }
        }
        // Outstanding tokens still carry the old flags.
        if claims_mirrored && demoted {
            if let Err(e) = self.gateway.revoke_tokens(employee_id).await {
                tracing::warn!(account_id = %employee_id, error = %e, "demoted but tokens not revoked");
            }
        }

        Ok(EmployeeUpdated {
            message: "Employee has been updated successfully.".to_string(),
            updated_fields: patch.updated_fields(),
            claims_mirrored,
        })
    }

    pub async fn set_employee_status(
        &self,
        actor: &Principal,
        employee_id: &AccountId,
        action: EmployeeStatusAction,
    ) -> Result<StatusChangeOutcome, ServiceError> {
        let check = match action {
            EmployeeStatusAction::Disable => Action::DisableEmployee { target: employee_id },
            EmployeeStatusAction::Delete => Action::DeleteEmployee { target: employee_id },
        };
        authorize(actor, check)?;

        let stored = self.find_record(employee_id).await?;

        match action {
            EmployeeStatusAction::Disable => {
                self.gateway.set_login_enabled(employee_id, false).await?;
                tracing::info!(account_id = %employee_id, "employee login disabled");
                Ok(StatusChangeOutcome {
                    message: "Employee has been disabled.".to_string(),
                    cleanup: None,
                })
            }
            EmployeeStatusAction::Delete => {
                let policy = self.gateway.retry_policy();
                let key = &stored.key;
                let removed = with_retry(policy, "employee removal", policy.write_timeout, || {
                    self.employees.remove(key)
                })
                .await?;
                if !removed {
                    return Err(DomainError::not_found("Employee").into());
                }
                tracing::info!(account_id = %employee_id, key = %stored.key, "employee record deleted");

                let cleanup = match self.gateway.remove_account(employee_id).await {
                    Ok(AccountRemoval::Removed) => AccountCleanup::Removed,
                    Ok(AccountRemoval::AlreadyAbsent) => {
                        tracing::info!(account_id = %employee_id, "login account was already removed");
                        AccountCleanup::AlreadyAbsent
                    }
                    Err(e) => {
                        tracing::warn!(account_id = %employee_id, error = %e, "login account removal failed");
                        AccountCleanup::Failed
                    }
                };

                let message = match cleanup {
                    AccountCleanup::Removed => "Employee has been deleted along with their login account.",
                    AccountCleanup::AlreadyAbsent => {
                        "Employee record has been deleted. The login account was already removed."
                    }
                    AccountCleanup::Failed => {
                        "Employee record has been deleted. The login account could not be removed and needs manual cleanup."
                    }
                };
                Ok(StatusChangeOutcome {
                    message: message.to_string(),
                    cleanup: Some(cleanup),
                })
            }
        }
    }

    /// Directory listing, ordered by name.
    pub async fn list_employees(&self, actor: &Principal) -> Result<Vec<Employee>, ServiceError> {
        authorize(actor, Action::ListEmployees)?;
        let policy = self.gateway.retry_policy();
        let mut employees = with_retry(policy, "employee listing", policy.lookup_timeout, || {
            self.employees.list()
        })
        .await?;
        employees.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(employees)
    }

    async fn load_settings(&self) -> Result<hosteldesk_core::Settings, ServiceError> {
        let policy = self.gateway.retry_policy();
        with_retry(policy, "settings lookup", policy.lookup_timeout, || self.settings.load()).await
    }

    async fn find_record(&self, employee_id: &AccountId) -> Result<StoredEmployee, ServiceError> {
        let policy = self.gateway.retry_policy();
        with_retry(policy, "employee lookup", policy.lookup_timeout, || {
            self.employees.find_by_account(employee_id)
        })
        .await?
        .ok_or_else(|| {
            tracing::info!(account_id = %employee_id, "no employee record for account");
            DomainError::not_found("Employee").into()
        })
    }

    async fn write_record(&self, employee: Employee) -> Result<StoredEmployee, ServiceError> {
        let policy = self.gateway.retry_policy();
        let record = &employee;
        with_retry(policy, "employee write", policy.write_timeout, || {
            self.employees.upsert(record.clone())
        })
        .await
    }
}
