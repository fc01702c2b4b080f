//! Escalation workflow: intake, routing, assignment and status transitions,
//! plus the admin-editable configuration set they depend on.
//!
//! Mutations follow load → authorize → handle → apply → save with an exact
//! version expectation. Notifications go out on a detached task after the
//! write has committed.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use hosteldesk_auth::{Action, Principal, authorize};
use hosteldesk_core::{
    Aggregate, AggregateRoot, DomainError, EscalationId, ExpectedVersion, SettingKind, Settings,
};
use hosteldesk_employees::Employee;
use hosteldesk_escalations::{
    AssignTeamMember, ChangeStatus, CreateEscalation, Escalation, EscalationCommand, NewEscalation,
    SupervisorDirectory,
};

use crate::error::ServiceError;
use crate::mail::OutboundEmail;
use crate::notify::{
    DispatchReport, NotificationDispatcher, StatusUpdateNotice, new_escalation_email,
    status_update_email, team_member_assignment_email,
};
use crate::retry::{RetryPolicy, with_retry};
use crate::store::{EmployeeStore, EscalationStore, SettingsStore};

/// A committed mutation and the handle of its detached notifications.
#[derive(Debug)]
pub struct WorkflowOutcome {
    pub escalation: Escalation,
    pub notifications: JoinHandle<DispatchReport>,
}

pub struct EscalationWorkflow {
    employees: Arc<dyn EmployeeStore>,
    escalations: Arc<dyn EscalationStore>,
    settings: Arc<dyn SettingsStore>,
    notifier: NotificationDispatcher,
    retry: RetryPolicy,
    /// Serializes configuration edits with the ticket writes that read it.
    settings_guard: Mutex<()>,
}

impl EscalationWorkflow {
    pub fn new(
        employees: Arc<dyn EmployeeStore>,
        escalations: Arc<dyn EscalationStore>,
        settings: Arc<dyn SettingsStore>,
        notifier: NotificationDispatcher,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            employees,
            escalations,
            settings,
            notifier,
            retry,
            settings_guard: Mutex::new(()),
        }
    }

    /// File a ticket and route it to its department's supervisor.
    ///
    /// Nothing is persisted when the department has no supervisor.
    pub async fn create_escalation(
        &self,
        actor: &Principal,
        input: NewEscalation,
    ) -> Result<WorkflowOutcome, ServiceError> {
        authorize(actor, Action::CreateEscalation)?;

        // Held until the insert so the initial status cannot be renamed away meanwhile.
        let _guard = self.settings_guard.lock().await;
        let settings = self.settings().await?;
        let ticket = input.validate(&settings)?;

        let staff = self.staff().await?;
        let directory = SupervisorDirectory::from_employees(&staff);
        let supervisor = directory.route(&ticket.department)?.clone();
        if let Some(email) = ticket.team_member_email.as_deref() {
            let member = staff.iter().find(|e| e.email.eq_ignore_ascii_case(email));
            ensure_assignable(member, email, &ticket.department)?;
        }
        let initial_status = settings
            .initial_status()
            .ok_or_else(|| DomainError::invariant("no statuses are configured"))?
            .to_string();

        let id = EscalationId::new();
        let mut escalation = Escalation::empty(id);
        escalation.execute(
            &EscalationCommand::Create(CreateEscalation {
                escalation_id: id,
                ticket,
                supervisor,
                initial_status,
                created_by: actor.email.clone(),
                occurred_at: Utc::now(),
            }),
        )?;

        let record = &escalation;
        with_retry(&self.retry, "escalation write", self.retry.write_timeout, || {
            self.escalations.insert(record.clone())
        })
        .await?;
        tracing::info!(
            escalation_id = %id,
            department = %escalation.department(),
            supervisor = %escalation.supervisor_email(),
            "escalation created"
        );

        let mut messages = vec![new_escalation_email(&escalation)];
        if let Some(member) = escalation.assigned_team_member_email() {
            messages.push(team_member_assignment_email(
                &escalation,
                member,
                actor.actor_label(),
            ));
        }
        let notifications = self.notifier.dispatch_detached(messages);

        Ok(WorkflowOutcome {
            escalation,
            notifications,
        })
    }

    /// Hand the ticket to a front-line team member of its department.
    pub async fn assign_team_member(
        &self,
        actor: &Principal,
        id: &EscalationId,
        team_member_email: &str,
    ) -> Result<WorkflowOutcome, ServiceError> {
        let mut escalation = self.load(id).await?;
        authorize(
            actor,
            Action::AssignTeamMember {
                supervisor_email: escalation.supervisor_email(),
            },
        )?;

        let email = team_member_email.trim().to_lowercase();
        let policy = &self.retry;
        let member = with_retry(policy, "employee lookup", policy.lookup_timeout, || {
            self.employees.find_by_email(&email)
        })
        .await?
        .map(|stored| stored.employee);
        ensure_assignable(member.as_ref(), &email, escalation.department())?;

        let expected = ExpectedVersion::Exact(escalation.version());
        escalation.execute(
            &EscalationCommand::AssignTeamMember(AssignTeamMember {
                escalation_id: *id,
                team_member_email: email.clone(),
                assigned_by: actor.email.clone(),
                occurred_at: Utc::now(),
            }),
        )?;
        self.save(&escalation, expected).await?;
        tracing::info!(escalation_id = %id, team_member = %email, "team member assigned");

        let notifications = self.notifier.dispatch_detached(vec![team_member_assignment_email(
            &escalation,
            &email,
            actor.actor_label(),
        )]);
        Ok(WorkflowOutcome {
            escalation,
            notifications,
        })
    }

    /// Move a ticket to another configured status and notify oversight staff.
    pub async fn update_status(
        &self,
        actor: &Principal,
        id: &EscalationId,
        new_status: &str,
    ) -> Result<WorkflowOutcome, ServiceError> {
        let mut escalation = self.load(id).await?;
        authorize(
            actor,
            Action::TransitionEscalation {
                supervisor_email: escalation.supervisor_email(),
                team_member_email: escalation.assigned_team_member_email(),
            },
        )?;

        // Status edits check for referencing tickets under the same guard.
        let guard = self.settings_guard.lock().await;
        let settings = self.settings().await?;
        let old_status = escalation.status().to_string();
        let expected = ExpectedVersion::Exact(escalation.version());
        escalation.execute(
            &EscalationCommand::ChangeStatus(ChangeStatus {
                escalation_id: *id,
                to: new_status.to_string(),
                configured_statuses: settings.statuses.clone(),
                actor: actor.email.clone(),
                occurred_at: Utc::now(),
            }),
        )?;
        self.save(&escalation, expected).await?;
        drop(guard);
        tracing::info!(
            escalation_id = %id,
            from = %old_status,
            to = %escalation.status(),
            "escalation status changed"
        );

        let notice = StatusUpdateNotice {
            escalation_id: id.to_string(),
            student_name: escalation.student_name().to_string(),
            department: escalation.department().to_string(),
            old_status,
            new_status: escalation.status().to_string(),
            updated_by: actor.actor_label().to_string(),
        };
        let notifications = self.notify_oversight_detached(notice);

        Ok(WorkflowOutcome {
            escalation,
            notifications,
        })
    }

    pub async fn get_escalation(&self, actor: &Principal, id: &EscalationId) -> Result<Escalation, ServiceError> {
        authorize(actor, Action::ViewEscalation)?;
        self.load(id).await
    }

    /// Newest first.
    pub async fn list_escalations(&self, actor: &Principal) -> Result<Vec<Escalation>, ServiceError> {
        authorize(actor, Action::ViewEscalation)?;
        with_retry(&self.retry, "escalation listing", self.retry.lookup_timeout, || {
            self.escalations.list()
        })
        .await
    }

    /// Broadcast a status change to every oversight recipient and wait for
    /// the outcome.
    pub async fn notify_oversight(&self, notice: &StatusUpdateNotice) -> Result<DispatchReport, ServiceError> {
        let required = [
            &notice.escalation_id,
            &notice.student_name,
            &notice.department,
            &notice.old_status,
            &notice.new_status,
            &notice.updated_by,
        ];
        if required.iter().any(|v| v.trim().is_empty()) {
            return Err(DomainError::validation("Missing required fields").into());
        }

        let messages = oversight_messages(self.employees.as_ref(), &self.retry, notice).await?;
        let report = self.notifier.fan_out(messages).await;
        tracing::info!(
            escalation_id = %notice.escalation_id,
            sent = report.total_sent,
            failed = report.total_failed,
            "oversight notifications sent"
        );
        Ok(report)
    }

    // ----- configuration set -----

    pub async fn settings(&self) -> Result<Settings, ServiceError> {
        with_retry(&self.retry, "settings lookup", self.retry.lookup_timeout, || {
            self.settings.load()
        })
        .await
    }

    pub async fn add_setting(
        &self,
        actor: &Principal,
        kind: SettingKind,
        value: &str,
    ) -> Result<Settings, ServiceError> {
        authorize(actor, Action::EditSettings)?;
        let _guard = self.settings_guard.lock().await;

        let mut settings = self.settings().await?;
        let added = settings.add(kind, value)?;
        self.store_settings(&settings).await?;
        tracing::info!(kind = %kind, value = %added, "setting added");
        Ok(settings)
    }

    pub async fn rename_setting(
        &self,
        actor: &Principal,
        kind: SettingKind,
        old: &str,
        new: &str,
    ) -> Result<Settings, ServiceError> {
        authorize(actor, Action::EditSettings)?;
        let _guard = self.settings_guard.lock().await;

        let mut settings = self.settings().await?;
        if kind == SettingKind::Statuses && old != new.trim() {
            self.ensure_status_unreferenced(old).await?;
        }
        let renamed = settings.rename(kind, old, new)?;
        self.store_settings(&settings).await?;
        tracing::info!(kind = %kind, from = %old, to = %renamed, "setting renamed");
        Ok(settings)
    }

    pub async fn remove_setting(
        &self,
        actor: &Principal,
        kind: SettingKind,
        value: &str,
    ) -> Result<Settings, ServiceError> {
        authorize(actor, Action::EditSettings)?;
        let _guard = self.settings_guard.lock().await;

        let mut settings = self.settings().await?;
        if kind == SettingKind::Statuses && settings.contains(kind, value) {
            self.ensure_status_unreferenced(value).await?;
        }
        settings.remove(kind, value)?;
        self.store_settings(&settings).await?;
        tracing::info!(kind = %kind, value = %value, "setting removed");
        Ok(settings)
    }

    // ----- helpers -----

    async fn load(&self, id: &EscalationId) -> Result<Escalation, ServiceError> {
        with_retry(&self.retry, "escalation lookup", self.retry.lookup_timeout, || {
            self.escalations.get(id)
        })
        .await?
        .ok_or_else(|| DomainError::not_found(format!("escalation {id}")).into())
    }

    async fn save(&self, escalation: &Escalation, expected: ExpectedVersion) -> Result<(), ServiceError> {
        with_retry(&self.retry, "escalation write", self.retry.write_timeout, || {
            self.escalations.save(escalation.clone(), expected)
        })
        .await
    }

    async fn staff(&self) -> Result<Vec<Employee>, ServiceError> {
        with_retry(&self.retry, "employee listing", self.retry.lookup_timeout, || {
            self.employees.list()
        })
        .await
    }

    async fn store_settings(&self, settings: &Settings) -> Result<(), ServiceError> {
        with_retry(&self.retry, "settings write", self.retry.write_timeout, || {
            self.settings.save(settings.clone())
        })
        .await
    }

    async fn ensure_status_unreferenced(&self, status: &str) -> Result<(), ServiceError> {
        let in_use = with_retry(&self.retry, "escalation count", self.retry.lookup_timeout, || {
            self.escalations.count_with_status(status)
        })
        .await?;
        if in_use > 0 {
            return Err(DomainError::conflict(format!(
                "status '{status}' is used by {in_use} escalation(s)"
            ))
            .into());
        }
        Ok(())
    }

    /// Recipient lookup runs on the background task too: the status change
    /// has already committed, so a failed lookup only yields an empty report.
    fn notify_oversight_detached(&self, notice: StatusUpdateNotice) -> JoinHandle<DispatchReport> {
        let employees = self.employees.clone();
        let retry = self.retry.clone();
        let notifier = self.notifier.clone();
        tokio::spawn(async move {
            let messages = match oversight_messages(employees.as_ref(), &retry, &notice).await {
                Ok(messages) => messages,
                Err(e) => {
                    tracing::warn!(
                        escalation_id = %notice.escalation_id,
                        error = %e,
                        "oversight recipient lookup failed; status update not broadcast"
                    );
                    Vec::new()
                }
            };
            let report = notifier.fan_out(messages).await;
            tracing::info!(
                escalation_id = %notice.escalation_id,
                sent = report.total_sent,
                failed = report.total_failed,
                "oversight notifications sent"
            );
            report
        })
    }
}

/// One status-update message per active oversight employee.
async fn oversight_messages(
    employees: &dyn EmployeeStore,
    retry: &RetryPolicy,
    notice: &StatusUpdateNotice,
) -> Result<Vec<OutboundEmail>, ServiceError> {
    let mut recipients: Vec<String> = with_retry(retry, "employee listing", retry.lookup_timeout, || {
        employees.list()
    })
    .await?
    .into_iter()
    .filter(|e| e.is_active && (e.is_oversight || e.role.implies_oversight()))
    .map(|e| e.email.to_lowercase())
    .collect();
    recipients.sort();
    recipients.dedup();

    if recipients.is_empty() {
        tracing::info!(escalation_id = %notice.escalation_id, "no oversight recipients configured");
    }
    Ok(recipients
        .iter()
        .map(|to| status_update_email(notice, to))
        .collect())
}

/// Only an active "Team Member" of the ticket's department can hold it.
fn ensure_assignable(member: Option<&Employee>, email: &str, department: &str) -> Result<(), DomainError> {
    let eligible = member.is_some_and(|m| m.is_active && m.role.is_team_member() && m.in_department(department));
    if eligible {
        Ok(())
    } else {
        Err(DomainError::validation(format!(
            "{email} is not an active team member of the {department} department"
        )))
    }
}
