use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use hosteldesk_core::{Aggregate, AggregateRoot, DomainError, Event, EscalationId};

use crate::{RoutedSupervisor, ValidatedEscalation};

/// Statuses that mark a ticket as resolved.
pub const RESOLVED_STATUSES: &[&str] = &["Resolved", "Closed"];

fn is_resolved(status: &str) -> bool {
    RESOLVED_STATUSES.contains(&status)
}

/// One entry in a ticket's append-only status history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusTransition {
    pub from: String,
    pub to: String,
    pub actor: String,
    pub at: DateTime<Utc>,
}

/// Aggregate root: Escalation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Escalation {
    id: EscalationId,
    student_name: String,
    student_email: String,
    hostel_name: String,
    room_number: String,
    description: String,
    department: String,
    status: String,
    created_at: Option<DateTime<Utc>>,
    resolved_at: Option<DateTime<Utc>>,
    assigned_to: String,
    supervisor_email: String,
    assigned_team_member_email: Option<String>,
    involved_users: Vec<String>,
    created_by: String,
    history: Vec<StatusTransition>,
    version: u64,
}

impl Escalation {
    /// Create an empty, not-yet-created aggregate instance.
    pub fn empty(id: EscalationId) -> Self {
        Self {
            id,
            student_name: String::new(),
            student_email: String::new(),
            hostel_name: String::new(),
            room_number: String::new(),
            description: String::new(),
            department: String::new(),
            status: String::new(),
            created_at: None,
            resolved_at: None,
            assigned_to: String::new(),
            supervisor_email: String::new(),
            assigned_team_member_email: None,
            involved_users: Vec::new(),
            created_by: String::new(),
            history: Vec::new(),
            version: 0,
        }
    }

    pub fn id_typed(&self) -> EscalationId {
        self.id
    }

    pub fn is_created(&self) -> bool {
        self.created_at.is_some()
    }

    pub fn student_name(&self) -> &str {
        &self.student_name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn department(&self) -> &str {
        &self.department
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn resolved_at(&self) -> Option<DateTime<Utc>> {
        self.resolved_at
    }

    pub fn assigned_to(&self) -> &str {
        &self.assigned_to
    }

    pub fn supervisor_email(&self) -> &str {
        &self.supervisor_email
    }

    pub fn assigned_team_member_email(&self) -> Option<&str> {
        self.assigned_team_member_email.as_deref()
    }

    pub fn involved_users(&self) -> &[String] {
        &self.involved_users
    }

    pub fn history(&self) -> &[StatusTransition] {
        &self.history
    }

    pub fn involves(&self, email: &str) -> bool {
        self.involved_users.iter().any(|u| u.eq_ignore_ascii_case(email))
    }

    fn involve(&mut self, email: &str) {
        let email = email.trim().to_lowercase();
        if !email.is_empty() && !self.involves(&email) {
            self.involved_users.push(email);
        }
    }
}

impl AggregateRoot for Escalation {
    type Id = EscalationId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateEscalation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateEscalation {
    pub escalation_id: EscalationId,
    pub ticket: ValidatedEscalation,
    pub supervisor: RoutedSupervisor,
    pub initial_status: String,
    pub created_by: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AssignTeamMember.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignTeamMember {
    pub escalation_id: EscalationId,
    pub team_member_email: String,
    pub assigned_by: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ChangeStatus.
///
/// Carries the currently configured statuses; legality is a runtime
/// membership check rather than a closed enum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeStatus {
    pub escalation_id: EscalationId,
    pub to: String,
    pub configured_statuses: Vec<String>,
    pub actor: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EscalationCommand {
    Create(CreateEscalation),
    AssignTeamMember(AssignTeamMember),
    ChangeStatus(ChangeStatus),
}

/// Event: EscalationCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationCreated {
    pub escalation_id: EscalationId,
    pub student_name: String,
    pub student_email: String,
    pub hostel_name: String,
    pub room_number: String,
    pub description: String,
    pub department: String,
    pub status: String,
    pub assigned_to: String,
    pub supervisor_email: String,
    pub team_member_email: Option<String>,
    pub created_by: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: TeamMemberAssigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMemberAssigned {
    pub escalation_id: EscalationId,
    pub team_member_email: String,
    pub assigned_by: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StatusChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChanged {
    pub escalation_id: EscalationId,
    pub from: String,
    pub to: String,
    pub actor: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EscalationEvent {
    Created(EscalationCreated),
    TeamMemberAssigned(TeamMemberAssigned),
    StatusChanged(StatusChanged),
}

impl Event for EscalationEvent {
    fn event_type(&self) -> &'static str {
        match self {
            EscalationEvent::Created(_) => "escalation.created",
            EscalationEvent::TeamMemberAssigned(_) => "escalation.team_member_assigned",
            EscalationEvent::StatusChanged(_) => "escalation.status_changed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            EscalationEvent::Created(e) => e.occurred_at,
            EscalationEvent::TeamMemberAssigned(e) => e.occurred_at,
            EscalationEvent::StatusChanged(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Escalation {
    type Command = EscalationCommand;
    type Event = EscalationEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            EscalationEvent::Created(e) => {
                self.id = e.escalation_id;
                self.student_name = e.student_name.clone();
                self.student_email = e.student_email.clone();
                self.hostel_name = e.hostel_name.clone();
                self.room_number = e.room_number.clone();
                self.description = e.description.clone();
                self.department = e.department.clone();
                self.status = e.status.clone();
                self.created_at = Some(e.occurred_at);
                self.resolved_at = None;
                self.assigned_to = e.assigned_to.clone();
                self.supervisor_email = e.supervisor_email.clone();
                self.assigned_team_member_email = e.team_member_email.clone();
                self.created_by = e.created_by.clone();
                self.history.clear();
                self.involved_users.clear();
                self.involve(&e.created_by);
                self.involve(&e.supervisor_email);
                if let Some(member) = &e.team_member_email {
                    self.involve(member);
                }
            }
            EscalationEvent::TeamMemberAssigned(e) => {
                self.assigned_team_member_email = Some(e.team_member_email.clone());
                self.involve(&e.team_member_email);
            }
            EscalationEvent::StatusChanged(e) => {
                self.history.push(StatusTransition {
                    from: e.from.clone(),
                    to: e.to.clone(),
                    actor: e.actor.clone(),
                    at: e.occurred_at,
                });
                if is_resolved(&e.to) {
                    if self.resolved_at.is_none() {
                        self.resolved_at = Some(e.occurred_at);
                    }
                } else {
                    self.resolved_at = None;
                }
                self.status = e.to.clone();
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            EscalationCommand::Create(cmd) => self.handle_create(cmd),
            EscalationCommand::AssignTeamMember(cmd) => self.handle_assign(cmd),
            EscalationCommand::ChangeStatus(cmd) => self.handle_change_status(cmd),
        }
    }
}

impl Escalation {
    fn ensure_created(&self, escalation_id: EscalationId) -> Result<(), DomainError> {
        if !self.is_created() {
            return Err(DomainError::not_found(format!("escalation {escalation_id}")));
        }
        if self.id != escalation_id {
            return Err(DomainError::invariant("escalation_id mismatch"));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateEscalation) -> Result<Vec<EscalationEvent>, DomainError> {
        if self.is_created() {
            return Err(DomainError::conflict("escalation already exists"));
        }
        if cmd.initial_status.trim().is_empty() {
            return Err(DomainError::invariant("no initial status configured"));
        }

        let ticket = &cmd.ticket;
        Ok(vec![EscalationEvent::Created(EscalationCreated {
            escalation_id: cmd.escalation_id,
            student_name: ticket.student_name.clone(),
            student_email: ticket.student_email.clone(),
            hostel_name: ticket.hostel_name.clone(),
            room_number: ticket.room_number.clone(),
            description: ticket.description.clone(),
            department: ticket.department.clone(),
            status: cmd.initial_status.clone(),
            assigned_to: cmd.supervisor.name.clone(),
            supervisor_email: cmd.supervisor.email.clone(),
            team_member_email: ticket.team_member_email.clone(),
            created_by: cmd.created_by.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_assign(&self, cmd: &AssignTeamMember) -> Result<Vec<EscalationEvent>, DomainError> {
        self.ensure_created(cmd.escalation_id)?;

        let email = cmd.team_member_email.trim().to_lowercase();
        if email.is_empty() {
            return Err(DomainError::validation("teamMemberEmail is required"));
        }
        if self.assigned_team_member_email.as_deref() == Some(email.as_str()) {
            return Err(DomainError::conflict(format!(
                "{email} is already assigned to this escalation"
            )));
        }

        Ok(vec![EscalationEvent::TeamMemberAssigned(TeamMemberAssigned {
            escalation_id: cmd.escalation_id,
            team_member_email: email,
            assigned_by: cmd.assigned_by.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_change_status(&self, cmd: &ChangeStatus) -> Result<Vec<EscalationEvent>, DomainError> {
        self.ensure_created(cmd.escalation_id)?;

        let to = cmd.to.trim();
        if !cmd.configured_statuses.iter().any(|s| s == to) {
            return Err(DomainError::validation(format!(
                "'{to}' is not a configured status"
            )));
        }
        if to == self.status {
            return Err(DomainError::validation(format!(
                "escalation is already '{to}'"
            )));
        }

        Ok(vec![EscalationEvent::StatusChanged(StatusChanged {
            escalation_id: cmd.escalation_id,
            from: self.status.clone(),
            to: to.to_string(),
            actor: cmd.actor.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use hosteldesk_core::settings::DEFAULT_STATUSES;

    fn statuses() -> Vec<String> {
        DEFAULT_STATUSES.iter().map(|s| s.to_string()).collect()
    }

    fn created(team_member: Option<&str>) -> Escalation {
        let id = EscalationId::new();
        let mut escalation = Escalation::empty(id);
        let cmd = CreateEscalation {
            escalation_id: id,
            ticket: ValidatedEscalation {
                student_name: "Priya".to_string(),
                student_email: "priya@student.test".to_string(),
                hostel_name: "Hostel A".to_string(),
                room_number: "B-204".to_string(),
                description: "Tap in the washroom is leaking".to_string(),
                department: "Water".to_string(),
                team_member_email: team_member.map(str::to_string),
            },
            supervisor: RoutedSupervisor {
                name: "Ravi".to_string(),
                email: "ravi@hostel.test".to_string(),
            },
            initial_status: "New".to_string(),
            created_by: "Office@Hostel.test".to_string(),
            occurred_at: Utc::now(),
        };
        let events = escalation.handle(&EscalationCommand::Create(cmd)).unwrap();
        for e in &events {
            escalation.apply(e);
        }
        escalation
    }

    fn change(escalation: &mut Escalation, to: &str, at: DateTime<Utc>) -> Result<(), DomainError> {
        let cmd = ChangeStatus {
            escalation_id: escalation.id_typed(),
            to: to.to_string(),
            configured_statuses: statuses(),
            actor: "ravi@hostel.test".to_string(),
            occurred_at: at,
        };
        let events = escalation.handle(&EscalationCommand::ChangeStatus(cmd))?;
        for e in &events {
            escalation.apply(e);
        }
        Ok(())
    }

    #[test]
    fn create_routes_and_involves_participants() {
        let escalation = created(Some("tm@hostel.test"));
        assert_eq!(escalation.status(), "New");
        assert_eq!(escalation.assigned_to(), "Ravi");
        assert_eq!(
            escalation.involved_users(),
            ["office@hostel.test", "ravi@hostel.test", "tm@hostel.test"]
        );
        assert_eq!(escalation.version(), 1);
    }

    #[test]
    fn create_twice_is_a_conflict() {
        let escalation = created(None);
        let cmd = CreateEscalation {
            escalation_id: escalation.id_typed(),
            ticket: ValidatedEscalation {
                student_name: "X".repeat(3),
                student_email: "x@y.z".to_string(),
                hostel_name: "Hostel A".to_string(),
                room_number: "1".to_string(),
                description: "0123456789".to_string(),
                department: "Water".to_string(),
                team_member_email: None,
            },
            supervisor: RoutedSupervisor {
                name: "R".to_string(),
                email: "r@h.t".to_string(),
            },
            initial_status: "New".to_string(),
            created_by: "a@b.c".to_string(),
            occurred_at: Utc::now(),
        };
        assert!(matches!(
            escalation.handle(&EscalationCommand::Create(cmd)),
            Err(DomainError::Conflict(_))
        ));
    }

    #[test]
    fn each_transition_appends_one_history_entry() {
        let mut escalation = created(None);
        let t0 = Utc::now();
        change(&mut escalation, "In Progress", t0).unwrap();
        change(&mut escalation, "Resolved", t0 + Duration::minutes(5)).unwrap();

        assert_eq!(escalation.history().len(), 2);
        assert_eq!(escalation.history()[1].from, "In Progress");
        assert_eq!(escalation.history()[1].to, "Resolved");
        assert_eq!(escalation.resolved_at(), Some(t0 + Duration::minutes(5)));
    }

    #[test]
    fn resolved_at_survives_close_and_clears_on_reopen() {
        let mut escalation = created(None);
        let t0 = Utc::now();
        change(&mut escalation, "Resolved", t0).unwrap();
        change(&mut escalation, "Closed", t0 + Duration::hours(1)).unwrap();
        assert_eq!(escalation.resolved_at(), Some(t0));

        change(&mut escalation, "In Progress", t0 + Duration::hours(2)).unwrap();
        assert_eq!(escalation.resolved_at(), None);
    }

    #[test]
    fn unknown_or_same_status_is_rejected_without_history() {
        let mut escalation = created(None);
        assert!(matches!(
            change(&mut escalation, "Escalated", Utc::now()),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            change(&mut escalation, "New", Utc::now()),
            Err(DomainError::Validation(_))
        ));
        assert!(escalation.history().is_empty());
    }

    #[test]
    fn commands_on_missing_ticket_are_not_found() {
        let id = EscalationId::new();
        let escalation = Escalation::empty(id);
        let cmd = AssignTeamMember {
            escalation_id: id,
            team_member_email: "tm@hostel.test".to_string(),
            assigned_by: "ravi@hostel.test".to_string(),
            occurred_at: Utc::now(),
        };
        assert!(matches!(
            escalation.handle(&EscalationCommand::AssignTeamMember(cmd)),
            Err(DomainError::NotFound(_))
        ));
    }

    #[test]
    fn assignment_involves_member_once() {
        let mut escalation = created(None);
        let cmd = AssignTeamMember {
            escalation_id: escalation.id_typed(),
            team_member_email: "TM@hostel.test".to_string(),
            assigned_by: "ravi@hostel.test".to_string(),
            occurred_at: Utc::now(),
        };
        let events = escalation
            .handle(&EscalationCommand::AssignTeamMember(cmd.clone()))
            .unwrap();
        escalation.apply(&events[0]);
        assert_eq!(escalation.assigned_team_member_email(), Some("tm@hostel.test"));
        assert_eq!(escalation.involved_users().len(), 3);
        assert!(
            escalation
                .handle(&EscalationCommand::AssignTeamMember(cmd))
                .is_err()
        );
    }
}
