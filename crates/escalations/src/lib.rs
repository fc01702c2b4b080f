//! Escalation tickets domain module.
//!
//! Ticket intake validation, supervisor routing and the status workflow,
//! implemented purely as deterministic domain logic (no IO, no HTTP, no
//! storage).

pub mod escalation;
pub mod intake;
pub mod routing;

pub use escalation::{
    AssignTeamMember, ChangeStatus, CreateEscalation, Escalation, EscalationCommand,
    EscalationCreated, EscalationEvent, StatusChanged, StatusTransition, TeamMemberAssigned,
    RESOLVED_STATUSES,
};
pub use intake::{NewEscalation, ValidatedEscalation, is_valid_email};
pub use routing::{RoutedSupervisor, SupervisorDirectory};
