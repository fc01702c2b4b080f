use thiserror::Error;

use hosteldesk_core::AccountId;

use crate::Principal;

/// Something a principal may attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action<'a> {
    CreateEmployee,
    ListEmployees,
    EditEmployee { target: &'a AccountId },
    DisableEmployee { target: &'a AccountId },
    DeleteEmployee { target: &'a AccountId },
    EditSettings,
    CreateEscalation,
    ViewEscalation,
    AssignTeamMember {
        supervisor_email: &'a str,
    },
    TransitionEscalation {
        supervisor_email: &'a str,
        team_member_email: Option<&'a str>,
    },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    /// Self-modification of privilege or login capability; denied even for admins.
    #[error("cannot perform this action on your own account")]
    SelfTarget,

    #[error("admin access required")]
    AdminRequired,

    #[error("only the assigned supervisor, the assigned team member or an admin may update this escalation")]
    NotAssigned,

    #[error("not allowed to view the employee directory")]
    DirectoryDenied,
}

/// Pure policy decision.
///
/// - No IO
/// - No panics
pub fn authorize(principal: &Principal, action: Action<'_>) -> Result<(), AuthzError> {
    match action {
        Action::EditEmployee { target }
        | Action::DisableEmployee { target }
        | Action::DeleteEmployee { target } => {
            if principal.is_self(target) {
                return Err(AuthzError::SelfTarget);
            }
            require_admin(principal)
        }
        Action::CreateEmployee | Action::EditSettings => require_admin(principal),
        Action::ListEmployees => {
            if principal.is_admin || principal.is_oversight || principal.is_supervisor() {
                Ok(())
            } else {
                Err(AuthzError::DirectoryDenied)
            }
        }
        Action::CreateEscalation | Action::ViewEscalation => Ok(()),
        Action::AssignTeamMember { supervisor_email } => {
            if principal.is_admin || principal.has_email(supervisor_email) {
                Ok(())
            } else {
                Err(AuthzError::NotAssigned)
            }
        }
        Action::TransitionEscalation {
            supervisor_email,
            team_member_email,
        } => {
            let is_team_member = team_member_email.is_some_and(|e| principal.has_email(e));
            if principal.is_admin || principal.has_email(supervisor_email) || is_team_member {
                Ok(())
            } else {
                Err(AuthzError::NotAssigned)
            }
        }
    }
}

pub fn can_perform(principal: &Principal, action: Action<'_>) -> bool {
    authorize(principal, action).is_ok()
}

fn require_admin(principal: &Principal) -> Result<(), AuthzError> {
    if principal.is_admin {
        Ok(())
    } else {
        Err(AuthzError::AdminRequired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;
    use proptest::prelude::*;

    fn principal(id: &str, email: &str, is_admin: bool) -> Principal {
        Principal {
            account_id: AccountId::new(id),
            email: email.to_string(),
            is_admin,
            is_oversight: false,
            role: None,
            affiliation: None,
            display_name: None,
        }
    }

    #[test]
    fn only_admins_manage_employees() {
        let admin = principal("a", "admin@hostel.test", true);
        let staff = principal("s", "staff@hostel.test", false);
        let target = AccountId::new("t");

        assert!(can_perform(&admin, Action::DeleteEmployee { target: &target }));
        assert_eq!(
            authorize(&staff, Action::DeleteEmployee { target: &target }),
            Err(AuthzError::AdminRequired)
        );
        assert_eq!(authorize(&staff, Action::EditSettings), Err(AuthzError::AdminRequired));
    }

    #[test]
    fn anyone_may_log_and_view_escalations() {
        let staff = principal("s", "staff@hostel.test", false);
        assert!(can_perform(&staff, Action::CreateEscalation));
        assert!(can_perform(&staff, Action::ViewEscalation));
    }

    #[test]
    fn transition_requires_assignment_or_admin() {
        let supervisor = principal("sup", "Supervisor.Water@Hostel.test", false);
        let member = principal("tm", "team.water1@hostel.test", false);
        let outsider = principal("x", "someone@hostel.test", false);
        let action = Action::TransitionEscalation {
            supervisor_email: "supervisor.water@hostel.test",
            team_member_email: Some("team.water1@hostel.test"),
        };

        assert!(can_perform(&supervisor, action));
        assert!(can_perform(&member, action));
        assert_eq!(authorize(&outsider, action), Err(AuthzError::NotAssigned));
    }

    #[test]
    fn team_members_cannot_reassign() {
        let member = principal("tm", "team.water1@hostel.test", false);
        let action = Action::AssignTeamMember {
            supervisor_email: "supervisor.water@hostel.test",
        };
        assert_eq!(authorize(&member, action), Err(AuthzError::NotAssigned));
    }

    #[test]
    fn supervisors_may_browse_the_directory() {
        let mut supervisor = principal("sup", "sup@hostel.test", false);
        assert!(!can_perform(&supervisor, Action::ListEmployees));
        supervisor.role = Some(Role::new(Role::SUPERVISOR));
        assert!(can_perform(&supervisor, Action::ListEmployees));
    }

    proptest! {
        #[test]
        fn self_targeting_is_always_denied(id in "[a-zA-Z0-9]{1,24}", is_admin in any::<bool>()) {
            let p = principal(&id, "someone@hostel.test", is_admin);
            let target = AccountId::new(id.clone());
            for action in [
                Action::EditEmployee { target: &target },
                Action::DisableEmployee { target: &target },
                Action::DeleteEmployee { target: &target },
            ] {
                prop_assert_eq!(authorize(&p, action), Err(AuthzError::SelfTarget));
            }
        }
    }
}
