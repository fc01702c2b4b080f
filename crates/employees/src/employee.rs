use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use hosteldesk_auth::{Affiliation, AuthorizationClaims, RecordAuthorization, Role};
use hosteldesk_core::{AccountId, DomainError, DomainResult, SettingKind, Settings};

/// Persisted staff record.
///
/// `id` is the identity-provider account id. The record lives under a
/// separate document key in the store; name and email never change after
/// creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: AccountId,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub affiliation: Option<Affiliation>,
    pub is_admin: bool,
    pub is_oversight: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Employee {
    pub fn from_validated(
        id: AccountId,
        input: ValidatedEmployee,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name: input.name,
            email: input.email,
            role: input.role,
            affiliation: input.affiliation,
            is_admin: input.is_admin,
            is_oversight: input.is_oversight,
            is_active: true,
            created_at,
        }
    }

    pub fn department(&self) -> Option<&str> {
        self.affiliation.as_ref().and_then(Affiliation::department)
    }

    pub fn in_department(&self, department: &str) -> bool {
        self.department() == Some(department)
    }

    /// Claims mirrored onto the identity account.
    pub fn authorization_claims(&self) -> AuthorizationClaims {
        AuthorizationClaims {
            role: Some(self.role.as_str().to_string()),
            is_admin: self.is_admin,
            is_oversight: self.is_oversight,
        }
    }
}

impl From<&Employee> for RecordAuthorization {
    fn from(employee: &Employee) -> Self {
        RecordAuthorization {
            name: employee.name.clone(),
            role: employee.role.clone(),
            affiliation: employee.affiliation.clone(),
            is_admin: employee.is_admin,
            is_oversight: employee.is_oversight,
            is_active: employee.is_active,
        }
    }
}

/// Raw input for adding an employee.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEmployee {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub hostel: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default, alias = "isCRM", alias = "isHostelOffice")]
    pub is_oversight: bool,
}

/// Input that passed validation against the configuration set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedEmployee {
    pub name: String,
    /// Lower-cased.
    pub email: String,
    pub role: Role,
    pub affiliation: Option<Affiliation>,
    pub is_admin: bool,
    pub is_oversight: bool,
}

impl ValidatedEmployee {
    pub fn authorization_claims(&self) -> AuthorizationClaims {
        AuthorizationClaims {
            role: Some(self.role.as_str().to_string()),
            is_admin: self.is_admin,
            is_oversight: self.is_oversight,
        }
    }
}

impl NewEmployee {
    pub fn validate(&self, settings: &Settings) -> DomainResult<ValidatedEmployee> {
        let name = self.full_name.trim();
        let email = self.email.trim().to_lowercase();
        if name.is_empty() || email.is_empty() {
            return Err(DomainError::validation("Full name and email are required"));
        }
        if !email.contains('@') {
            return Err(DomainError::validation(format!(
                "'{email}' is not a valid email address"
            )));
        }

        let role = non_blank(&self.role);
        let department = non_blank(&self.department);
        let hostel = non_blank(&self.hostel);
        let privileged = self.is_admin || self.is_oversight;

        if let Some(role) = role {
            settings.require(SettingKind::Roles, role)?;
        }
        let role = match role {
            Some(role) => Role::new(role.to_string()),
            None if self.is_admin => Role::new(Role::ADMIN),
            None if self.is_oversight => Role::new(Role::HOSTEL_OFFICE),
            None => {
                return Err(DomainError::validation(
                    "Role and department are required for regular employees",
                ));
            }
        };

        let affiliation = match (department, hostel) {
            (Some(_), Some(_)) => {
                return Err(DomainError::validation(
                    "an employee belongs to a department or a hostel, not both",
                ));
            }
            (Some(department), None) => {
                if role.is_hostel_scoped() {
                    return Err(DomainError::validation(
                        "Hostel Office staff are assigned to a hostel, not a department",
                    ));
                }
                settings.require(SettingKind::Departments, department)?;
                Some(Affiliation::Department(department.to_string()))
            }
            (None, Some(hostel)) => {
                if !role.is_hostel_scoped() {
                    return Err(DomainError::validation(format!(
                        "role '{role}' is assigned to a department, not a hostel"
                    )));
                }
                settings.require(SettingKind::Hostels, hostel)?;
                Some(Affiliation::Hostel(hostel.to_string()))
            }
            (None, None) if privileged => None,
            (None, None) if role.is_hostel_scoped() => {
                return Err(DomainError::validation(
                    "Role and hostel are required for Hostel Office staff",
                ));
            }
            (None, None) => {
                return Err(DomainError::validation(
                    "Role and department are required for regular employees",
                ));
            }
        };

        Ok(ValidatedEmployee {
            name: name.to_string(),
            email,
            is_admin: self.is_admin || role.implies_admin(),
            is_oversight: self.is_oversight || role.implies_oversight(),
            role,
            affiliation,
        })
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// What `manage-status` does to an account.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmployeeStatusAction {
    /// Block sign-in; the record stays.
    Disable,
    /// Remove the record, then the identity account.
    Delete,
}

impl FromStr for EmployeeStatusAction {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "disable" => Ok(EmployeeStatusAction::Disable),
            "delete" => Ok(EmployeeStatusAction::Delete),
            _ => Err(DomainError::validation(
                "Invalid action. Must be 'disable' or 'delete'",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> NewEmployee {
        NewEmployee {
            full_name: "Ravi Kumar".to_string(),
            email: "Ravi.Kumar@Hostel.test".to_string(),
            role: Some("Supervisor".to_string()),
            department: Some("Water".to_string()),
            ..NewEmployee::default()
        }
    }

    #[test]
    fn regular_employee_needs_role_and_department() {
        let settings = Settings::default();
        let validated = input().validate(&settings).unwrap();
        assert_eq!(validated.email, "ravi.kumar@hostel.test");
        assert_eq!(
            validated.affiliation,
            Some(Affiliation::Department("Water".to_string()))
        );

        let missing = NewEmployee {
            department: None,
            ..input()
        };
        assert!(matches!(
            missing.validate(&settings),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn admin_may_omit_role_and_department() {
        let admin = NewEmployee {
            full_name: "Head Admin".to_string(),
            email: "head@hostel.test".to_string(),
            is_admin: true,
            ..NewEmployee::default()
        };
        let validated = admin.validate(&Settings::default()).unwrap();
        assert_eq!(validated.role.as_str(), Role::ADMIN);
        assert!(validated.affiliation.is_none());
    }

    #[test]
    fn unconfigured_values_are_rejected() {
        let settings = Settings::default();
        let bad_department = NewEmployee {
            department: Some("Laundry".to_string()),
            ..input()
        };
        assert!(bad_department.validate(&settings).is_err());

        let bad_role = NewEmployee {
            role: Some("Janitor".to_string()),
            ..input()
        };
        assert!(bad_role.validate(&settings).is_err());
    }

    #[test]
    fn hostel_office_is_hostel_scoped_and_oversees() {
        let office = NewEmployee {
            role: Some("Hostel Office".to_string()),
            department: None,
            hostel: Some("Hostel C".to_string()),
            ..input()
        };
        let validated = office.validate(&Settings::default()).unwrap();
        assert!(validated.is_oversight);
        assert_eq!(
            validated.affiliation.as_ref().and_then(Affiliation::hostel),
            Some("Hostel C")
        );

        let wrong_scope = NewEmployee {
            role: Some("Hostel Office".to_string()),
            ..input()
        };
        assert!(wrong_scope.validate(&Settings::default()).is_err());
    }

    #[test]
    fn email_must_look_like_an_address() {
        let bad = NewEmployee {
            email: "not-an-email".to_string(),
            ..input()
        };
        assert!(bad.validate(&Settings::default()).is_err());
    }

    #[test]
    fn status_action_parses() {
        assert_eq!(
            "Disable".parse::<EmployeeStatusAction>().unwrap(),
            EmployeeStatusAction::Disable
        );
        assert!("archive".parse::<EmployeeStatusAction>().is_err());
    }

    #[test]
    fn record_view_carries_flags() {
        let validated = input().validate(&Settings::default()).unwrap();
        let employee = Employee::from_validated(AccountId::new("acc-1"), validated, Utc::now());
        let record = RecordAuthorization::from(&employee);
        assert!(record.is_active);
        assert!(record.role.is_supervisor());
        assert!(employee.in_department("Water"));
    }
}
