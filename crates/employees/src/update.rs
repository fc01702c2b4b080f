use serde_json::{Map, Value};

use hosteldesk_auth::{Affiliation, Role};
use hosteldesk_core::{DomainError, DomainResult, SettingKind, Settings};

use crate::Employee;

/// The only fields an admin may change after creation.
pub const UPDATABLE_FIELDS: &[&str] = &["department", "role"];

/// Partial update of an employee record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmployeeUpdate {
    pub department: Option<String>,
    pub role: Option<String>,
}

impl EmployeeUpdate {
    /// Parse an untyped patch. Any key outside [`UPDATABLE_FIELDS`] rejects
    /// the whole patch.
    pub fn from_map(updates: &Map<String, Value>) -> DomainResult<Self> {
        let mut invalid: Vec<&str> = updates
            .keys()
            .map(String::as_str)
            .filter(|k| !UPDATABLE_FIELDS.contains(k))
            .collect();
        if !invalid.is_empty() {
            invalid.sort_unstable();
            return Err(DomainError::validation(format!(
                "Invalid fields: {}. Only department and role can be updated.",
                invalid.join(", ")
            )));
        }
        if updates.is_empty() {
            return Err(DomainError::validation("employeeId and updates are required"));
        }

        Ok(Self {
            department: string_field(updates, "department")?,
            role: string_field(updates, "role")?,
        })
    }

    pub fn validate(&self, settings: &Settings) -> DomainResult<()> {
        if let Some(department) = &self.department {
            settings.require(SettingKind::Departments, department)?;
        }
        if let Some(role) = &self.role {
            settings.require(SettingKind::Roles, role)?;
        }
        Ok(())
    }

    pub fn updated_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.department.is_some() {
            fields.push("department");
        }
        if self.role.is_some() {
            fields.push("role");
        }
        fields
    }

    /// Apply to a record; returns `true` when the role changed.
    ///
    /// Flags implied by the previous role are recomputed from the new one;
    /// flags held independently of the role are kept. Fails, leaving the
    /// record untouched, when the result would pair a role with the wrong
    /// kind of affiliation.
    pub fn apply_to(&self, employee: &mut Employee) -> DomainResult<bool> {
        let role = match &self.role {
            Some(role) if employee.role.as_str() != role => Some(Role::new(role.clone())),
            _ => None,
        };
        let next_role = role.as_ref().unwrap_or(&employee.role);
        let affiliation = match &self.department {
            Some(department) => Some(Affiliation::Department(department.clone())),
            None => employee.affiliation.clone(),
        };
        let (is_admin, is_oversight) = match &role {
            Some(next) => (
                (employee.is_admin && !employee.role.implies_admin()) || next.implies_admin(),
                (employee.is_oversight && !employee.role.implies_oversight()) || next.implies_oversight(),
            ),
            None => (employee.is_admin, employee.is_oversight),
        };
        check_affiliation(next_role, affiliation.as_ref(), is_admin || is_oversight)?;

        employee.affiliation = affiliation;
        employee.is_admin = is_admin;
        employee.is_oversight = is_oversight;
        match role {
            Some(role) => {
                employee.role = role;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

fn check_affiliation(role: &Role, affiliation: Option<&Affiliation>, privileged: bool) -> DomainResult<()> {
    match affiliation {
        Some(Affiliation::Department(_)) if role.is_hostel_scoped() => Err(DomainError::validation(
            "Hostel Office staff are assigned to a hostel, not a department",
        )),
        Some(Affiliation::Hostel(_)) if !role.is_hostel_scoped() => Err(DomainError::validation(format!(
            "role '{role}' is assigned to a department, not a hostel"
        ))),
        None if !privileged => Err(DomainError::validation(format!(
            "role '{role}' requires a department"
        ))),
        _ => Ok(()),
    }
}

fn string_field(updates: &Map<String, Value>, key: &str) -> DomainResult<Option<String>> {
    match updates.get(key) {
        None => Ok(None),
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(Some(s.trim().to_string())),
        Some(_) => Err(DomainError::validation(format!(
            "'{key}' must be a non-empty string"
        ))),
    }
}
