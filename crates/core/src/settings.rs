//! Admin-editable configuration set (departments, statuses, roles, hostels).
//!
//! Each list is an ordered sequence of unique, trimmed, non-empty strings.
//! `statuses[0]` is the initial status of every new escalation.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

pub const DEFAULT_DEPARTMENTS: &[&str] = &[
    "Maintenance",
    "Mess",
    "Water",
    "Electricity",
    "Security",
    "Cleaning",
    "Internet",
    "Other",
];
pub const DEFAULT_STATUSES: &[&str] = &["New", "In Progress", "Resolved", "Closed"];
pub const DEFAULT_ROLES: &[&str] = &["Supervisor", "Team Member", "Hostel Office", "Admin"];
pub const DEFAULT_HOSTELS: &[&str] = &["Hostel A", "Hostel B", "Hostel C", "Hostel D"];

/// Which configuration list an operation targets.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingKind {
    Departments,
    Statuses,
    Roles,
    Hostels,
}

impl SettingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingKind::Departments => "departments",
            SettingKind::Statuses => "statuses",
            SettingKind::Roles => "roles",
            SettingKind::Hostels => "hostels",
        }
    }

    fn singular(&self) -> &'static str {
        match self {
            SettingKind::Departments => "department",
            SettingKind::Statuses => "status",
            SettingKind::Roles => "role",
            SettingKind::Hostels => "hostel",
        }
    }
}

impl core::fmt::Display for SettingKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SettingKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "departments" => Ok(SettingKind::Departments),
            "statuses" => Ok(SettingKind::Statuses),
            "roles" => Ok(SettingKind::Roles),
            "hostels" => Ok(SettingKind::Hostels),
            other => Err(DomainError::validation(format!(
                "unknown setting list '{other}' (expected departments, statuses, roles or hostels)"
            ))),
        }
    }
}

/// The configuration set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub departments: Vec<String>,
    pub statuses: Vec<String>,
    pub roles: Vec<String>,
    pub hostels: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();
        Self {
            departments: owned(DEFAULT_DEPARTMENTS),
            statuses: owned(DEFAULT_STATUSES),
            roles: owned(DEFAULT_ROLES),
            hostels: owned(DEFAULT_HOSTELS),
        }
    }
}

impl Settings {
    pub fn list(&self, kind: SettingKind) -> &[String] {
        match kind {
            SettingKind::Departments => &self.departments,
            SettingKind::Statuses => &self.statuses,
            SettingKind::Roles => &self.roles,
            SettingKind::Hostels => &self.hostels,
        }
    }

    fn list_mut(&mut self, kind: SettingKind) -> &mut Vec<String> {
        match kind {
            SettingKind::Departments => &mut self.departments,
            SettingKind::Statuses => &mut self.statuses,
            SettingKind::Roles => &mut self.roles,
            SettingKind::Hostels => &mut self.hostels,
        }
    }

    pub fn contains(&self, kind: SettingKind, value: &str) -> bool {
        self.list(kind).iter().any(|v| v == value)
    }

    /// Initial status for new escalations.
    pub fn initial_status(&self) -> Option<&str> {
        self.statuses.first().map(String::as_str)
    }

    /// Fail with a validation error unless `value` is a configured member of `kind`.
    pub fn require(&self, kind: SettingKind, value: &str) -> DomainResult<()> {
        if self.contains(kind, value) {
            Ok(())
        } else {
            Err(DomainError::validation(format!(
                "'{value}' is not a configured {}",
                kind.singular()
            )))
        }
    }

    pub fn add(&mut self, kind: SettingKind, value: &str) -> DomainResult<String> {
        let value = normalize(kind, value)?;
        if self.contains(kind, &value) {
            return Err(DomainError::conflict(format!(
                "{} '{value}' already exists",
                kind.singular()
            )));
        }
        self.list_mut(kind).push(value.clone());
        Ok(value)
    }

    /// Rename in place, preserving position (status order is meaningful).
    pub fn rename(&mut self, kind: SettingKind, old: &str, new: &str) -> DomainResult<String> {
        let new = normalize(kind, new)?;
        let position = self
            .list(kind)
            .iter()
            .position(|v| v == old)
            .ok_or_else(|| DomainError::not_found(format!("{} '{old}'", kind.singular())))?;

        if old != new && self.contains(kind, &new) {
            return Err(DomainError::conflict(format!(
                "{} '{new}' already exists",
                kind.singular()
            )));
        }

        self.list_mut(kind)[position] = new.clone();
        Ok(new)
    }

    pub fn remove(&mut self, kind: SettingKind, value: &str) -> DomainResult<()> {
        let position = self
            .list(kind)
            .iter()
            .position(|v| v == value)
            .ok_or_else(|| DomainError::not_found(format!("{} '{value}'", kind.singular())))?;

        if kind == SettingKind::Statuses && self.statuses.len() == 1 {
            return Err(DomainError::invariant(
                "at least one status must remain configured",
            ));
        }

        self.list_mut(kind).remove(position);
        Ok(())
    }
}

fn normalize(kind: SettingKind, value: &str) -> DomainResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DomainError::validation(format!(
            "{} name cannot be empty",
            kind.singular()
        )));
    }
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn defaults_start_with_new_status() {
        let settings = Settings::default();
        assert_eq!(settings.initial_status(), Some("New"));
        assert!(settings.contains(SettingKind::Departments, "Water"));
        assert!(settings.contains(SettingKind::Roles, "Hostel Office"));
    }

    #[test]
    fn add_rejects_duplicates_and_blank_values() {
        let mut settings = Settings::default();
        assert!(matches!(
            settings.add(SettingKind::Departments, " Water "),
            Err(DomainError::Conflict(_))
        ));
        assert!(matches!(
            settings.add(SettingKind::Departments, "   "),
            Err(DomainError::Validation(_))
        ));
        assert_eq!(settings.add(SettingKind::Departments, " Laundry").unwrap(), "Laundry");
        assert_eq!(settings.departments.last().unwrap(), "Laundry");
    }

    #[test]
    fn rename_keeps_position() {
        let mut settings = Settings::default();
        settings.rename(SettingKind::Statuses, "New", "Open").unwrap();
        assert_eq!(settings.initial_status(), Some("Open"));
        assert!(matches!(
            settings.rename(SettingKind::Statuses, "Open", "Closed"),
            Err(DomainError::Conflict(_))
        ));
    }

    #[test]
    fn last_status_cannot_be_removed() {
        let mut settings = Settings::default();
        settings.statuses = vec!["New".to_string()];
        assert!(matches!(
            settings.remove(SettingKind::Statuses, "New"),
            Err(DomainError::InvariantViolation(_))
        ));
        assert!(matches!(
            settings.remove(SettingKind::Roles, "Nope"),
            Err(DomainError::NotFound(_))
        ));
    }

    #[test]
    fn setting_kind_parses_case_insensitively() {
        assert_eq!("Statuses".parse::<SettingKind>().unwrap(), SettingKind::Statuses);
        assert!("colours".parse::<SettingKind>().is_err());
    }

    proptest! {
        #[test]
        fn add_then_remove_restores_the_list(value in "[A-Z][a-z]{2,12}") {
            let mut settings = Settings::default();
            prop_assume!(!settings.contains(SettingKind::Hostels, &value));
            let before = settings.clone();

            settings.add(SettingKind::Hostels, &value).unwrap();
            prop_assert!(settings.contains(SettingKind::Hostels, &value));
            settings.remove(SettingKind::Hostels, &value).unwrap();
            prop_assert_eq!(settings, before);
        }
    }
}
