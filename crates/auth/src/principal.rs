use serde::{Deserialize, Serialize};

use hosteldesk_core::AccountId;

use crate::Role;

/// Where an employee belongs: a department, or (for hostel-office staff) a hostel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "lowercase")]
pub enum Affiliation {
    Department(String),
    Hostel(String),
}

impl Affiliation {
    pub fn department(&self) -> Option<&str> {
        match self {
            Affiliation::Department(d) => Some(d),
            Affiliation::Hostel(_) => None,
        }
    }

    pub fn hostel(&self) -> Option<&str> {
        match self {
            Affiliation::Hostel(h) => Some(h),
            Affiliation::Department(_) => None,
        }
    }
}

/// A fully resolved, authenticated caller.
///
/// Transient: derived per request from verified token claims reconciled with
/// the persisted employee record (see [`crate::resolve_authorization`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub account_id: AccountId,
    pub email: String,
    pub is_admin: bool,
    pub is_oversight: bool,
    pub role: Option<Role>,
    pub affiliation: Option<Affiliation>,
    pub display_name: Option<String>,
}

impl Principal {
    pub fn is_self(&self, target: &AccountId) -> bool {
        &self.account_id == target
    }

    pub fn has_email(&self, email: &str) -> bool {
        !email.is_empty() && self.email.eq_ignore_ascii_case(email.trim())
    }

    pub fn is_supervisor(&self) -> bool {
        self.role.as_ref().is_some_and(Role::is_supervisor)
    }

    /// Best label for audit trails: display name when known, else email.
    pub fn actor_label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.email)
    }
}
