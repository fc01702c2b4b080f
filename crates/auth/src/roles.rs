use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Employee role name.
///
/// Roles are open-ended strings validated against the configured role list;
/// only a handful of well-known names carry authorization meaning.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub const ADMIN: &'static str = "Admin";
    pub const SUPERVISOR: &'static str = "Supervisor";
    pub const WARDEN: &'static str = "Warden";
    pub const TEAM_MEMBER: &'static str = "Team Member";
    pub const HOSTEL_OFFICE: &'static str = "Hostel Office";
    /// Older deployments named the oversight tier "CRM".
    pub const LEGACY_OVERSIGHT: &'static str = "CRM";

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn implies_admin(&self) -> bool {
        self.as_str() == Self::ADMIN
    }

    /// Escalation-oversight capability (receives every status-change notice).
    pub fn implies_oversight(&self) -> bool {
        matches!(self.as_str(), Self::HOSTEL_OFFICE | Self::LEGACY_OVERSIGHT)
    }

    /// Supervisors own the tickets of their department.
    pub fn is_supervisor(&self) -> bool {
        matches!(self.as_str(), Self::SUPERVISOR | Self::WARDEN)
    }

    pub fn is_team_member(&self) -> bool {
        self.as_str() == Self::TEAM_MEMBER
    }

    /// Roles affiliated with a hostel rather than a department.
    pub fn is_hostel_scoped(&self) -> bool {
        self.as_str() == Self::HOSTEL_OFFICE
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_known_roles_carry_capabilities() {
        assert!(Role::new("Admin").implies_admin());
        assert!(Role::new("Hostel Office").implies_oversight());
        assert!(Role::new("CRM").implies_oversight());
        assert!(Role::new("Warden").is_supervisor());
        assert!(!Role::new("Team Member").is_supervisor());
    }
}
