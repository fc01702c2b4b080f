use crate::{Affiliation, AuthClaims, Principal, Role};

/// The authorization-relevant slice of a persisted employee record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordAuthorization {
    pub name: String,
    pub role: Role,
    pub affiliation: Option<Affiliation>,
    pub is_admin: bool,
    pub is_oversight: bool,
    pub is_active: bool,
}

/// Reconcile verified token claims with the employee record.
///
/// A capability is granted if the claims, the record flags, or the record's
/// role grant it. Name, role and affiliation come from the record when one
/// exists; claims and record are allowed to drift apart.
pub fn resolve_authorization(claims: &AuthClaims, record: Option<&RecordAuthorization>) -> Principal {
    let claim_role = claims.authorization.role.clone().map(Role::new);

    let Some(record) = record else {
        let is_admin =
            claims.authorization.is_admin || claim_role.as_ref().is_some_and(Role::implies_admin);
        let is_oversight = claims.authorization.is_oversight
            || claim_role.as_ref().is_some_and(Role::implies_oversight);
        return Principal {
            account_id: claims.sub.clone(),
            email: claims.email.clone(),
            is_admin,
            is_oversight,
            role: claim_role,
            affiliation: None,
            display_name: None,
        };
    };

    let roles = [Some(&record.role), claim_role.as_ref()];
    let is_admin = claims.authorization.is_admin
        || record.is_admin
        || roles.iter().flatten().any(|r| r.implies_admin());
    let is_oversight = claims.authorization.is_oversight
        || record.is_oversight
        || roles.iter().flatten().any(|r| r.implies_oversight());

    Principal {
        account_id: claims.sub.clone(),
        email: claims.email.clone(),
        is_admin,
        is_oversight,
        role: Some(record.role.clone()),
        affiliation: record.affiliation.clone(),
        display_name: Some(record.name.clone()),
    }
}
