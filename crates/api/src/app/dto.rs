use serde::Deserialize;
use serde_json::{Map, Value, json};

use hosteldesk_auth::Principal;
use hosteldesk_employees::Employee;
use hosteldesk_escalations::Escalation;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManageStatusRequest {
    #[serde(default)]
    pub employee_id: String,
    #[serde(default)]
    pub action: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEmployeeRequest {
    #[serde(default)]
    pub employee_id: String,
    #[serde(default)]
    pub updates: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignTeamMemberRequest {
    #[serde(default)]
    pub team_member_email: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangeStatusRequest {
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct SettingValueRequest {
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct RenameSettingRequest {
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
}

/// Oversight broadcast trigger; missing fields are reported as one
/// validation error rather than a decode failure.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatusUpdateNotificationRequest {
    pub escalation_id: String,
    pub student_name: String,
    pub department: String,
    pub old_status: String,
    pub new_status: String,
    pub updated_by: String,
}

// -------------------------
// Response mapping
// -------------------------

pub fn employee_to_json(employee: &Employee) -> Value {
    json!({
        "id": employee.id.as_str(),
        "name": employee.name,
        "email": employee.email,
        "role": employee.role.as_str(),
        "department": employee.department(),
        "hostel": employee.affiliation.as_ref().and_then(|a| a.hostel()),
        "isAdmin": employee.is_admin,
        "isOversight": employee.is_oversight,
        "isActive": employee.is_active,
        "createdAt": employee.created_at.to_rfc3339(),
    })
}

pub fn escalation_to_json(escalation: &Escalation) -> Value {
    serde_json::to_value(escalation).unwrap_or(Value::Null)
}

pub fn principal_to_json(principal: &Principal) -> Value {
    json!({
        "accountId": principal.account_id.as_str(),
        "email": principal.email,
        "displayName": principal.display_name,
        "role": principal.role.as_ref().map(|r| r.as_str()),
        "department": principal.affiliation.as_ref().and_then(|a| a.department()),
        "hostel": principal.affiliation.as_ref().and_then(|a| a.hostel()),
        "isAdmin": principal.is_admin,
        "isOversight": principal.is_oversight,
    })
}
