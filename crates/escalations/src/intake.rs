use serde::Deserialize;

use hosteldesk_core::{DomainError, DomainResult, SettingKind, Settings};

const MIN_STUDENT_NAME: usize = 2;
const MIN_DESCRIPTION: usize = 10;
const MAX_DESCRIPTION: usize = 500;

/// Ticket as submitted by a staff member on behalf of a student.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEscalation {
    #[serde(default)]
    pub student_name: String,
    #[serde(default)]
    pub student_email: String,
    #[serde(default)]
    pub hostel_name: String,
    #[serde(default)]
    pub room_number: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub team_member_email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedEscalation {
    pub student_name: String,
    pub student_email: String,
    pub hostel_name: String,
    pub room_number: String,
    pub description: String,
    pub department: String,
    pub team_member_email: Option<String>,
}

impl NewEscalation {
    pub fn validate(&self, settings: &Settings) -> DomainResult<ValidatedEscalation> {
        let student_name = self.student_name.trim();
        if student_name.chars().count() < MIN_STUDENT_NAME {
            return Err(DomainError::validation(
                "Student name must be at least 2 characters.",
            ));
        }

        let student_email = self.student_email.trim().to_lowercase();
        if !is_valid_email(&student_email) {
            return Err(DomainError::validation("Please enter a valid email."));
        }

        let hostel_name = self.hostel_name.trim();
        if hostel_name.is_empty() {
            return Err(DomainError::validation("Please select a hostel."));
        }

        let room_number = self.room_number.trim();
        if room_number.is_empty() {
            return Err(DomainError::validation("Room number is required."));
        }

        let description = self.description.trim();
        let len = description.chars().count();
        if len < MIN_DESCRIPTION {
            return Err(DomainError::validation(
                "Description must be at least 10 characters.",
            ));
        }
        if len > MAX_DESCRIPTION {
            return Err(DomainError::validation(
                "Description must not exceed 500 characters.",
            ));
        }

        let department = self.department.trim();
        if department.is_empty() {
            return Err(DomainError::validation("Please select a department."));
        }
        settings.require(SettingKind::Departments, department)?;

        let team_member_email = match self.team_member_email.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(email) if is_valid_email(email) => Some(email.to_lowercase()),
            Some(_) => {
                return Err(DomainError::validation(
                    "Please enter a valid team member email.",
                ));
            }
        };

        Ok(ValidatedEscalation {
            student_name: student_name.to_string(),
            student_email,
            hostel_name: hostel_name.to_string(),
            room_number: room_number.to_string(),
            description: description.to_string(),
            department: department.to_string(),
            team_member_email,
        })
    }
}

/// Shape check only: `local@domain.tld`, no whitespace.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
}
