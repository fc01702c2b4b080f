use std::collections::HashMap;

use chrono::{DateTime, Utc};

use hosteldesk_core::{AccountId, DomainError, DomainResult};
use hosteldesk_employees::Employee;

/// The supervisor a new ticket is routed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutedSupervisor {
    pub name: String,
    pub email: String,
}

/// Department → supervisor lookup.
///
/// Built from active employees holding a supervisor role (Supervisor or
/// Warden) in a department. When a department has several, the
/// earliest-created record wins, ties broken by account id.
#[derive(Debug, Clone, Default)]
pub struct SupervisorDirectory {
    by_department: HashMap<String, Candidate>,
}

#[derive(Debug, Clone)]
struct Candidate {
    supervisor: RoutedSupervisor,
    rank: (DateTime<Utc>, AccountId),
}

impl SupervisorDirectory {
    pub fn from_employees<'a>(employees: impl IntoIterator<Item = &'a Employee>) -> Self {
        let mut by_department: HashMap<String, Candidate> = HashMap::new();

        for employee in employees {
            if !employee.is_active || !employee.role.is_supervisor() {
                continue;
            }
            let Some(department) = employee.department() else {
                continue;
            };

            let rank = (employee.created_at, employee.id.clone());
            if by_department
                .get(department)
                .is_some_and(|current| current.rank <= rank)
            {
                continue;
            }
            by_department.insert(
                department.to_string(),
                Candidate {
                    supervisor: RoutedSupervisor {
                        name: employee.name.clone(),
                        email: employee.email.clone(),
                    },
                    rank,
                },
            );
        }

        Self { by_department }
    }

    pub fn route(&self, department: &str) -> DomainResult<&RoutedSupervisor> {
        self.by_department
            .get(department)
            .map(|candidate| &candidate.supervisor)
            .ok_or_else(|| DomainError::unroutable(department))
    }

    pub fn len(&self) -> usize {
        self.by_department.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_department.is_empty()
    }
}
