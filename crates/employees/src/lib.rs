//! Employee domain module.
//!
//! Business rules for staff records (creation input, role/affiliation rules,
//! the restricted update patch), implemented as deterministic domain logic.
//! Provisioning against the identity provider lives in the infra layer.

pub mod employee;
pub mod update;

pub use employee::{Employee, EmployeeStatusAction, NewEmployee, ValidatedEmployee};
pub use update::{EmployeeUpdate, UPDATABLE_FIELDS};
