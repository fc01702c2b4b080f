//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Deterministic, business-level failures only (validation, routing,
/// ownership, conflicts). Transport and upstream failures live in the infra
/// layer's `ServiceError`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Missing or contradictory input.
    #[error("{0}")]
    Validation(String),

    /// A domain invariant was violated.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// The targeted record does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// Duplicate or concurrently modified record.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The caller is authenticated but not allowed to act on this record.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// No supervisor is configured for the department of a new ticket.
    #[error("no supervisor is assigned to the '{0}' department")]
    UnroutableDepartment(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn unroutable(department: impl Into<String>) -> Self {
        Self::UnroutableDepartment(department.into())
    }
}
