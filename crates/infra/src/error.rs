//! Orchestration-level error model.

use thiserror::Error;

use hosteldesk_auth::{AuthzError, TokenValidationError};
use hosteldesk_core::DomainError;

use crate::retry::Retryable;

/// Failure of a lifecycle, workflow or authentication operation.
///
/// Upstream messages are kept for logs; the HTTP layer only echoes the
/// classified operation name.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("authentication failed ({})", .0.reason_code())]
    Unauthenticated(TokenValidationError),

    #[error("{0} timed out")]
    UpstreamTimeout(&'static str),

    #[error("{operation} failed: {message}")]
    UpstreamFailure {
        operation: &'static str,
        message: String,
    },
}

impl ServiceError {
    pub fn upstream(operation: &'static str, message: impl Into<String>) -> Self {
        Self::UpstreamFailure {
            operation,
            message: message.into(),
        }
    }
}

impl From<TokenValidationError> for ServiceError {
    fn from(value: TokenValidationError) -> Self {
        Self::Unauthenticated(value)
    }
}

impl From<AuthzError> for ServiceError {
    fn from(value: AuthzError) -> Self {
        match value {
            // Reported as a bad request, not a permission problem.
            AuthzError::SelfTarget => DomainError::validation(value.to_string()).into(),
            other => DomainError::forbidden(other.to_string()).into(),
        }
    }
}

impl Retryable for ServiceError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            ServiceError::UpstreamTimeout(_) | ServiceError::UpstreamFailure { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_target_is_a_validation_error() {
        let err: ServiceError = AuthzError::SelfTarget.into();
        assert!(matches!(err, ServiceError::Domain(DomainError::Validation(_))));

        let err: ServiceError = AuthzError::AdminRequired.into();
        assert!(matches!(err, ServiceError::Domain(DomainError::Forbidden(_))));
    }

    #[test]
    fn only_upstream_failures_are_retryable() {
        assert!(ServiceError::UpstreamTimeout("lookup").is_retryable());
        assert!(!ServiceError::from(DomainError::not_found("employee")).is_retryable());
    }
}
