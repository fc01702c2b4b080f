use axum::{
    async_trait,
    extract::{FromRequest, Request, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use hosteldesk_core::DomainError;
use hosteldesk_infra::ServiceError;

pub fn service_error_to_response(err: ServiceError) -> axum::response::Response {
    match err {
        ServiceError::Domain(e) => domain_error_to_response(e),
        ServiceError::Unauthenticated(reason) => {
            tracing::info!(reason = reason.reason_code(), "request rejected: unauthenticated");
            let response = json_error(StatusCode::UNAUTHORIZED, "unauthenticated", reason.to_string());
            with_reason_header(response, reason.reason_code())
        }
        ServiceError::UpstreamTimeout(operation) => {
            tracing::error!(operation, "upstream timeout surfaced to caller");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "upstream_timeout",
                format!("{operation} timed out, please try again"),
            )
        }
        ServiceError::UpstreamFailure { operation, message } => {
            // Raw upstream detail stays in the logs.
            tracing::error!(operation, error = %message, "upstream failure surfaced to caller");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "upstream_failure",
                format!("{operation} failed, please try again"),
            )
        }
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::UnroutableDepartment(department) => json_error(
            StatusCode::BAD_REQUEST,
            "unroutable_department",
            format!("No supervisor is configured for the {department} department"),
        ),
        DomainError::NotFound(what) => json_error(StatusCode::NOT_FOUND, "not_found", format!("{what} not found")),
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        DomainError::Forbidden(msg) => json_error(StatusCode::FORBIDDEN, "forbidden", msg),
        DomainError::InvariantViolation(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", msg)
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "success": false,
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Machine-readable 401 reason (`expired`, `revoked`, `malformed`, `project-mismatch`).
fn with_reason_header(mut response: axum::response::Response, reason: &'static str) -> axum::response::Response {
    response.headers_mut().insert(
        "x-auth-failure-reason",
        axum::http::HeaderValue::from_static(reason),
    );
    response
}

/// `Json<T>` whose rejection uses the common error body.
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    axum::Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = axum::response::Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(json_error(
                StatusCode::BAD_REQUEST,
                "invalid_request",
                rejection.body_text(),
            )),
        }
    }
}
