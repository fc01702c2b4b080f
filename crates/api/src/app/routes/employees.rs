use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};
use serde_json::json;

use hosteldesk_core::{AccountId, DomainError};
use hosteldesk_employees::{EmployeeStatusAction, NewEmployee};

use crate::app::errors::{self, JsonBody};
use crate::app::{dto, services::AppServices};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_employees))
        .route("/add", post(add_employee))
        .route("/manage-status", post(manage_status))
        .route("/update", put(update_employee))
}

pub async fn add_employee(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    JsonBody(body): JsonBody<NewEmployee>,
) -> axum::response::Response {
    match services.lifecycle.add_employee(principal.principal(), body).await {
        Ok(added) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "employeeId": added.employee_id.as_str(),
                "email": added.email,
                "message": added.message,
            })),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn manage_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    JsonBody(body): JsonBody<dto::ManageStatusRequest>,
) -> axum::response::Response {
    if body.employee_id.trim().is_empty() || body.action.trim().is_empty() {
        return errors::domain_error_to_response(DomainError::validation(
            "employeeId and action are required",
        ));
    }
    let action = match body.action.parse::<EmployeeStatusAction>() {
        Ok(action) => action,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let employee_id = AccountId::new(body.employee_id.trim());

    match services
        .lifecycle
        .set_employee_status(principal.principal(), &employee_id, action)
        .await
    {
        Ok(outcome) => (
            StatusCode::OK,
            Json(json!({ "success": true, "message": outcome.message })),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_employee(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    JsonBody(body): JsonBody<dto::UpdateEmployeeRequest>,
) -> axum::response::Response {
    if body.employee_id.trim().is_empty() {
        return errors::domain_error_to_response(DomainError::validation(
            "employeeId and updates are required",
        ));
    }
    let employee_id = AccountId::new(body.employee_id.trim());

    match services
        .lifecycle
        .update_employee(principal.principal(), &employee_id, &body.updates)
        .await
    {
        Ok(updated) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "message": updated.message,
                "updatedFields": updated.updated_fields,
            })),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_employees(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    match services.lifecycle.list_employees(principal.principal()).await {
        Ok(employees) => {
            let items = employees.iter().map(dto::employee_to_json).collect::<Vec<_>>();
            (
                StatusCode::OK,
                Json(json!({ "success": true, "employees": items })),
            )
                .into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}
