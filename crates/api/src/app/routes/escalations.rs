use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;

use hosteldesk_core::EscalationId;
use hosteldesk_escalations::NewEscalation;
use hosteldesk_infra::{ServiceError, WorkflowOutcome};

use crate::app::errors::{self, JsonBody};
use crate::app::{dto, services::AppServices};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_escalation).get(list_escalations))
        .route("/:id", get(get_escalation))
        .route("/:id/assign", post(assign_team_member))
        .route("/:id/status", post(update_status))
}

pub async fn create_escalation(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    JsonBody(body): JsonBody<NewEscalation>,
) -> axum::response::Response {
    let result = services
        .workflow
        .create_escalation(principal.principal(), body)
        .await;
    outcome_response(StatusCode::CREATED, result)
}

pub async fn list_escalations(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    match services.workflow.list_escalations(principal.principal()).await {
        Ok(items) => {
            let items = items.iter().map(dto::escalation_to_json).collect::<Vec<_>>();
            (
                StatusCode::OK,
                Json(json!({ "success": true, "escalations": items })),
            )
                .into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_escalation(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match id.parse::<EscalationId>() {
        Ok(id) => id,
        Err(e) => return errors::domain_error_to_response(e),
    };
    match services.workflow.get_escalation(principal.principal(), &id).await {
        Ok(escalation) => (
            StatusCode::OK,
            Json(json!({ "success": true, "escalation": dto::escalation_to_json(&escalation) })),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn assign_team_member(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<dto::AssignTeamMemberRequest>,
) -> axum::response::Response {
    let id = match id.parse::<EscalationId>() {
        Ok(id) => id,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let result = services
        .workflow
        .assign_team_member(principal.principal(), &id, &body.team_member_email)
        .await;
    outcome_response(StatusCode::OK, result)
}

pub async fn update_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<dto::ChangeStatusRequest>,
) -> axum::response::Response {
    let id = match id.parse::<EscalationId>() {
        Ok(id) => id,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let result = services
        .workflow
        .update_status(principal.principal(), &id, &body.status)
        .await;
    outcome_response(StatusCode::OK, result)
}

/// Responds as soon as the write commits; notifications keep running.
fn outcome_response(status: StatusCode, result: Result<WorkflowOutcome, ServiceError>) -> axum::response::Response {
    match result {
        Ok(outcome) => (
            status,
            Json(json!({
                "success": true,
                "escalation": dto::escalation_to_json(&outcome.escalation),
            })),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
