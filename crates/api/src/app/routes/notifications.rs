use std::sync::Arc;

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};
use serde_json::json;

use hosteldesk_infra::StatusUpdateNotice;

use crate::app::errors::{self, JsonBody};
use crate::app::{dto, services::AppServices};

/// Internal trigger: broadcast a status change to oversight staff and report
/// per-recipient outcomes.
pub async fn crm_status_update(
    Extension(services): Extension<Arc<AppServices>>,
    JsonBody(body): JsonBody<dto::StatusUpdateNotificationRequest>,
) -> axum::response::Response {
    let notice = StatusUpdateNotice {
        escalation_id: body.escalation_id,
        student_name: body.student_name,
        department: body.department,
        old_status: body.old_status,
        new_status: body.new_status,
        updated_by: body.updated_by,
    };

    match services.workflow.notify_oversight(&notice).await {
        Ok(report) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "message": format!(
                    "Oversight notifications sent: {} successful, {} failed",
                    report.total_sent, report.total_failed
                ),
                "totalSent": report.total_sent,
                "totalFailed": report.total_failed,
            })),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
