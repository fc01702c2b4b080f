use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;

use hosteldesk_core::{SettingKind, Settings};
use hosteldesk_infra::ServiceError;

use crate::app::errors::{self, JsonBody};
use crate::app::{dto, services::AppServices};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(get_settings))
        .route(
            "/:kind",
            post(add_setting).put(rename_setting).delete(remove_setting),
        )
}

pub async fn get_settings(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    settings_response(services.workflow.settings().await)
}

pub async fn add_setting(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(kind): Path<String>,
    JsonBody(body): JsonBody<dto::SettingValueRequest>,
) -> axum::response::Response {
    let kind = match kind.parse::<SettingKind>() {
        Ok(kind) => kind,
        Err(e) => return errors::domain_error_to_response(e),
    };
    settings_response(
        services
            .workflow
            .add_setting(principal.principal(), kind, &body.value)
            .await,
    )
}

pub async fn rename_setting(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(kind): Path<String>,
    JsonBody(body): JsonBody<dto::RenameSettingRequest>,
) -> axum::response::Response {
    let kind = match kind.parse::<SettingKind>() {
        Ok(kind) => kind,
        Err(e) => return errors::domain_error_to_response(e),
    };
    settings_response(
        services
            .workflow
            .rename_setting(principal.principal(), kind, &body.from, &body.to)
            .await,
    )
}

pub async fn remove_setting(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(kind): Path<String>,
    JsonBody(body): JsonBody<dto::SettingValueRequest>,
) -> axum::response::Response {
    let kind = match kind.parse::<SettingKind>() {
        Ok(kind) => kind,
        Err(e) => return errors::domain_error_to_response(e),
    };
    settings_response(
        services
            .workflow
            .remove_setting(principal.principal(), kind, &body.value)
            .await,
    )
}

fn settings_response(result: Result<Settings, ServiceError>) -> axum::response::Response {
    match result {
        Ok(settings) => (
            StatusCode::OK,
            Json(json!({ "success": true, "settings": settings })),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
