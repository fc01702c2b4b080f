use axum::{
    Router,
    routing::{get, post},
};

pub mod employees;
pub mod escalations;
pub mod notifications;
pub mod settings;
pub mod system;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/api/whoami", get(system::whoami))
        .nest("/api/employees", employees::router())
        .nest("/api/escalations", escalations::router())
        .nest("/api/settings", settings::router())
}

/// Endpoints reachable without a credential.
pub fn public_router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .route(
            "/api/notifications/crm-status-update",
            post(notifications::crm_status_update),
        )
}
