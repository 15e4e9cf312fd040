//! System and health endpoints.

use axum::extract::{Json, State};
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;

use bruteguard_service::ServiceState;

use crate::types::HealthResponse;

/// Check server health.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Server is healthy", body = HealthResponse),
    ),
    tag = "System"
)]
pub async fn health(State(state): State<ServiceState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_secs(),
        tracked_keys: state.tracked_keys(),
        admin_auth: state.has_auth(),
    })
}

/// Prometheus text exposition of the service counters.
pub async fn metrics_endpoint(State(state): State<ServiceState>) -> impl IntoResponse {
    let body = state
        .metrics()
        .render(state.tracked_keys(), state.uptime_secs());
    ([(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")], body)
}
