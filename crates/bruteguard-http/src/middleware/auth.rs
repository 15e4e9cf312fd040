//! Bearer token authentication for the administrative routes.

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;

use bruteguard_service::ServiceState;

use crate::error::ApiError;

/// Checks `Authorization: Bearer <token>` against the configured admin token.
///
/// Only layered onto the admin router. Without a configured token every
/// request passes through.
pub async fn admin_auth_middleware(
    State(state): State<ServiceState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(auth) = state.auth() else {
        return Ok(next.run(req).await);
    };

    let presented = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match presented {
        Some(token) if auth.check_bearer(token) => Ok(next.run(req).await),
        _ => {
            tracing::warn!(path = %req.uri().path(), "rejected admin request");
            Err(ApiError::Unauthorized)
        }
    }
}
