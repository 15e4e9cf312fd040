//! Authentication attempts and bucket resets.

use axum::extract::{Json, State};

use bruteguard_service::ServiceState;

use crate::error::ApiError;
use crate::types::{AuthRequest, OkResponse, ResetRequest};
use crate::validate::{parse_addr, require_non_empty};

/// Judge one authentication attempt.
///
/// `ok` is false when the address is deny-listed or any of the login,
/// password or address limits is exhausted. An allow-listed address is
/// always admitted.
#[utoipa::path(
    post,
    path = "/auth",
    request_body = AuthRequest,
    responses(
        (status = 200, description = "Verdict for the attempt", body = OkResponse),
        (status = 400, description = "Invalid login, password or address", body = crate::error::ErrorBody),
        (status = 503, description = "Subnet store unavailable", body = crate::error::ErrorBody),
    ),
    tag = "Access"
)]
pub async fn auth(
    State(state): State<ServiceState>,
    Json(req): Json<AuthRequest>,
) -> Result<Json<OkResponse>, ApiError> {
    require_non_empty("login", &req.login)?;
    require_non_empty("password", &req.password)?;
    let addr = parse_addr(&req.ip)?;

    match state.access().decide(&req.login, &req.password, addr).await {
        Ok(decision) => {
            state.metrics().record_decision(decision);
            tracing::info!(
                login = %req.login,
                ip = %addr,
                decision = decision.label(),
                "auth attempt"
            );
            Ok(Json(OkResponse {
                ok: decision.is_allowed(),
            }))
        }
        Err(err) => {
            state.metrics().record_verify_error();
            Err(err.into())
        }
    }
}

/// Forget the attempts recorded for a login and an address.
///
/// The password bucket is cleared too when `password` is given.
#[utoipa::path(
    post,
    path = "/reset",
    request_body = ResetRequest,
    responses(
        (status = 200, description = "Buckets cleared", body = OkResponse),
        (status = 400, description = "Invalid login or address", body = crate::error::ErrorBody),
        (status = 401, description = "Missing or invalid admin token", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "Admin"
)]
pub async fn reset(
    State(state): State<ServiceState>,
    Json(req): Json<ResetRequest>,
) -> Result<Json<OkResponse>, ApiError> {
    require_non_empty("login", &req.login)?;
    let addr = parse_addr(&req.ip)?;

    state.access().reset(&req.login, addr);
    if let Some(password) = req.password.as_deref().filter(|p| !p.is_empty()) {
        state.access().reset_password(password);
    }
    state.metrics().record_reset();

    Ok(Json(OkResponse::YES))
}
