//! Allow-list (`/whitelist`) and deny-list (`/blacklist`) management.

use axum::extract::{Json, State};
use axum::http::StatusCode;

use bruteguard_service::ServiceState;
use bruteguard_service::subnet::ListKind;

use crate::error::ApiError;
use crate::types::{OkResponse, SubnetListResponse, SubnetRequest};
use crate::validate::parse_subnet;

async fn add(
    state: &ServiceState,
    kind: ListKind,
    req: &SubnetRequest,
) -> Result<(StatusCode, Json<OkResponse>), ApiError> {
    let subnet = parse_subnet(&req.ip, req.mask.as_deref())?;
    state.access().add(kind, subnet).await?;
    state.metrics().record_list_add(kind);
    Ok((StatusCode::CREATED, Json(OkResponse::YES)))
}

async fn remove(
    state: &ServiceState,
    kind: ListKind,
    req: &SubnetRequest,
) -> Result<Json<OkResponse>, ApiError> {
    let subnet = parse_subnet(&req.ip, req.mask.as_deref())?;
    state.access().remove(kind, subnet).await?;
    state.metrics().record_list_remove(kind);
    Ok(Json(OkResponse::YES))
}

async fn list(state: &ServiceState, kind: ListKind) -> Result<Json<SubnetListResponse>, ApiError> {
    let subnets = state.access().list(kind).await?;
    Ok(Json(SubnetListResponse {
        subnets: subnets.iter().map(ToString::to_string).collect(),
    }))
}

/// Add a subnet to the allow-list.
#[utoipa::path(
    post,
    path = "/whitelist",
    request_body = SubnetRequest,
    responses(
        (status = 201, description = "Subnet added", body = OkResponse),
        (status = 400, description = "Invalid subnet", body = crate::error::ErrorBody),
        (status = 409, description = "Subnet already listed", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "Lists"
)]
pub async fn add_allow(
    State(state): State<ServiceState>,
    Json(req): Json<SubnetRequest>,
) -> Result<(StatusCode, Json<OkResponse>), ApiError> {
    add(&state, ListKind::Allow, &req).await
}

/// Remove a subnet from the allow-list.
#[utoipa::path(
    delete,
    path = "/whitelist",
    request_body = SubnetRequest,
    responses(
        (status = 200, description = "Subnet removed", body = OkResponse),
        (status = 404, description = "Subnet not listed", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "Lists"
)]
pub async fn remove_allow(
    State(state): State<ServiceState>,
    Json(req): Json<SubnetRequest>,
) -> Result<Json<OkResponse>, ApiError> {
    remove(&state, ListKind::Allow, &req).await
}

/// List allow-listed subnets.
#[utoipa::path(
    get,
    path = "/whitelist",
    responses(
        (status = 200, description = "Allow-listed subnets", body = SubnetListResponse),
    ),
    security(("bearer" = [])),
    tag = "Lists"
)]
pub async fn list_allow(
    State(state): State<ServiceState>,
) -> Result<Json<SubnetListResponse>, ApiError> {
    list(&state, ListKind::Allow).await
}

/// Add a subnet to the deny-list.
#[utoipa::path(
    post,
    path = "/blacklist",
    request_body = SubnetRequest,
    responses(
        (status = 201, description = "Subnet added", body = OkResponse),
        (status = 400, description = "Invalid subnet", body = crate::error::ErrorBody),
        (status = 409, description = "Subnet already listed", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "Lists"
)]
pub async fn add_deny(
    State(state): State<ServiceState>,
    Json(req): Json<SubnetRequest>,
) -> Result<(StatusCode, Json<OkResponse>), ApiError> {
    add(&state, ListKind::Deny, &req).await
}

/// Remove a subnet from the deny-list.
#[utoipa::path(
    delete,
    path = "/blacklist",
    request_body = SubnetRequest,
    responses(
        (status = 200, description = "Subnet removed", body = OkResponse),
        (status = 404, description = "Subnet not listed", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "Lists"
)]
pub async fn remove_deny(
    State(state): State<ServiceState>,
    Json(req): Json<SubnetRequest>,
) -> Result<Json<OkResponse>, ApiError> {
    remove(&state, ListKind::Deny, &req).await
}

/// List deny-listed subnets.
#[utoipa::path(
    get,
    path = "/blacklist",
    responses(
        (status = 200, description = "Deny-listed subnets", body = SubnetListResponse),
    ),
    security(("bearer" = [])),
    tag = "Lists"
)]
pub async fn list_deny(
    State(state): State<ServiceState>,
) -> Result<Json<SubnetListResponse>, ApiError> {
    list(&state, ListKind::Deny).await
}
