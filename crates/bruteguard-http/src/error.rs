//! Error types for the HTTP layer.
//!
//! Policy denials are not errors: `/auth` answers `{"ok": false}` with 200.
//! Everything here is a request that could not be carried out.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use bruteguard_service::error::ServiceError;

/// API error returned by every handler.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Malformed address, mask or empty field.
    #[error("{0}")]
    BadRequest(String),

    /// Missing or invalid admin token.
    #[error("unauthorized")]
    Unauthorized,

    /// Subnet not on the target list.
    #[error("{0}")]
    NotFound(String),

    /// Subnet already on the target list.
    #[error("{0}")]
    Conflict(String),

    /// The subnet store could not be reached.
    #[error("{0}")]
    StoreUnavailable(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::AlreadyExists(_) => Self::Conflict(err.to_string()),
            ServiceError::NotFound(_) => Self::NotFound(err.to_string()),
            ServiceError::Store(_) => Self::StoreUnavailable(err.to_string()),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ErrorBody {
    /// Error code (e.g. "bad_request", "already_exists", "not_found").
    pub(crate) error: String,
    /// Human-readable error detail, if available.
    pub(crate) detail: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, detail) = match &self {
            ApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            ApiError::Conflict(msg) => {
                (StatusCode::CONFLICT, "already_exists", Some(msg.clone()))
            }
            ApiError::StoreUnavailable(msg) => {
                tracing::error!(%msg, "subnet store unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "store_unavailable",
                    Some(msg.clone()),
                )
            }
        };

        let body = ErrorBody {
            error: error.to_string(),
            detail,
        };

        (status, axum::Json(body)).into_response()
    }
}
