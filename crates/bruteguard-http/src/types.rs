//! Request and response bodies for the JSON API.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One authentication attempt to be judged.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct AuthRequest {
    pub login: String,
    pub password: String,
    /// Source address of the attempt.
    pub ip: String,
}

/// Generic success flag. For `/auth` it carries the verdict.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct OkResponse {
    pub ok: bool,
}

impl OkResponse {
    pub const YES: Self = Self { ok: true };
}

/// Reset the login and address buckets, and optionally the password bucket.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct ResetRequest {
    pub login: String,
    pub ip: String,
    #[serde(default)]
    pub password: Option<String>,
}

/// A subnet given as address plus mask.
///
/// `mask` may be a prefix length (`24`) or a dotted netmask
/// (`255.255.255.0`). When omitted, `ip` must be in CIDR form.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct SubnetRequest {
    pub ip: String,
    #[serde(default)]
    pub mask: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct SubnetListResponse {
    /// Canonical CIDR strings, ascending.
    pub subnets: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    /// Keys currently held by the three limiters.
    pub tracked_keys: usize,
    /// Whether admin routes require a bearer token.
    pub admin_auth: bool,
}
