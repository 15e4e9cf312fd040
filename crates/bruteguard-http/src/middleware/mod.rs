//! HTTP middleware: request ID tracking, admin authentication.

pub mod auth;
pub mod request_id;
