//! HTTP route handlers.

pub mod auth;
pub mod lists;
pub mod system;
