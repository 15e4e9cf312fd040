//! Admin token verification.
//!
//! Credential extraction is transport-specific (HTTP headers). This module
//! only handles the comparison.

use subtle::ConstantTimeEq;

/// Bearer token guarding the administrative operations.
#[derive(Clone)]
pub struct AdminAuth {
    token: String,
}

impl AdminAuth {
    /// Returns `None` when no token (or an empty one) is configured.
    pub fn new(token: Option<String>) -> Option<Self> {
        token
            .filter(|t| !t.is_empty())
            .map(|token| Self { token })
    }

    /// Check a presented bearer token.
    pub fn check_bearer(&self, token: &str) -> bool {
        ct_eq(token.as_bytes(), self.token.as_bytes())
    }
}

/// Constant-time comparison of two byte slices.
fn ct_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.ct_eq(b).into()
}
