//! Service-layer error types.
//!
//! `ServiceError` is transport-agnostic. Each transport crate maps it to
//! its own wire format. Rate-limit and deny-list rejections are verdicts,
//! not errors, and never appear here.

use ipnet::IpNet;

use crate::subnet::StoreError;

/// Service error shared across all transports.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The subnet is already on the target list.
    #[error("subnet {0} already exists")]
    AlreadyExists(IpNet),

    /// The subnet is not on the target list.
    #[error("subnet {0} not found")]
    NotFound(IpNet),

    /// The subnet store failed; passed through unchanged.
    #[error(transparent)]
    Store(StoreError),
}

impl ServiceError {
    /// Attaches the subnet to a store-side classification, so a lost
    /// check-then-act race still reports AlreadyExists/NotFound.
    pub(crate) fn from_store(err: StoreError, subnet: IpNet) -> Self {
        match err {
            StoreError::AlreadyExists => Self::AlreadyExists(subnet),
            StoreError::NotFound => Self::NotFound(subnet),
            other @ StoreError::Backend(_) => Self::Store(other),
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}
