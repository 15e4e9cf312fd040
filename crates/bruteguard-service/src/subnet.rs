//! Subnet membership capability for the allow and deny lists.
//!
//! The access service only talks to `SubnetStore`; the persistent SQLite
//! implementation lives in `bruteguard-store`, and `MemorySubnetStore` here
//! serves tests and ephemeral runs.

use std::collections::BTreeSet;
use std::net::IpAddr;

use async_trait::async_trait;
use ipnet::IpNet;
use parking_lot::RwLock;

/// The two subnet lists consulted by the access service.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListKind {
    Allow,
    Deny,
}

impl ListKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Deny => "deny",
        }
    }
}

/// Errors surfaced at the store boundary.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The exact subnet is already stored.
    #[error("subnet already exists")]
    AlreadyExists,

    /// The exact subnet is not stored.
    #[error("subnet not found")]
    NotFound,

    /// The backing store failed (connectivity, I/O, corrupt rows).
    #[error("subnet store unavailable: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    pub fn backend(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Backend(err.into())
    }
}

/// A set of networks answering CIDR containment queries.
///
/// Subnets passed in are expected to be canonical (see [`canonical`]).
#[async_trait]
pub trait SubnetStore: Send + Sync {
    /// Stores `subnet`. Fails with `AlreadyExists` if it is already present.
    async fn add(&self, subnet: &IpNet) -> Result<(), StoreError>;

    /// Deletes `subnet`. Fails with `NotFound` if it is not present.
    async fn remove(&self, subnet: &IpNet) -> Result<(), StoreError>;

    /// Whether exactly `subnet` is stored.
    async fn contains(&self, subnet: &IpNet) -> Result<bool, StoreError>;

    /// Whether `addr` lies inside any stored subnet.
    async fn has_ip(&self, addr: IpAddr) -> Result<bool, StoreError>;

    /// All stored subnets, in ascending order.
    async fn list(&self) -> Result<Vec<IpNet>, StoreError>;
}

/// Returns `net` with its host bits cleared, e.g. `10.1.2.3/8` → `10.0.0.0/8`.
pub fn canonical(net: IpNet) -> IpNet {
    net.trunc()
}

/// In-memory `SubnetStore`.
#[derive(Default)]
pub struct MemorySubnetStore {
    subnets: RwLock<BTreeSet<IpNet>>,
}

impl MemorySubnetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store pre-populated with `subnets`.
    pub fn with_subnets(subnets: impl IntoIterator<Item = IpNet>) -> Self {
        Self {
            subnets: RwLock::new(subnets.into_iter().map(canonical).collect()),
        }
    }

    pub fn len(&self) -> usize {
        self.subnets.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.subnets.read().is_empty()
    }
}

#[async_trait]
impl SubnetStore for MemorySubnetStore {
    async fn add(&self, subnet: &IpNet) -> Result<(), StoreError> {
        if self.subnets.write().insert(canonical(*subnet)) {
            Ok(())
        } else {
            Err(StoreError::AlreadyExists)
        }
    }

    async fn remove(&self, subnet: &IpNet) -> Result<(), StoreError> {
        if self.subnets.write().remove(&canonical(*subnet)) {
            Ok(())
        } else {
            Err(StoreError::NotFound)
        }
    }

    async fn contains(&self, subnet: &IpNet) -> Result<bool, StoreError> {
        Ok(self.subnets.read().contains(&canonical(*subnet)))
    }

    async fn has_ip(&self, addr: IpAddr) -> Result<bool, StoreError> {
        Ok(self.subnets.read().iter().any(|net| net.contains(&addr)))
    }

    async fn list(&self) -> Result<Vec<IpNet>, StoreError> {
        Ok(self.subnets.read().iter().copied().collect())
    }
}
