//! Bruteguard Service - core access-decision logic for the bruteguard server.
//!
//! This crate contains all transport-agnostic business logic: the
//! sliding-window limiters, the allow/deny list capability, the decision
//! engine that combines them, metrics and admin-token checks.
//!
//! Transport crates (`bruteguard-http`) and storage crates
//! (`bruteguard-store`) depend on this crate and provide adapters.
//!
//! **Zero transport dependencies**: no axum, no sqlx, no wire code.

pub mod access;
pub mod auth;
pub mod error;
pub mod limiter;
pub mod metrics;
pub mod subnet;
pub mod window;

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use access::AccessService;
use auth::AdminAuth;
use limiter::{LimitConfig, SlidingWindowLimiter};
use metrics::Metrics;
use subnet::{MemorySubnetStore, SubnetStore};

/// Configuration subset relevant to the service layer.
///
/// Transport-specific config (ports, database URL, log format) stays in
/// the binary crate's `Config` struct.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub login: LimitConfig,
    pub password: LimitConfig,
    pub address: LimitConfig,
    pub admin_token: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        let minute = Duration::from_secs(60);
        Self {
            login: LimitConfig::new(10, minute),
            password: LimitConfig::new(100, minute),
            address: LimitConfig::new(1000, minute),
            admin_token: None,
        }
    }
}

/// Shared service state, cloneable across all transport handlers.
///
/// Wraps all business-layer components in an `Arc`. Transport crates
/// receive this and delegate all logic to it.
#[derive(Clone)]
pub struct ServiceState {
    inner: Arc<Inner>,
}

struct Inner {
    access: AccessService,
    limiters: [SlidingWindowLimiter; 3],
    metrics: Metrics,
    auth: Option<AdminAuth>,
    start_time: Instant,
}

impl ServiceState {
    /// Creates a new service state over the given allow and deny lists.
    pub fn new(
        config: &ServiceConfig,
        allow_list: Arc<dyn SubnetStore>,
        deny_list: Arc<dyn SubnetStore>,
    ) -> Self {
        let login = SlidingWindowLimiter::new(config.login);
        let password = SlidingWindowLimiter::new(config.password);
        let address = SlidingWindowLimiter::new(config.address);

        Self {
            inner: Arc::new(Inner {
                access: AccessService::new(
                    login.clone(),
                    password.clone(),
                    address.clone(),
                    allow_list,
                    deny_list,
                ),
                limiters: [login, password, address],
                metrics: Metrics::new(),
                auth: AdminAuth::new(config.admin_token.clone()),
                start_time: Instant::now(),
            }),
        }
    }

    /// Creates a state with in-memory lists (for tests and ephemeral use).
    pub fn new_in_memory(config: &ServiceConfig) -> Self {
        Self::new(
            config,
            Arc::new(MemorySubnetStore::new()),
            Arc::new(MemorySubnetStore::new()),
        )
    }

    // --- Accessors ---

    pub fn access(&self) -> &AccessService {
        &self.inner.access
    }

    pub fn metrics(&self) -> &Metrics {
        &self.inner.metrics
    }

    pub fn auth(&self) -> Option<&AdminAuth> {
        self.inner.auth.as_ref()
    }

    pub fn has_auth(&self) -> bool {
        self.inner.auth.is_some()
    }

    pub fn uptime_secs(&self) -> u64 {
        self.inner.start_time.elapsed().as_secs()
    }

    /// Keys currently held across all three limiters.
    pub fn tracked_keys(&self) -> usize {
        self.inner.limiters.iter().map(SlidingWindowLimiter::len).sum()
    }

    // --- Maintenance ---

    /// Starts one background sweep per limiter.
    ///
    /// Each sweep gets its own child of `shutdown`; cancelling `shutdown`
    /// stops all of them.
    pub fn start_sweepers(&self, shutdown: &CancellationToken) -> Vec<JoinHandle<()>> {
        self.inner
            .limiters
            .iter()
            .map(|limiter| limiter.start_sweeper(shutdown.child_token()))
            .collect()
    }
}
