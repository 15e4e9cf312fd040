//! Bruteguard Server - brute-force protection for login endpoints.
//!
//! The service core (limiters, list precedence, metrics) lives in
//! `bruteguard-service`, the SQLite list store in `bruteguard-store` and
//! the JSON API in `bruteguard-http`. This crate wires them together.

pub mod config;

use std::sync::Arc;

use bruteguard_service::ServiceState;
use bruteguard_service::subnet::{ListKind, StoreError};
use bruteguard_store::SubnetDb;

use config::Config;

/// Service state plus the database handle backing its lists, if any.
pub struct Server {
    pub state: ServiceState,
    pub db: Option<SubnetDb>,
}

impl Server {
    /// Builds the service state, opening the SQLite lists when a database
    /// URL is configured and falling back to in-memory lists otherwise.
    pub async fn open(config: &Config) -> Result<Self, StoreError> {
        let service_config = config.service_config();

        let Some(url) = config.database_url.as_deref() else {
            return Ok(Self {
                state: ServiceState::new_in_memory(&service_config),
                db: None,
            });
        };

        let db = SubnetDb::connect(url).await?;
        let state = ServiceState::new(
            &service_config,
            Arc::new(db.list(ListKind::Allow)),
            Arc::new(db.list(ListKind::Deny)),
        );
        Ok(Self { state, db: Some(db) })
    }

    pub fn persistent(&self) -> bool {
        self.db.is_some()
    }

    /// Closes the database pool, if one is open.
    pub async fn close(&self) {
        if let Some(db) = &self.db {
            db.close().await;
        }
    }
}
