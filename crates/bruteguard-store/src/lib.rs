//! Bruteguard Store - persistent allow/deny lists on SQLite.
//!
//! Both lists share one `subnets` table, distinguished by a `list` column.
//! Each row carries the network's first and last address as 16-byte
//! big-endian blobs (IPv4 widened), so CIDR containment is a range query
//! that SQLite evaluates with plain blob comparison.
//!
//! The `UNIQUE (list, subnet)` constraint is the authoritative duplicate
//! check; the access service's own pre-check is best-effort.

use std::net::IpAddr;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use ipnet::IpNet;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

use bruteguard_service::subnet::{ListKind, StoreError, SubnetStore, canonical};

const SCHEMA: [&str; 2] = [
    r"
    CREATE TABLE IF NOT EXISTS subnets (
        id        INTEGER PRIMARY KEY AUTOINCREMENT,
        list      TEXT    NOT NULL,
        subnet    TEXT    NOT NULL,
        family    INTEGER NOT NULL,
        net_start BLOB    NOT NULL,
        net_end   BLOB    NOT NULL,
        UNIQUE (list, subnet)
    )
    ",
    r"
    CREATE INDEX IF NOT EXISTS subnets_range
        ON subnets (list, family, net_start)
    ",
];

/// Connection pool shared by the allow-list and deny-list stores.
#[derive(Clone)]
pub struct SubnetDb {
    pool: SqlitePool,
}

impl SubnetDb {
    /// Opens (creating if missing) the database at `url`, e.g.
    /// `sqlite://data/bruteguard.db`, and applies the schema.
    ///
    /// Configures the pool with:
    /// - max 5 connections (SQLite has a single writer anyway)
    /// - 3 second acquire timeout to fail fast on overload
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(StoreError::backend)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect_with(options)
            .await
            .map_err(StoreError::backend)?;

        Self::with_pool(pool).await
    }

    /// Private in-memory database (for tests and ephemeral use).
    ///
    /// Every SQLite in-memory connection is its own database, so the pool
    /// is pinned to a single connection that never expires.
    pub async fn memory() -> Result<Self, StoreError> {
        let options =
            SqliteConnectOptions::from_str("sqlite::memory:").map_err(StoreError::backend)?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(StoreError::backend)?;

        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&pool)
                .await
                .map_err(StoreError::backend)?;
        }
        Ok(Self { pool })
    }

    /// Store for one of the two lists.
    pub fn list(&self, kind: ListKind) -> SqliteSubnetStore {
        SqliteSubnetStore {
            pool: self.pool.clone(),
            list: kind.label(),
        }
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// One list (allow or deny) backed by the shared `subnets` table.
#[derive(Clone)]
pub struct SqliteSubnetStore {
    pool: SqlitePool,
    list: &'static str,
}

/// Address family tag stored alongside each row.
fn family(addr: IpAddr) -> i64 {
    match addr {
        IpAddr::V4(_) => 4,
        IpAddr::V6(_) => 6,
    }
}

/// Fixed-width big-endian key so blob ordering matches numeric ordering.
fn addr_key(addr: IpAddr) -> Vec<u8> {
    let value = match addr {
        IpAddr::V4(v4) => u128::from(u32::from(v4)),
        IpAddr::V6(v6) => u128::from(v6),
    };
    value.to_be_bytes().to_vec()
}

fn classify(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::AlreadyExists,
        _ => StoreError::backend(err),
    }
}

#[async_trait]
impl SubnetStore for SqliteSubnetStore {
    async fn add(&self, subnet: &IpNet) -> Result<(), StoreError> {
        let subnet = canonical(*subnet);

        sqlx::query(
            "INSERT INTO subnets (list, subnet, family, net_start, net_end) VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(self.list)
        .bind(subnet.to_string())
        .bind(family(subnet.network()))
        .bind(addr_key(subnet.network()))
        .bind(addr_key(subnet.broadcast()))
        .execute(&self.pool)
        .await
        .map_err(classify)?;

        tracing::debug!(list = self.list, %subnet, "stored subnet");
        Ok(())
    }

    async fn remove(&self, subnet: &IpNet) -> Result<(), StoreError> {
        let subnet = canonical(*subnet);

        let result = sqlx::query("DELETE FROM subnets WHERE list = ?1 AND subnet = ?2")
            .bind(self.list)
            .bind(subnet.to_string())
            .execute(&self.pool)
            .await
            .map_err(StoreError::backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        tracing::debug!(list = self.list, %subnet, "deleted subnet");
        Ok(())
    }

    async fn contains(&self, subnet: &IpNet) -> Result<bool, StoreError> {
        let subnet = canonical(*subnet);

        let found: i64 = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM subnets WHERE list = ?1 AND subnet = ?2)",
        )
        .bind(self.list)
        .bind(subnet.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        Ok(found != 0)
    }

    async fn has_ip(&self, addr: IpAddr) -> Result<bool, StoreError> {
        let found: i64 = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM subnets \
             WHERE list = ?1 AND family = ?2 AND net_start <= ?3 AND net_end >= ?3)",
        )
        .bind(self.list)
        .bind(family(addr))
        .bind(addr_key(addr))
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        Ok(found != 0)
    }

    async fn list(&self) -> Result<Vec<IpNet>, StoreError> {
        let rows: Vec<String> = sqlx::query_scalar("SELECT subnet FROM subnets WHERE list = ?1")
            .bind(self.list)
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::backend)?;

        let mut subnets = rows
            .iter()
            .map(|s| s.parse::<IpNet>().map_err(StoreError::backend))
            .collect::<Result<Vec<_>, _>>()?;
        subnets.sort();
        Ok(subnets)
    }
}
