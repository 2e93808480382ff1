//! SQLite key-value store implementation.
//!
//! Embedded database, single file. Keys are stored as BLOBs so SQLite's
//! memcmp ordering matches the byte order required for prefix scans.
//!
//! Features:
//! - WAL mode for concurrent readers
//! - Range scans served by the primary key index

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::store::{validate_key, KeyValueStore, RangeScan};

/// SQLite implementation of KeyValueStore.
///
/// Uses WAL mode for performance and durability.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open or create a SQLite store at the given path with default pool settings.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let defaults = StoreConfig::default();
        Self::open_with(path, defaults.max_connections, defaults.busy_timeout()).await
    }

    /// Open or create the store described by `config`.
    pub async fn open_config(config: &StoreConfig) -> Result<Self> {
        Self::open_with(
            config.db_path(),
            config.max_connections,
            config.busy_timeout(),
        )
        .await
    }

    async fn open_with(
        path: impl AsRef<Path>,
        max_connections: u32,
        busy_timeout: Duration,
    ) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening SQLite store at {:?}", path);

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
            .map_err(|e| StoreError::ConnectionError(e.to_string()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .busy_timeout(busy_timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await
            .map_err(|e| StoreError::ConnectionError(e.to_string()))?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Create an in-memory SQLite store (for testing).
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| StoreError::ConnectionError(e.to_string()))?;

        // Every connection to `:memory:` is a separate database, so the pool
        // must hold exactly one connection for its whole lifetime.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::ConnectionError(e.to_string()))?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Initialize the database schema.
    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kv_store (
                key BLOB PRIMARY KEY NOT NULL,
                value BLOB NOT NULL
            ) WITHOUT ROWID
            "#,
        )
        .execute(&self.pool)
        .await?;

        debug!("SQLite schema initialized");
        Ok(())
    }

    /// Close the connection pool, waiting for in-flight operations.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("SQLite store closed");
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        validate_key(key)?;

        let row: Option<(Vec<u8>,)> = sqlx::query_as("SELECT value FROM kv_store WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|(value,)| value))
    }

    async fn put(&self, key: &[u8], value: Vec<u8>) -> Result<()> {
        validate_key(key)?;

        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value)
            VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(key)
        .bind(&value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn iterate_range(&self, lower: &[u8], upper: &[u8]) -> Result<RangeScan> {
        if lower >= upper {
            return Ok(RangeScan::new(Vec::new()));
        }

        let rows: Vec<(Vec<u8>, Vec<u8>)> = sqlx::query_as(
            "SELECT key, value FROM kv_store WHERE key >= ? AND key < ? ORDER BY key",
        )
        .bind(lower)
        .bind(upper)
        .fetch_all(&self.pool)
        .await?;

        debug!(rows = rows.len(), "SQLite range scan");
        Ok(RangeScan::new(rows))
    }
}
