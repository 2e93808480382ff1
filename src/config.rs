//! Store configuration.
//!
//! Defaults place the database in the platform data directory; every field
//! can be overridden from the environment.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// Environment variable overriding [`StoreConfig::data_dir`].
pub const ENV_DATA_DIR: &str = "LEARNING_STORE_DIR";
/// Environment variable overriding [`StoreConfig::db_file`].
pub const ENV_DB_FILE: &str = "LEARNING_STORE_DB_FILE";
/// Environment variable overriding [`StoreConfig::max_connections`].
pub const ENV_MAX_CONNECTIONS: &str = "LEARNING_STORE_MAX_CONNECTIONS";
/// Environment variable overriding [`StoreConfig::busy_timeout_secs`].
pub const ENV_BUSY_TIMEOUT_SECS: &str = "LEARNING_STORE_BUSY_TIMEOUT_SECS";

const APP_DIR: &str = "learning-store";

/// Where and how the durable store is opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding the database file. Created on open if missing.
    pub data_dir: PathBuf,
    /// Database file name inside `data_dir`.
    pub db_file: String,
    /// SQLite connection pool size.
    pub max_connections: u32,
    /// How long a connection waits on a locked database.
    pub busy_timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .map(|dir| dir.join(APP_DIR))
            .unwrap_or_else(|| PathBuf::from("./data"));

        Self {
            data_dir,
            db_file: "learning_state.db".to_string(),
            max_connections: 5,
            busy_timeout_secs: 30,
        }
    }
}

impl StoreConfig {
    /// Defaults overridden by any `LEARNING_STORE_*` variables that are set.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable source.
    ///
    /// Unparseable numeric values are logged and ignored.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(dir) = lookup(ENV_DATA_DIR) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(file) = lookup(ENV_DB_FILE) {
            self.db_file = file;
        }
        if let Some(raw) = lookup(ENV_MAX_CONNECTIONS) {
            match raw.parse() {
                Ok(n) => self.max_connections = n,
                Err(_) => warn!(value = %raw, "ignoring invalid {}", ENV_MAX_CONNECTIONS),
            }
        }
        if let Some(raw) = lookup(ENV_BUSY_TIMEOUT_SECS) {
            match raw.parse() {
                Ok(secs) => self.busy_timeout_secs = secs,
                Err(_) => warn!(value = %raw, "ignoring invalid {}", ENV_BUSY_TIMEOUT_SECS),
            }
        }
        self
    }

    /// Builder-style data directory override.
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    /// Full path of the database file.
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(&self.db_file)
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_secs(self.busy_timeout_secs)
    }
}
