//! # learning-store
//!
//! Per-user learning-progress store for a spaced-repetition vocabulary and
//! character tracker.
//!
//! - **Prefix-partitioned keys**: `<language>/<content>` and `srs/<language>/<character>`
//! - **Monotonic batches**: a stored level is only ever raised
//! - **Lazy migration**: legacy bare-integer values are upgraded on first read
//! - **Recency ranking**: one order-statistics index per skill, O(log n) rank/select
//!
//! ## Backends
//!
//! - [`SqliteStore`]: Embedded SQLite database (default, durable)
//! - [`MemoryStore`]: In-memory store (testing and development)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use learning_store::{LearningRecord, StoreConfig, StoreGateway};
//!
//! #[tokio::main]
//! async fn main() -> learning_store::Result<()> {
//!     let gateway = StoreGateway::open(&StoreConfig::from_env()).await?;
//!
//!     gateway
//!         .update_content("食べる", "ja", &LearningRecord::new(2, 1_700_000_000_000))
//!         .await;
//!
//!     for (content, record) in gateway.load_learning_state("ja").await {
//!         println!("{}: level {}", content, record.level);
//!     }
//!
//!     gateway.close().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Spaced Repetition
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use learning_store::{MemoryStore, SkillKind, StoreGateway, SystemClock};
//!
//! #[tokio::main]
//! async fn main() {
//!     let gateway = StoreGateway::new(Arc::new(MemoryStore::new()), Arc::new(SystemClock));
//!
//!     gateway.register_character("ja", "水").await;
//!     gateway.record_skill("ja", "水", "writing", 3).await;
//!
//!     // Least recently practised character first.
//!     if let Some(entry) = gateway.review_at("ja", SkillKind::Writing, 0).await {
//!         println!("review {}", entry.character);
//!     }
//! }
//! ```

pub mod clock;
pub mod config;
pub mod content;
pub mod error;
pub mod gateway;
pub mod keys;
pub mod memory;
pub mod ordered;
pub mod record;
pub mod skill;
pub mod sqlite;
pub mod srs;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

// Re-export main types
pub use clock::{Clock, ManualClock, Millis, SystemClock};
pub use config::StoreConfig;
pub use content::{BatchOutcome, ContentStore};
pub use error::{Result, StoreError};
pub use gateway::StoreGateway;
pub use keys::Namespace;
pub use memory::MemoryStore;
pub use ordered::{IndexEntry, Indexed, OrderedIndex, RankStrategy};
pub use record::LearningRecord;
pub use skill::{Skill, SkillKind, SkillSet, SrsData};
pub use sqlite::SqliteStore;
pub use srs::{RecencyRank, SrsStore};
pub use store::{KeyValueStore, RangeScan, MAX_KEY_LENGTH};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{Result, StoreError};
    pub use crate::gateway::StoreGateway;
    pub use crate::memory::MemoryStore;
    pub use crate::record::LearningRecord;
    pub use crate::skill::{SkillKind, SrsData};
    pub use crate::sqlite::SqliteStore;
    pub use crate::store::KeyValueStore;
}
