//! Generic per-content learning records.
//!
//! Keys live under `<language>/`. Loading upgrades legacy bare-integer values
//! in place; batch updates only ever raise a stored level.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::clock::Clock;
use crate::error::Result;
use crate::keys::Namespace;
use crate::record::{self, LearningRecord};
use crate::store::KeyValueStore;

/// Per-entry tally of a batch update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub written: usize,
    /// Entries whose stored level was already equal or higher.
    pub skipped: usize,
    pub failed: usize,
}

impl BatchOutcome {
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

pub struct ContentStore<S: KeyValueStore> {
    kv: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S: KeyValueStore + 'static> ContentStore<S> {
    pub fn new(kv: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self { kv, clock }
    }

    /// Every record of `language`, keyed by content.
    ///
    /// Legacy values are returned upgraded and rewritten by a detached task.
    /// Undecodable values are logged and left out.
    pub async fn load(&self, language: &str) -> Result<HashMap<String, LearningRecord>> {
        let namespace = Namespace::content(language)?;
        let (lower, upper) = namespace.range();
        let mut records = HashMap::new();

        for (key, value) in self.kv.iterate_range(&lower, &upper).await? {
            let Some(content) = namespace.strip(&key) else {
                warn!(key = %String::from_utf8_lossy(&key), "skipping non-UTF-8 content key");
                continue;
            };

            match record::decode(&content, &value, self.clock.now_millis()) {
                Ok(decoded) => {
                    if decoded.needs_migration() {
                        self.migrate(key, decoded.record());
                    }
                    records.insert(content, decoded.record());
                }
                Err(e) => warn!(%language, error = %e, "skipping undecodable learning record"),
            }
        }

        debug!(%language, count = records.len(), "loaded learning state");
        Ok(records)
    }

    /// Overwrite one record. An empty `content_key` is a successful no-op.
    pub async fn update(
        &self,
        content_key: &str,
        language: &str,
        record: &LearningRecord,
    ) -> Result<()> {
        if content_key.is_empty() {
            return Ok(());
        }

        let key = Namespace::content(language)?.key(content_key);
        self.kv.put(&key, record::encode(record)?).await
    }

    /// Write each record that is new or strictly raises the stored level.
    ///
    /// Entries are independent: a failure is counted and the batch moves on.
    /// A failed or undecodable read counts as an absent record. The
    /// read-compare-write of one entry is not atomic with respect to other
    /// writers of the same key.
    pub async fn update_batch(
        &self,
        records: &HashMap<String, LearningRecord>,
        language: &str,
    ) -> Result<BatchOutcome> {
        let namespace = Namespace::content(language)?;
        let mut outcome = BatchOutcome::default();

        for (content, incoming) in records {
            if content.is_empty() {
                continue;
            }
            let key = namespace.key(content);

            let existing = match self.kv.get(&key).await {
                Ok(Some(raw)) => match record::decode(content, &raw, self.clock.now_millis()) {
                    Ok(decoded) => Some(decoded.record()),
                    Err(e) => {
                        warn!(%content, error = %e, "overwriting undecodable record");
                        None
                    }
                },
                Ok(None) => None,
                Err(e) => {
                    warn!(%content, error = %e, "read failed, treating record as absent");
                    None
                }
            };

            if let Some(stored) = existing {
                if !stored.is_improved_by(incoming) {
                    outcome.skipped += 1;
                    continue;
                }
            }

            let written = match record::encode(incoming) {
                Ok(bytes) => self.kv.put(&key, bytes).await,
                Err(e) => Err(e),
            };
            match written {
                Ok(()) => outcome.written += 1,
                Err(e) => {
                    error!(%content, %language, error = %e, "batch entry write failed");
                    outcome.failed += 1;
                }
            }
        }

        debug!(%language, ?outcome, "applied learning batch");
        Ok(outcome)
    }

    // Fire-and-forget rewrite in the structured format.
    fn migrate(&self, key: Vec<u8>, upgraded: LearningRecord) {
        let kv = self.kv.clone();
        let write = async move {
            let result = match record::encode(&upgraded) {
                Ok(bytes) => kv.put(&key, bytes).await,
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                warn!(key = %String::from_utf8_lossy(&key), error = %e, "legacy record migration failed");
            }
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(write);
            }
            Err(_) => warn!("no async runtime, legacy record left unmigrated"),
        }
    }
}
