//! Boundary facade for the request/response bridge.
//!
//! Every operation here absorbs internal failures: loads return an empty map
//! and writes return `false`, with the cause logged. Callers never see a raw
//! store error and never touch the SRS table or its indexes directly.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info};

use crate::clock::{Clock, Millis, SystemClock};
use crate::config::StoreConfig;
use crate::content::ContentStore;
use crate::error::Result;
use crate::keys::Namespace;
use crate::ordered::IndexEntry;
use crate::record::LearningRecord;
use crate::skill::{SkillKind, SrsData};
use crate::sqlite::SqliteStore;
use crate::srs::{scan_srs, SrsStore};
use crate::store::KeyValueStore;

/// Owns the shared store handle and the per-language SRS contexts.
pub struct StoreGateway<S: KeyValueStore + 'static> {
    kv: Arc<S>,
    clock: Arc<dyn Clock>,
    content: ContentStore<S>,
    srs: RwLock<HashMap<String, Arc<SrsStore<S>>>>,
}

impl StoreGateway<SqliteStore> {
    /// Open the durable store described by `config`.
    ///
    /// An error here means the process has no persistence and should not
    /// continue.
    pub async fn open(config: &StoreConfig) -> Result<Self> {
        tokio::fs::create_dir_all(&config.data_dir).await?;
        let kv = SqliteStore::open_config(config).await?;
        info!(path = ?config.db_path(), "learning store ready");
        Ok(Self::new(Arc::new(kv), Arc::new(SystemClock)))
    }

    pub async fn close(&self) {
        self.kv.close().await;
    }
}

impl<S: KeyValueStore + 'static> StoreGateway<S> {
    pub fn new(kv: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        let content = ContentStore::new(kv.clone(), clock.clone());
        Self {
            kv,
            clock,
            content,
            srs: RwLock::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.kv
    }

    /// All learning records of `language`; empty on failure.
    pub async fn load_learning_state(&self, language: &str) -> HashMap<String, LearningRecord> {
        self.content.load(language).await.unwrap_or_else(|e| {
            error!(%language, error = %e, "error loading learning state");
            HashMap::new()
        })
    }

    pub async fn update_content(
        &self,
        content_key: &str,
        language: &str,
        record: &LearningRecord,
    ) -> bool {
        match self.content.update(content_key, language, record).await {
            Ok(()) => true,
            Err(e) => {
                error!(%content_key, %language, error = %e, "error updating content");
                false
            }
        }
    }

    /// Apply a batch with the strict-improvement rule. False if any entry failed.
    pub async fn update_content_batch(
        &self,
        records: &HashMap<String, LearningRecord>,
        language: &str,
    ) -> bool {
        match self.content.update_batch(records, language).await {
            Ok(outcome) => outcome.is_success(),
            Err(e) => {
                error!(%language, error = %e, "error updating content batch");
                false
            }
        }
    }

    /// Overwrite the durable SRS record of `character`.
    ///
    /// Loaded SRS tables and their indexes are not touched.
    pub async fn update_srs_content(&self, character: &str, language: &str, data: &SrsData) -> bool {
        if character.is_empty() {
            return false;
        }

        let result = match Namespace::srs(language) {
            Ok(namespace) => self.kv.put_json(&namespace.key(character), data).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => true,
            Err(e) => {
                error!(%character, %language, error = %e, "error updating SRS content");
                false
            }
        }
    }

    /// Durable SRS table of `language`; empty on failure.
    pub async fn get_question(&self, language: &str) -> HashMap<String, SrsData> {
        scan_srs(&*self.kv, language).await.unwrap_or_else(|e| {
            error!(%language, error = %e, "error loading SRS state");
            HashMap::new()
        })
    }

    /// The loaded SRS context of `language`, created and loaded on first use.
    pub async fn srs(&self, language: &str) -> Result<Arc<SrsStore<S>>> {
        let loaded = self.srs.read().get(language).cloned();
        if let Some(existing) = loaded {
            return Ok(existing);
        }

        let fresh = SrsStore::setup(self.kv.clone(), language, self.clock.clone())?;
        fresh.load_srs().await?;

        // Another caller may have loaded the same language meanwhile.
        let mut contexts = self.srs.write();
        let context = contexts
            .entry(language.to_string())
            .or_insert_with(|| Arc::new(fresh));
        Ok(context.clone())
    }

    /// Start tracking `character`. True if it is tracked afterwards.
    pub async fn register_character(&self, language: &str, character: &str) -> bool {
        let result = match self.srs(language).await {
            Ok(srs) => srs.insert_new(character).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(_) => true,
            Err(e) => {
                error!(%character, %language, error = %e, "error registering character");
                false
            }
        }
    }

    /// Record a new level for one skill of a tracked character.
    ///
    /// False for unknown skills, unknown characters and store failures.
    pub async fn record_skill(&self, language: &str, character: &str, skill: &str, level: u32) -> bool {
        let kind = match skill.parse::<SkillKind>() {
            Ok(kind) => kind,
            Err(e) => {
                error!(%character, %language, %skill, error = %e, "error recording skill");
                return false;
            }
        };
        let result = match self.srs(language).await {
            Ok(srs) => srs.update_skill(character, kind, level).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(updated) => updated,
            Err(e) => {
                error!(%character, %language, %skill, error = %e, "error recording skill");
                false
            }
        }
    }

    /// Recency rank of `character` in `skill`'s index.
    pub async fn review_rank(&self, language: &str, skill: SkillKind, character: &str) -> Option<usize> {
        match self.srs(language).await {
            Ok(srs) => srs.order_of(skill, character),
            Err(e) => {
                error!(%language, error = %e, "error loading SRS context");
                None
            }
        }
    }

    /// Entry at `rank` in `skill`'s index.
    pub async fn review_at(
        &self,
        language: &str,
        skill: SkillKind,
        rank: usize,
    ) -> Option<IndexEntry<Millis>> {
        match self.srs(language).await {
            Ok(srs) => srs.find_by_order(skill, rank),
            Err(e) => {
                error!(%language, error = %e, "error loading SRS context");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::memory::MemoryStore;
    use crate::testing::FlakyStore;

    fn gateway(now: u64) -> (Arc<ManualClock>, StoreGateway<MemoryStore>) {
        let clock = Arc::new(ManualClock::new(now));
        let gateway = StoreGateway::new(Arc::new(MemoryStore::new()), clock.clone());
        (clock, gateway)
    }

    #[tokio::test]
    async fn test_update_and_load() {
        let (_clock, gw) = gateway(1);
        let record = LearningRecord::new(2, 1_700_000_000_000);

        assert!(gw.update_content("食べる", "ja", &record).await);
        let state = gw.load_learning_state("ja").await;
        assert_eq!(state.get("食べる"), Some(&record));
    }

    #[tokio::test]
    async fn test_prefix_isolation() {
        let (_clock, gw) = gateway(1);
        assert!(gw.update_content("x", "ja", &LearningRecord::new(1, 1)).await);
        assert!(gw.update_content("x", "zh", &LearningRecord::new(9, 9)).await);

        let state = gw.load_learning_state("ja").await;
        assert_eq!(state.len(), 1);
        assert_eq!(state["x"].level, 1);
    }

    #[tokio::test]
    async fn test_failures_become_false_or_empty() {
        let (_clock, gw) = gateway(1);

        assert!(gw.load_learning_state("").await.is_empty());
        assert!(gw.get_question("a/b").await.is_empty());
        assert!(!gw.update_content("x", "srs", &LearningRecord::new(1, 1)).await);
        assert!(!gw.update_content_batch(&HashMap::new(), "").await);
        assert!(!gw.record_skill("ja", "水", "reading", 1).await);
    }

    #[tokio::test]
    async fn test_empty_keys() {
        let (_clock, gw) = gateway(1);
        assert!(gw.update_content("", "ja", &LearningRecord::new(1, 1)).await);
        assert!(!gw.update_srs_content("", "ja", &SrsData::new("", 1)).await);
        assert!(gw.store().is_empty());
    }

    #[tokio::test]
    async fn test_batch_scenario() {
        let (_clock, gw) = gateway(1);
        let first = HashMap::from([("食べる".to_string(), LearningRecord::new(2, 10))]);
        let second = HashMap::from([("食べる".to_string(), LearningRecord::new(1, 20))]);

        assert!(gw.update_content_batch(&first, "ja").await);
        assert!(gw.update_content_batch(&second, "ja").await);

        assert_eq!(gw.load_learning_state("ja").await["食べる"].level, 2);
    }

    #[tokio::test]
    async fn test_update_srs_content_is_raw_overwrite() {
        let (_clock, gw) = gateway(1);
        assert!(gw.register_character("ja", "水").await);

        let mut replacement = SrsData::new("水", 50);
        replacement.set_skill_level(SkillKind::Writing, 5, 60);
        assert!(gw.update_srs_content("水", "ja", &replacement).await);

        let durable = gw.get_question("ja").await;
        assert_eq!(durable["水"], replacement);

        let srs = gw.srs("ja").await.unwrap();
        assert_eq!(srs.get("水").unwrap().skill(SkillKind::Writing).level, 0);
    }

    #[tokio::test]
    async fn test_srs_flow_through_gateway() {
        let (clock, gw) = gateway(100);
        assert!(gw.register_character("ja", "水").await);
        clock.advance(1);
        assert!(gw.register_character("ja", "火").await);
        assert!(gw.register_character("ja", "水").await);

        assert_eq!(gw.review_rank("ja", SkillKind::Writing, "水").await, Some(0));

        clock.advance(1);
        assert!(gw.record_skill("ja", "水", "writing", 3).await);
        assert!(!gw.record_skill("ja", "木", "writing", 3).await);

        assert_eq!(gw.review_rank("ja", SkillKind::Writing, "水").await, Some(1));
        let first = gw.review_at("ja", SkillKind::Writing, 0).await.unwrap();
        assert_eq!(first.character, "火");
        assert!(gw.review_at("ja", SkillKind::Writing, 2).await.is_none());

        let durable = gw.get_question("ja").await;
        assert_eq!(durable["水"].skill(SkillKind::Writing).level, 3);
        assert!(gw.get_question("zh").await.is_empty());
    }

    #[tokio::test]
    async fn test_srs_context_loads_existing_records() {
        let kv = Arc::new(MemoryStore::new());
        kv.put_json("srs/ja/水".as_bytes(), &SrsData::new("水", 5))
            .await
            .unwrap();

        let gw = StoreGateway::new(kv, Arc::new(ManualClock::new(10)));
        assert_eq!(gw.review_rank("ja", SkillKind::Translation, "水").await, Some(0));

        let again = gw.srs("ja").await.unwrap();
        assert!(Arc::ptr_eq(&again, &gw.srs("ja").await.unwrap()));
    }

    #[tokio::test]
    async fn test_unknown_skill_does_not_load_context() {
        let (_clock, gw) = gateway(1);
        assert!(!gw.record_skill("ja", "水", "reading", 1).await);
        assert!(gw.srs.read().is_empty());
    }

    #[tokio::test]
    async fn test_register_retries_after_failed_write() {
        let kv = Arc::new(FlakyStore::default());
        let gw = StoreGateway::new(kv.clone(), Arc::new(ManualClock::new(1)));

        kv.set_failing(true);
        assert!(!gw.register_character("ja", "水").await);

        kv.set_failing(false);
        assert!(gw.register_character("ja", "水").await);
        assert!(gw.get_question("ja").await.contains_key("水"));
        assert!(gw.record_skill("ja", "水", "writing", 2).await);
    }

    #[tokio::test]
    async fn test_open_sqlite_gateway() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig::default().with_data_dir(dir.path().join("nested"));

        let gw = StoreGateway::open(&config).await.unwrap();
        assert!(gw.update_content("x", "ja", &LearningRecord::new(1, 2)).await);
        gw.close().await;

        let gw = StoreGateway::open(&config).await.unwrap();
        assert_eq!(
            gw.load_learning_state("ja").await.get("x"),
            Some(&LearningRecord::new(1, 2))
        );
        gw.close().await;
    }
}
