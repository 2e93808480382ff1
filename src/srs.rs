//! Spaced-repetition store for one language.
//!
//! The in-memory table is the source of truth. Every mutation is written
//! behind to `srs/<language>/<character>` and keeps one [`OrderedIndex`] per
//! skill in step with the table. Writes of one store reach the durable
//! backend in the order they were applied in memory.

use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::clock::{Clock, Millis};
use crate::error::{Result, StoreError};
use crate::keys::Namespace;
use crate::ordered::{IndexEntry, Indexed, OrderedIndex, RankStrategy};
use crate::skill::{SkillKind, SrsData};
use crate::store::KeyValueStore;

/// How a skill index orders characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecencyRank {
    /// By the character's overall `last_updated`.
    Classic,
    /// By one skill's own `last_updated`.
    Skill(SkillKind),
}

impl RecencyRank {
    /// Whether updating `kind` changes the rank key this strategy computes.
    pub fn depends_on(&self, kind: SkillKind) -> bool {
        match self {
            RecencyRank::Classic => true,
            RecencyRank::Skill(own) => *own == kind,
        }
    }
}

impl RankStrategy<SrsData> for RecencyRank {
    type Key = Millis;

    fn rank_key(&self, item: &SrsData) -> Millis {
        match self {
            RecencyRank::Classic => item.last_updated,
            RecencyRank::Skill(kind) => item.skill(*kind).last_updated,
        }
    }
}

impl Indexed for SrsData {
    fn index_id(&self) -> &str {
        &self.character
    }
}

pub type SkillIndex = OrderedIndex<SrsData, RecencyRank>;

struct SrsState {
    table: HashMap<String, SrsData>,
    indexes: BTreeMap<SkillKind, SkillIndex>,
}

impl SrsState {
    fn rebuild(&mut self, kind: SkillKind, strategy: RecencyRank) {
        let index = OrderedIndex::with_items(strategy, self.table.values());
        self.indexes.insert(kind, index);
    }

    fn rebuild_all(&mut self) {
        let strategies: Vec<(SkillKind, RecencyRank)> = self
            .indexes
            .iter()
            .map(|(kind, index)| (*kind, *index.strategy()))
            .collect();
        for (kind, strategy) in strategies {
            self.rebuild(kind, strategy);
        }
    }
}

/// Read every decodable SRS record of `language` from the durable store.
///
/// Entries that fail to decode are logged and left out.
pub async fn scan_srs<S>(kv: &S, language: &str) -> Result<HashMap<String, SrsData>>
where
    S: KeyValueStore + ?Sized,
{
    let namespace = Namespace::srs(language)?;
    let (lower, upper) = namespace.range();
    let mut records = HashMap::new();

    for (key, value) in kv.iterate_range(&lower, &upper).await? {
        let Some(character) = namespace.strip(&key) else {
            warn!(key = %String::from_utf8_lossy(&key), "skipping non-UTF-8 SRS key");
            continue;
        };

        match serde_json::from_slice::<SrsData>(&value) {
            Ok(mut data) => {
                if data.character != character {
                    warn!(%character, stored = %data.character, "SRS record names another character");
                    data.character = character.clone();
                }
                records.insert(character, data);
            }
            Err(e) => warn!(%language, %character, error = %e, "skipping undecodable SRS record"),
        }
    }

    debug!(%language, count = records.len(), "scanned SRS records");
    Ok(records)
}

/// SRS table and rank indexes of one language.
pub struct SrsStore<S: KeyValueStore> {
    kv: Arc<S>,
    clock: Arc<dyn Clock>,
    namespace: Namespace,
    state: RwLock<SrsState>,
    // Held from mutation until its write-behind lands.
    write_order: Mutex<()>,
}

impl<S: KeyValueStore> SrsStore<S> {
    /// Create an empty store with one classic-ranked index per skill.
    pub fn setup(kv: Arc<S>, language: &str, clock: Arc<dyn Clock>) -> Result<Self> {
        let namespace = Namespace::srs(language)?;
        let indexes = SkillKind::ALL
            .into_iter()
            .map(|kind| (kind, OrderedIndex::new(RecencyRank::Classic)))
            .collect();

        Ok(Self {
            kv,
            clock,
            namespace,
            state: RwLock::new(SrsState {
                table: HashMap::new(),
                indexes,
            }),
            write_order: Mutex::new(()),
        })
    }

    /// Rank `kind`'s index with `strategy`, rebuilding it from the table.
    pub fn with_ranking(self, kind: SkillKind, strategy: RecencyRank) -> Self {
        self.state.write().rebuild(kind, strategy);
        self
    }

    pub fn language(&self) -> &str {
        self.namespace.language()
    }

    /// Bulk-load this language's records and rebuild every index.
    ///
    /// Returns the number of records loaded.
    pub async fn load_srs(&self) -> Result<usize> {
        let _order = self.write_order.lock().await;
        let records = scan_srs(&*self.kv, self.language()).await?;
        let count = records.len();

        let mut state = self.state.write();
        state.table.extend(records);
        state.rebuild_all();

        info!(language = %self.language(), count, "loaded SRS table");
        Ok(count)
    }

    /// Register a character seen for the first time.
    ///
    /// Returns false if the character was already known. The record is
    /// written first and only ranked once the write succeeded, so a failed
    /// registration can be retried.
    pub async fn insert_new(&self, character: &str) -> Result<bool> {
        if character.is_empty() {
            return Err(StoreError::InvalidKey("character cannot be empty".to_string()));
        }

        let _order = self.write_order.lock().await;
        if self.state.read().table.contains_key(character) {
            return Ok(false);
        }

        let data = SrsData::new(character, self.clock.now_millis());
        self.persist(&data).await?;

        let mut state = self.state.write();
        for index in state.indexes.values_mut() {
            index.insert(&data);
        }
        state.table.insert(character.to_string(), data);
        Ok(true)
    }

    /// Set `kind`'s level for `character` and move it in the rank indexes.
    ///
    /// Returns false for an unknown character.
    pub async fn update_skill(&self, character: &str, kind: SkillKind, level: u32) -> Result<bool> {
        let _order = self.write_order.lock().await;
        let updated = {
            let mut guard = self.state.write();
            let SrsState { table, indexes } = &mut *guard;

            let Some(data) = table.get_mut(character) else {
                return Ok(false);
            };

            // Erase with the pre-mutation key, insert with the new one.
            let affected: Vec<SkillKind> = indexes
                .iter()
                .filter(|(_, index)| index.strategy().depends_on(kind))
                .map(|(skill, _)| *skill)
                .collect();

            for skill in &affected {
                if let Some(index) = indexes.get_mut(skill) {
                    if !index.erase(data) {
                        warn!(%character, index = %skill, "no index entry to erase");
                    }
                }
            }

            data.set_skill_level(kind, level, self.clock.now_millis());

            for skill in &affected {
                if let Some(index) = indexes.get_mut(skill) {
                    index.insert(data);
                }
            }
            data.clone()
        };

        self.persist(&updated).await?;
        Ok(true)
    }

    /// Durable copy of the whole SRS table for this language.
    pub async fn get_question(&self) -> Result<HashMap<String, SrsData>> {
        scan_srs(&*self.kv, self.language()).await
    }

    pub fn get(&self, character: &str) -> Option<SrsData> {
        self.state.read().table.get(character).cloned()
    }

    pub fn len(&self) -> usize {
        self.state.read().table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().table.is_empty()
    }

    /// Zero-based rank of `character` in `kind`'s index.
    pub fn order_of(&self, kind: SkillKind, character: &str) -> Option<usize> {
        let state = self.state.read();
        let data = state.table.get(character)?;
        state.indexes.get(&kind)?.order_of_key(data)
    }

    /// Entry at `rank` in `kind`'s index.
    pub fn find_by_order(&self, kind: SkillKind, rank: usize) -> Option<IndexEntry<Millis>> {
        let state = self.state.read();
        state.indexes.get(&kind)?.find_by_order(rank).cloned()
    }

    /// Up to `limit` characters of `kind`'s index, least recently updated first.
    pub fn review_queue(&self, kind: SkillKind, limit: usize) -> Vec<String> {
        let state = self.state.read();
        state
            .indexes
            .get(&kind)
            .map(|index| {
                index
                    .iter()
                    .take(limit)
                    .map(|entry| entry.character.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of entries in `kind`'s index.
    pub fn index_len(&self, kind: SkillKind) -> usize {
        self.state
            .read()
            .indexes
            .get(&kind)
            .map_or(0, |index| index.len())
    }

    async fn persist(&self, data: &SrsData) -> Result<()> {
        let key = self.namespace.key(&data.character);
        self.kv.put_json(&key, data).await.map_err(|e| {
            warn!(character = %data.character, error = %e, "SRS write-behind failed");
            e
        })
    }
}
