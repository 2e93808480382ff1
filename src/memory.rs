//! In-memory key-value store implementation.
//!
//! This implementation is NOT durable - data is lost on process exit.
//! Use for testing and development only.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;

use crate::error::Result;
use crate::store::{validate_key, KeyValueStore, RangeScan};

/// In-memory implementation of KeyValueStore.
///
/// Uses a BTreeMap over raw bytes for ordered range iteration and RwLock for
/// concurrency. Cloning yields another handle to the same map.
#[derive(Clone)]
pub struct MemoryStore {
    data: Arc<RwLock<BTreeMap<Vec<u8>, Vec<u8>>>>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    /// Get the number of entries in the store.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Clear all entries.
    pub fn clear(&self) {
        self.data.write().clear();
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        validate_key(key)?;
        Ok(self.data.read().get(key).cloned())
    }

    async fn put(&self, key: &[u8], value: Vec<u8>) -> Result<()> {
        validate_key(key)?;
        self.data.write().insert(key.to_vec(), value);
        Ok(())
    }

    async fn iterate_range(&self, lower: &[u8], upper: &[u8]) -> Result<RangeScan> {
        if lower >= upper {
            return Ok(RangeScan::new(Vec::new()));
        }

        let data = self.data.read();
        let pairs = data
            .range::<[u8], _>((Bound::Included(lower), Bound::Excluded(upper)))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Ok(RangeScan::new(pairs))
    }
}
