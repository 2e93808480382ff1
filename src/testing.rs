//! Store wrappers that misbehave on demand.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

use crate::error::{Result, StoreError};
use crate::memory::MemoryStore;
use crate::store::{KeyValueStore, RangeScan};

/// Fails every `put` while `failing` is set.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    failing: AtomicBool,
}

impl FlakyStore {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl KeyValueStore for FlakyStore {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.inner.get(key).await
    }

    async fn put(&self, key: &[u8], value: Vec<u8>) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::ConnectionError("store offline".to_string()));
        }
        self.inner.put(key, value).await
    }

    async fn iterate_range(&self, lower: &[u8], upper: &[u8]) -> Result<RangeScan> {
        self.inner.iterate_range(lower, upper).await
    }
}

/// Once armed, holds the next `put` until [`GatedStore::release`] is called.
#[derive(Default)]
pub struct GatedStore {
    pub inner: MemoryStore,
    gate: Notify,
    armed: AtomicBool,
}

impl GatedStore {
    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    pub fn release(&self) {
        self.gate.notify_one();
    }
}

#[async_trait]
impl KeyValueStore for GatedStore {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.inner.get(key).await
    }

    async fn put(&self, key: &[u8], value: Vec<u8>) -> Result<()> {
        if self.armed.swap(false, Ordering::SeqCst) {
            self.gate.notified().await;
        }
        self.inner.put(key, value).await
    }

    async fn iterate_range(&self, lower: &[u8], upper: &[u8]) -> Result<RangeScan> {
        self.inner.iterate_range(lower, upper).await
    }
}
