//! KeyValueStore trait - the core abstraction for all storage backends.
//!
//! - Keys: opaque, non-empty byte strings ordered lexicographically by byte
//! - Values: opaque bytes, written whole
//! - Core operations: get, put, range iteration over `[lower, upper)`

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

use crate::error::{Result, StoreError};

/// Maximum key length in bytes.
pub const MAX_KEY_LENGTH: usize = 1024;

/// Byte that never occurs inside a legal key.
///
/// `0xFF` is not valid anywhere in UTF-8, so appending it to a prefix yields an
/// upper bound greater than every key sharing that prefix.
pub const MAX_SENTINEL: u8 = 0xFF;

/// A finite, single-pass, ascending sequence of `(key, value)` pairs.
#[derive(Debug)]
pub struct RangeScan {
    inner: std::vec::IntoIter<(Vec<u8>, Vec<u8>)>,
}

impl RangeScan {
    pub(crate) fn new(pairs: Vec<(Vec<u8>, Vec<u8>)>) -> Self {
        Self {
            inner: pairs.into_iter(),
        }
    }
}

impl Iterator for RangeScan {
    type Item = (Vec<u8>, Vec<u8>);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for RangeScan {}

/// Validate that a key is well-formed.
pub fn validate_key(key: &[u8]) -> Result<()> {
    if key.is_empty() {
        return Err(StoreError::InvalidKey("key cannot be empty".to_string()));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(StoreError::InvalidKey(format!(
            "key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        )));
    }
    if key.contains(&MAX_SENTINEL) {
        return Err(StoreError::InvalidKey(
            "key contains the reserved 0xFF byte".to_string(),
        ));
    }
    Ok(())
}

/// The core key-value storage trait.
///
/// Both backends (SQLite, memory) implement this trait. Individual `get`/`put`
/// calls are serialized by the backend; sequences of calls are not atomic.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Get the value stored under `key`.
    ///
    /// Returns `None` if the key does not exist.
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Get a value and deserialize it as JSON.
    async fn get_json<T: DeserializeOwned + Send>(&self, key: &[u8]) -> Result<Option<T>> {
        match self.get(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Store `value` under `key`, replacing any previous value.
    async fn put(&self, key: &[u8], value: Vec<u8>) -> Result<()>;

    /// Store a JSON-encoded value.
    async fn put_json<T: Serialize + Send + Sync>(&self, key: &[u8], value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        self.put(key, bytes).await
    }

    /// Iterate all entries with `lower <= key < upper` in ascending key order.
    async fn iterate_range(&self, lower: &[u8], upper: &[u8]) -> Result<RangeScan>;

    /// Check if a key exists.
    async fn exists(&self, key: &[u8]) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key_valid() {
        assert!(validate_key(b"ja/x").is_ok());
        assert!(validate_key("srs/ja/水".as_bytes()).is_ok());
    }

    #[test]
    fn test_validate_key_empty() {
        let err = validate_key(b"").unwrap_err();
        assert!(matches!(err, StoreError::InvalidKey(_)));
    }

    #[test]
    fn test_validate_key_sentinel() {
        let err = validate_key(&[b'j', b'a', MAX_SENTINEL]).unwrap_err();
        assert!(matches!(err, StoreError::InvalidKey(_)));
    }

    #[test]
    fn test_validate_key_too_long() {
        let key = vec![b'a'; MAX_KEY_LENGTH + 1];
        let err = validate_key(&key).unwrap_err();
        assert!(matches!(err, StoreError::InvalidKey(_)));
    }

    #[test]
    fn test_range_scan_is_single_pass() {
        let mut scan = RangeScan::new(vec![
            (b"a".to_vec(), b"1".to_vec()),
            (b"b".to_vec(), b"2".to_vec()),
        ]);
        assert_eq!(scan.len(), 2);
        assert_eq!(scan.next().map(|(k, _)| k), Some(b"a".to_vec()));
        assert_eq!(scan.next().map(|(k, _)| k), Some(b"b".to_vec()));
        assert!(scan.next().is_none());
    }
}
