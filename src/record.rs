//! Learning record encoding.
//!
//! Current format: `{"level": <n>, "updTime": <epoch-ms>}`.
//! Legacy format: the level as a bare integer, with no timestamp.

use serde::{Deserialize, Serialize};

use crate::clock::Millis;
use crate::error::{Result, StoreError};

/// Mastery of one piece of content in one language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearningRecord {
    pub level: u32,
    #[serde(rename = "updTime")]
    pub updated_at: Millis,
}

impl LearningRecord {
    pub fn new(level: u32, updated_at: Millis) -> Self {
        Self { level, updated_at }
    }

    /// True when `other` is strictly further along than `self`.
    pub fn is_improved_by(&self, other: &LearningRecord) -> bool {
        self.level < other.level
    }
}

/// Outcome of decoding a stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoded {
    /// Value was already in the structured format.
    Current(LearningRecord),
    /// Value was a legacy bare integer; the record carries a fresh timestamp
    /// and should be written back.
    Legacy(LearningRecord),
}

impl Decoded {
    pub fn record(&self) -> LearningRecord {
        match self {
            Decoded::Current(record) | Decoded::Legacy(record) => *record,
        }
    }

    pub fn needs_migration(&self) -> bool {
        matches!(self, Decoded::Legacy(_))
    }
}

pub fn encode(record: &LearningRecord) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(record)?)
}

/// Decode a stored value, falling back to the legacy format.
///
/// `now` becomes the timestamp of a legacy value, which never carried one.
pub fn decode(key: &str, raw: &[u8], now: Millis) -> Result<Decoded> {
    if let Ok(record) = serde_json::from_slice::<LearningRecord>(raw) {
        return Ok(Decoded::Current(record));
    }

    let text = std::str::from_utf8(raw).map_err(|e| StoreError::decode(key, e))?;
    let level = text
        .trim()
        .parse::<u32>()
        .map_err(|e| StoreError::decode(key, format!("neither record nor level: {}", e)))?;

    Ok(Decoded::Legacy(LearningRecord::new(level, now)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_uses_wire_field_names() {
        let bytes = encode(&LearningRecord::new(2, 1_700_000_000_000)).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["level"], 2);
        assert_eq!(value["updTime"], 1_700_000_000_000u64);
    }

    #[test]
    fn test_decode_structured() {
        let decoded = decode("ja/x", br#"{"level":4,"updTime":99}"#, 1).unwrap();
        assert_eq!(decoded, Decoded::Current(LearningRecord::new(4, 99)));
        assert!(!decoded.needs_migration());
    }

    #[test]
    fn test_decode_legacy_integer() {
        let decoded = decode("ja/x", b"3", 12_345).unwrap();
        assert_eq!(decoded, Decoded::Legacy(LearningRecord::new(3, 12_345)));
        assert!(decoded.needs_migration());

        let padded = decode("ja/x", b" 7\n", 1).unwrap();
        assert_eq!(padded.record().level, 7);
    }

    #[test]
    fn test_decode_missing_field_falls_back_and_fails() {
        let err = decode("ja/x", br#"{"level":4}"#, 1).unwrap_err();
        assert!(matches!(err, StoreError::Decode { .. }));
    }

    #[test]
    fn test_decode_non_numeric_field_fails() {
        let err = decode("ja/x", br#"{"level":"4","updTime":1}"#, 1).unwrap_err();
        assert!(matches!(err, StoreError::Decode { .. }));
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(decode("ja/x", b"not-a-level", 1).is_err());
        assert!(decode("ja/x", &[0xc3, 0x28], 1).is_err());
        assert!(decode("ja/x", b"-1", 1).is_err());
    }

    #[test]
    fn test_strict_improvement() {
        let stored = LearningRecord::new(2, 10);
        assert!(stored.is_improved_by(&LearningRecord::new(3, 5)));
        assert!(!stored.is_improved_by(&LearningRecord::new(2, 20)));
        assert!(!stored.is_improved_by(&LearningRecord::new(1, 20)));
    }
}
