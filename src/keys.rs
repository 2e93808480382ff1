//! Key layout.
//!
//! ```text
//! <language>/<contentKey>       generic learning records
//! srs/<language>/<character>    spaced-repetition records
//! ```
//!
//! A prefix scan covers `[prefix, prefix ++ 0xFF)`.

use crate::error::{Result, StoreError};
use crate::store::MAX_SENTINEL;

/// First path segment of every SRS key.
pub const SRS_NAMESPACE: &str = "srs";

/// Reject language tags that would escape or alias a namespace.
pub fn validate_language(language: &str) -> Result<()> {
    if language.is_empty() {
        return Err(StoreError::InvalidLanguage(
            "language cannot be empty".to_string(),
        ));
    }
    if language.contains('/') {
        return Err(StoreError::InvalidLanguage(format!(
            "language {:?} contains '/'",
            language
        )));
    }
    if language == SRS_NAMESPACE {
        return Err(StoreError::InvalidLanguage(format!(
            "language {:?} is reserved",
            language
        )));
    }
    Ok(())
}

/// A per-language key space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Namespace {
    /// Generic content records of one language.
    Content(String),
    /// SRS records of one language.
    Srs(String),
}

impl Namespace {
    pub fn content(language: &str) -> Result<Self> {
        validate_language(language)?;
        Ok(Namespace::Content(language.to_string()))
    }

    pub fn srs(language: &str) -> Result<Self> {
        validate_language(language)?;
        Ok(Namespace::Srs(language.to_string()))
    }

    pub fn language(&self) -> &str {
        match self {
            Namespace::Content(lang) | Namespace::Srs(lang) => lang,
        }
    }

    /// The literal prefix shared by every key in this namespace.
    pub fn prefix(&self) -> String {
        match self {
            Namespace::Content(lang) => format!("{}/", lang),
            Namespace::Srs(lang) => format!("{}/{}/", SRS_NAMESPACE, lang),
        }
    }

    /// Full store key for `item`.
    pub fn key(&self, item: &str) -> Vec<u8> {
        let mut key = self.prefix().into_bytes();
        key.extend_from_slice(item.as_bytes());
        key
    }

    /// Half-open bounds covering exactly this namespace.
    pub fn range(&self) -> (Vec<u8>, Vec<u8>) {
        let lower = self.prefix().into_bytes();
        let mut upper = lower.clone();
        upper.push(MAX_SENTINEL);
        (lower, upper)
    }

    /// Recover the item name from a full key, if the key belongs here.
    pub fn strip(&self, key: &[u8]) -> Option<String> {
        let prefix = self.prefix();
        let rest = key.strip_prefix(prefix.as_bytes())?;
        String::from_utf8(rest.to_vec()).ok()
    }
}
