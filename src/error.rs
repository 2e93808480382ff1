//! Error types for learning-store operations.
//!
//! Absent keys are not errors: lookups return `Ok(None)`.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Invalid key format.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Language tag cannot be used as a key namespace.
    #[error("invalid language: {0}")]
    InvalidLanguage(String),

    /// Stored value could not be decoded in any supported format.
    #[error("decode error for {key}: {reason}")]
    Decode { key: String, reason: String },

    /// Skill name is not one of the fixed skill names.
    #[error("unknown skill: {0}")]
    UnknownSkill(String),

    /// Cannot connect to or communicate with storage backend.
    #[error("connection error: {0}")]
    ConnectionError(String),

    /// Serialization or deserialization error.
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Database error from SQLx.
    #[error("database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    /// I/O error.
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

impl StoreError {
    /// Returns true if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StoreError::ConnectionError(_) | StoreError::DatabaseError(_) | StoreError::IoError(_)
        )
    }

    pub(crate) fn decode(key: impl Into<String>, reason: impl ToString) -> Self {
        StoreError::Decode {
            key: key.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::SerializationError(err.to_string())
    }
}
