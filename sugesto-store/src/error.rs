//! Store error types.

use sugesto_core::CoreError;
use thiserror::Error;

/// Errors that can occur in the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored value exists but does not parse.
    #[error("Corrupt value under {key:?}: {reason}")]
    Corrupt {
        /// Storage key.
        key: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unknown setting name passed to `config set`.
    #[error("Unknown setting: {0}")]
    UnknownSetting(String),
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Serialization(e) => CoreError::Serialization(e),
            StoreError::Corrupt { key, reason } => {
                CoreError::InvalidData(format!("{key}: {reason}"))
            }
            other => CoreError::Storage(other.to_string()),
        }
    }
}
