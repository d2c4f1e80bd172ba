//! Core error types for Sugesto.

use thiserror::Error;

/// Core error type for Sugesto operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Tool identifier is empty or otherwise unusable as a storage key.
    #[error("Invalid tool identifier: {0:?}")]
    InvalidToolId(String),

    /// Invalid data, either from storage or from an API response.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// The backing store could not be read or written.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}
