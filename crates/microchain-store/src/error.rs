//! Error types for the store module.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failure reported by the storage backend.
    #[error("backend error: {0}")]
    Backend(String),

    /// Record serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A writer panicked while holding the store lock.
    #[error("store lock poisoned")]
    Poisoned,
}

impl From<microchain_core::CoreError> for StoreError {
    fn from(e: microchain_core::CoreError) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
