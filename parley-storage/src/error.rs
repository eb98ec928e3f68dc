//! Storage error types

use parley_api_types::ApiError;
use thiserror::Error;

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors surfaced by the scoped gateway and document stores
#[derive(Debug, Error)]
pub enum StorageError {
    /// A typed failure from the stable error taxonomy
    #[error(transparent)]
    Denied(#[from] ApiError),

    /// Entity could not be serialized or deserialized
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Backing store failed
    #[error("Store error: {message}")]
    Backend { message: String },
}

impl StorageError {
    pub fn serialization(message: impl Into<String>) -> Self {
        StorageError::Serialization {
            message: message.into(),
        }
    }

    pub fn backend(message: impl Into<String>) -> Self {
        StorageError::Backend {
            message: message.into(),
        }
    }

    /// The taxonomy code, when this is a typed denial
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            StorageError::Denied(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::serialization(err.to_string())
    }
}
