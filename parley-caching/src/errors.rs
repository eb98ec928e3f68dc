//! Cache error types

use thiserror::Error;

/// Result type for cache operations
pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Cache-related errors
#[derive(Debug, Error)]
pub enum CacheError {
    /// Cache capacity exceeded
    #[error("Cache capacity exceeded: {0}")]
    CapacityExceeded(String),

    /// Lock acquisition failed
    #[error("Failed to acquire cache lock: {0}")]
    LockError(String),

    /// Invalid configuration
    #[error("Invalid cache configuration: {0}")]
    InvalidConfiguration(String),

    /// Backend-specific error
    #[error("Cache backend error: {0}")]
    BackendError(String),
}
