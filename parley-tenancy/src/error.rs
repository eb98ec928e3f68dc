//! Tenancy error types

use parley_api_types::ApiError;
use thiserror::Error;

/// Result type for tenancy operations
pub type TenancyResult<T> = Result<T, TenancyError>;

/// Errors surfaced by registry, resolver and token operations.
///
/// Taxonomy failures carry a stable [`ApiError`] code that transports map to
/// status codes verbatim. Directory failures are fatal to the enclosing
/// request after the registry's single retry.
#[derive(Debug, Error)]
pub enum TenancyError {
    /// A typed failure from the stable error taxonomy
    #[error(transparent)]
    Denied(#[from] ApiError),

    /// Backing tenant/identity store failed
    #[error("Directory error: {message}")]
    Directory { message: String },
}

impl TenancyError {
    pub fn directory(message: impl Into<String>) -> Self {
        TenancyError::Directory {
            message: message.into(),
        }
    }

    /// The taxonomy code, when this is a typed denial
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            TenancyError::Denied(err) => Some(err),
            TenancyError::Directory { .. } => None,
        }
    }
}
