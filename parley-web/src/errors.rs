//! Web-specific error types and conversions
//!
//! This module bridges kernel failures onto HTTP responses. Taxonomy errors
//! pass through with their stable code and status; everything else becomes
//! an opaque 500 so store internals never leak to clients.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use parley_api_types::{response::ErrorBody, ApiError};
use parley_tenancy::TenancyError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Web-facing error type
#[derive(Debug, Error)]
pub enum WebError {
    /// A typed failure from the stable error taxonomy
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Internal failure; message is logged, not returned
    #[error("Internal server error: {message}")]
    Internal { message: String },
}

/// Result type for web operations
pub type WebResult<T> = Result<T, WebError>;

impl WebError {
    pub fn internal(message: impl Into<String>) -> Self {
        WebError::Internal {
            message: message.into(),
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebError::Api(err) => StatusCode::from_u16(err.code.http_status())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            WebError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<TenancyError> for WebError {
    fn from(err: TenancyError) -> Self {
        match err {
            TenancyError::Denied(api) => WebError::Api(api),
            TenancyError::Directory { message } => WebError::internal(message),
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = match &self {
            WebError::Api(err) => serde_json::to_value(ErrorBody::from(err))
                .unwrap_or_else(|_| json!({"success": false, "code": err.code.as_str()})),
            WebError::Internal { message } => {
                error!("internal error: {}", message);
                json!({
                    "success": false,
                    "code": "InternalError",
                    "error": "Internal server error"
                })
            }
        };

        (status, Json(body)).into_response()
    }
}
