use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::errors::ApiError;

/// Standard success envelope.
///
/// Mirrors the error envelope shape: `{success:true, data, meta?}` on
/// success, `{success:false, code, error, details?}` on failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<JsonValue>,
}

impl<T> ApiResponse<T> {
    /// Create a simple response with just data
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
            meta: None,
        }
    }

    /// Create response with metadata
    pub fn with_meta(data: T, meta: JsonValue) -> Self {
        Self {
            success: true,
            data,
            meta: Some(meta),
        }
    }
}

/// Wire shape of a failed response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub success: bool,
    pub code: String,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<JsonValue>,
}

impl From<&ApiError> for ErrorBody {
    fn from(err: &ApiError) -> Self {
        Self {
            success: false,
            code: err.code.as_str().to_string(),
            error: err.error.clone(),
            details: err.details.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorCode;

    #[test]
    fn test_success_envelope() {
        let body = serde_json::to_value(ApiResponse::new(serde_json::json!({"id": "c1"}))).unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["id"], "c1");
        assert!(body.get("meta").is_none());
    }

    #[test]
    fn test_error_envelope() {
        let err = ApiError::new(ErrorCode::TenantSuspended, "Tenant is deactivated");
        let body = serde_json::to_value(ErrorBody::from(&err)).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "TenantSuspended");
        assert_eq!(body["error"], "Tenant is deactivated");
    }
}
