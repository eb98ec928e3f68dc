//! Stable error taxonomy
//!
//! Every failure the kernel surfaces to a transport carries one of these
//! codes. The codes are stable wire symbols; transports map them to status
//! codes via [`ErrorCode::http_status`] and must never invent their own.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Stable error codes with their HTTP status mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    NoToken,
    InvalidToken,
    TokenExpired,
    UserNotFound,
    AccountDisabled,
    TenantRequired,
    TenantNotFound,
    TenantSuspended,
    SubscriptionSuspended,
    SubscriptionExpired,
    CrossTenantDenied,
    InsufficientRole,
    PlanLimitReached,
    ModuleDisabled,
    OriginNotAllowed,
}

impl ErrorCode {
    /// HTTP status code for this error
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorCode::NoToken
            | ErrorCode::InvalidToken
            | ErrorCode::TokenExpired
            | ErrorCode::UserNotFound
            | ErrorCode::AccountDisabled => 401,
            ErrorCode::TenantRequired => 400,
            ErrorCode::TenantNotFound => 404,
            ErrorCode::TenantSuspended
            | ErrorCode::SubscriptionSuspended
            | ErrorCode::SubscriptionExpired
            | ErrorCode::CrossTenantDenied
            | ErrorCode::InsufficientRole
            | ErrorCode::PlanLimitReached
            | ErrorCode::ModuleDisabled
            | ErrorCode::OriginNotAllowed => 403,
        }
    }

    /// Stable wire symbol
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::NoToken => "NoToken",
            ErrorCode::InvalidToken => "InvalidToken",
            ErrorCode::TokenExpired => "TokenExpired",
            ErrorCode::UserNotFound => "UserNotFound",
            ErrorCode::AccountDisabled => "AccountDisabled",
            ErrorCode::TenantRequired => "TenantRequired",
            ErrorCode::TenantNotFound => "TenantNotFound",
            ErrorCode::TenantSuspended => "TenantSuspended",
            ErrorCode::SubscriptionSuspended => "SubscriptionSuspended",
            ErrorCode::SubscriptionExpired => "SubscriptionExpired",
            ErrorCode::CrossTenantDenied => "CrossTenantDenied",
            ErrorCode::InsufficientRole => "InsufficientRole",
            ErrorCode::PlanLimitReached => "PlanLimitReached",
            ErrorCode::ModuleDisabled => "ModuleDisabled",
            ErrorCode::OriginNotAllowed => "OriginNotAllowed",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Transport-facing error carrying a stable code, a short human message and
/// optional structured details (limit/current, module, suggestion).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{code}: {error}")]
pub struct ApiError {
    pub code: ErrorCode,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<JsonValue>,
}

/// Result alias for operations that fail with taxonomy errors
pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    /// Create an error with a code and message
    pub fn new(code: ErrorCode, error: impl Into<String>) -> Self {
        Self {
            code,
            error: error.into(),
            details: None,
        }
    }

    /// Attach structured details
    pub fn with_details(mut self, details: JsonValue) -> Self {
        self.details = Some(details);
        self
    }

    pub fn no_token() -> Self {
        Self::new(ErrorCode::NoToken, "Authentication token is required")
    }

    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidToken, message)
    }

    pub fn token_expired() -> Self {
        Self::new(ErrorCode::TokenExpired, "Token has expired")
    }

    pub fn user_not_found() -> Self {
        Self::new(ErrorCode::UserNotFound, "User account not found")
    }

    pub fn account_disabled() -> Self {
        Self::new(ErrorCode::AccountDisabled, "User account is disabled")
    }

    pub fn tenant_required() -> Self {
        Self::new(ErrorCode::TenantRequired, "Tenant could not be identified").with_details(
            serde_json::json!({
                "suggestion": "provide an x-tenant-id or x-tenant-key header, or use a tenant subdomain"
            }),
        )
    }

    pub fn tenant_not_found(reference: &str) -> Self {
        Self::new(ErrorCode::TenantNotFound, format!("Tenant not found: {}", reference))
    }

    pub fn tenant_suspended() -> Self {
        Self::new(ErrorCode::TenantSuspended, "Tenant is deactivated")
    }

    pub fn subscription_suspended() -> Self {
        Self::new(ErrorCode::SubscriptionSuspended, "Subscription is suspended")
    }

    pub fn subscription_expired() -> Self {
        Self::new(ErrorCode::SubscriptionExpired, "Subscription has expired")
    }

    pub fn cross_tenant_denied() -> Self {
        Self::new(ErrorCode::CrossTenantDenied, "Operation crosses tenant boundary")
    }

    pub fn insufficient_role(required: &str) -> Self {
        Self::new(
            ErrorCode::InsufficientRole,
            format!("Role '{}' is required for this operation", required),
        )
    }

    pub fn plan_limit_reached(resource: &str, current: u64, limit: u64) -> Self {
        Self::new(
            ErrorCode::PlanLimitReached,
            format!("Plan limit reached for {}", resource),
        )
        .with_details(serde_json::json!({ "resource": resource, "current": current, "limit": limit }))
    }

    pub fn module_disabled(module: &str) -> Self {
        Self::new(
            ErrorCode::ModuleDisabled,
            format!("Module '{}' is not enabled for this tenant", module),
        )
        .with_details(serde_json::json!({ "module": module }))
    }

    pub fn origin_not_allowed(origin: &str) -> Self {
        Self::new(
            ErrorCode::OriginNotAllowed,
            format!("Origin '{}' is not allowed for this tenant", origin),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping_matches_taxonomy() {
        assert_eq!(ErrorCode::NoToken.http_status(), 401);
        assert_eq!(ErrorCode::TokenExpired.http_status(), 401);
        assert_eq!(ErrorCode::TenantRequired.http_status(), 400);
        assert_eq!(ErrorCode::TenantNotFound.http_status(), 404);
        assert_eq!(ErrorCode::TenantSuspended.http_status(), 403);
        assert_eq!(ErrorCode::CrossTenantDenied.http_status(), 403);
        assert_eq!(ErrorCode::OriginNotAllowed.http_status(), 403);
    }

    #[test]
    fn test_plan_limit_details() {
        let err = ApiError::plan_limit_reached("conversations", 100, 100);
        let details = err.details.unwrap();
        assert_eq!(details["current"], 100);
        assert_eq!(details["limit"], 100);
    }

    #[test]
    fn test_codes_are_stable_symbols() {
        assert_eq!(ErrorCode::CrossTenantDenied.as_str(), "CrossTenantDenied");
        assert_eq!(
            serde_json::to_string(&ErrorCode::CrossTenantDenied).unwrap(),
            "\"CrossTenantDenied\""
        );
    }
}
