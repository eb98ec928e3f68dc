//! Token authentication middleware

use axum::{extract::Request, http::HeaderMap, middleware::Next, response::Response};
use parley_api_types::{ApiError, Role, SubjectId};
use parley_tenancy::{RouteClass, TokenClaims};
use std::sync::Arc;
use tracing::debug;

use crate::errors::WebError;
use crate::middleware::tenant::TenantState;

/// Authentication context for the current request
#[derive(Debug, Clone, Default)]
pub struct AuthContext {
    /// Verified claims; absent on anonymous public-route requests
    pub claims: Option<TokenClaims>,
}

impl AuthContext {
    pub fn authenticated(claims: TokenClaims) -> Self {
        Self {
            claims: Some(claims),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.claims.is_some()
    }

    pub fn subject(&self) -> Option<SubjectId> {
        self.claims.as_ref().map(|c| c.subject_id())
    }

    pub fn role(&self) -> Option<Role> {
        self.claims.as_ref().map(|c| c.role)
    }
}

/// Extract the bearer token from the Authorization header
fn extract_token(headers: &HeaderMap) -> Option<String> {
    let auth_header = headers.get("Authorization")?.to_str().ok()?;
    auth_header.strip_prefix("Bearer ").map(|t| t.to_string())
}

/// Authentication middleware.
///
/// Verifies the bearer token and stores an [`AuthContext`] in the request
/// extensions. Public routes pass through anonymously; every other class
/// requires a token.
pub async fn auth_middleware(
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, WebError> {
    let state = request
        .extensions()
        .get::<Arc<TenantState>>()
        .cloned()
        .ok_or_else(|| WebError::internal("tenant state not configured"))?;

    let route_class = state.routes.classify(request.uri().path());

    let context = match extract_token(&headers) {
        Some(token) => {
            let claims = state.tokens.verify(&token)?;
            debug!(subject = %claims.sub, "request authenticated");
            AuthContext::authenticated(claims)
        }
        None => {
            if route_class != RouteClass::Public {
                return Err(ApiError::no_token().into());
            }
            AuthContext::default()
        }
    };

    request.extensions_mut().insert(context);
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_extract_token() {
        let mut headers = HeaderMap::new();
        assert!(extract_token(&headers).is_none());

        headers.insert("Authorization", HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(extract_token(&headers).as_deref(), Some("abc.def.ghi"));

        headers.insert("Authorization", HeaderValue::from_static("Basic dXNlcg=="));
        assert!(extract_token(&headers).is_none());
    }

    #[test]
    fn test_anonymous_context() {
        let context = AuthContext::default();
        assert!(!context.is_authenticated());
        assert!(context.subject().is_none());
        assert!(context.role().is_none());
    }
}
