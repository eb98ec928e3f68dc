//! Tenant resolution middleware
//!
//! Builds the identity envelope from the request, resolves the tenant,
//! checks the origin against the tenant's allow-list (one pass, after
//! resolution), installs the ambient scope frame for the rest of the
//! request, and stamps the tenant and CORS headers onto the response.

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue, Uri},
    middleware::Next,
    response::Response,
};
use parley_api_types::ApiError;
use parley_tenancy::{
    IdentityEnvelope, Resolution, RouteClass, ScopeFrame, TenantResolver, TenantScope,
    TokenService,
};
use std::sync::Arc;
use tracing::debug;

use crate::errors::WebError;
use crate::middleware::auth::AuthContext;
use crate::origin::OriginPolicy;
use crate::routes::RoutePolicy;

/// Shared state for the middleware chain, injected as an extension
pub struct TenantState {
    pub tokens: Arc<TokenService>,
    pub resolver: Arc<TenantResolver>,
    pub origins: Arc<OriginPolicy>,
    pub routes: RoutePolicy,
}

/// Read one query parameter without URL decoding; tenant keys and ids use
/// the URL-safe alphabet, so decoding is a no-op for well-formed values
fn query_param(uri: &Uri, name: &str) -> Option<String> {
    uri.query()?
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
}

/// Tenant middleware; must run after [`crate::middleware::auth_middleware`]
pub async fn tenant_middleware(
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, WebError> {
    let state = request
        .extensions()
        .get::<Arc<TenantState>>()
        .cloned()
        .ok_or_else(|| WebError::internal("tenant state not configured"))?;

    let path = request.uri().path().to_string();
    let route_class = state.routes.classify(&path);

    // Public routes carry no tenant; nothing to resolve or reflect
    if route_class == RouteClass::Public {
        return Ok(next.run(request).await);
    }

    let auth = request
        .extensions()
        .get::<AuthContext>()
        .cloned()
        .unwrap_or_default();

    let mut envelope = IdentityEnvelope::for_route(route_class, path);
    envelope.claims = auth.claims;
    envelope.header_tenant_id = header_string(&headers, "x-tenant-id");
    envelope.header_tenant_key = header_string(&headers, "x-tenant-key");
    envelope.origin = header_string(&headers, "origin");
    envelope.host = header_string(&headers, "host")
        .or_else(|| request.uri().host().map(|h| h.to_string()));
    envelope.query_tenant_id = query_param(request.uri(), "tenantId");
    envelope.query_tenant = query_param(request.uri(), "tenant");

    let resolution = state.resolver.resolve(&envelope).await?;

    // One-pass origin check, after the tenant is known
    let mut reflected_origin: Option<String> = None;
    if let (Some(origin), Some(tenant)) = (&envelope.origin, &resolution.tenant) {
        let decision = state.origins.is_allowed(origin, &tenant.id).await?;
        if !decision.allowed {
            return Err(ApiError::origin_not_allowed(origin).into());
        }
        debug!(origin, reason = %decision.reason, "origin allowed");
        reflected_origin = Some(origin.clone());
    }

    let frame = match (&resolution.tenant, resolution.is_master) {
        (Some(tenant), true) => ScopeFrame {
            tenant: Some(tenant.id.clone()),
            bypass: false,
            master: true,
        },
        (None, true) => ScopeFrame::master_unscoped(),
        (Some(tenant), false) => ScopeFrame::for_tenant(tenant.id.clone()),
        (None, false) => ScopeFrame::unscoped(),
    };

    let tenant_headers = resolution
        .tenant
        .as_ref()
        .map(|t| (t.id.to_string(), t.key.as_str().to_string()));

    request.extensions_mut().insert(resolution);

    // The whole downstream stack runs under the resolved frame
    let mut response = TenantScope::scope(frame, next.run(request)).await;

    if let Some((tenant_id, tenant_key)) = tenant_headers {
        if let Ok(value) = HeaderValue::from_str(&tenant_id) {
            response.headers_mut().insert("x-tenant-id", value);
        }
        if let Ok(value) = HeaderValue::from_str(&tenant_key) {
            response.headers_mut().insert("x-tenant-key", value);
        }
    }

    if let Some(origin) = reflected_origin {
        if let Ok(value) = HeaderValue::from_str(&origin) {
            response
                .headers_mut()
                .insert("access-control-allow-origin", value);
            response.headers_mut().insert(
                "access-control-allow-credentials",
                HeaderValue::from_static("true"),
            );
        }
    }

    Ok(response)
}

/// Extractor-style helper: the resolution stored by the middleware
pub fn resolution_of(request: &Request) -> Option<&Resolution> {
    request.extensions().get::<Resolution>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_param() {
        let uri: Uri = "/api/v1/chats?tenant=acme&tenantId=t1".parse().unwrap();
        assert_eq!(query_param(&uri, "tenant").as_deref(), Some("acme"));
        assert_eq!(query_param(&uri, "tenantId").as_deref(), Some("t1"));
        assert_eq!(query_param(&uri, "missing"), None);

        let uri: Uri = "/api/v1/chats".parse().unwrap();
        assert_eq!(query_param(&uri, "tenant"), None);
    }
}
