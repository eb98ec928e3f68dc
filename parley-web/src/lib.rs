//! # Parley Web Utilities
//!
//! Reusable web middleware for tenant-isolated HTTP APIs built with Axum:
//! request-id propagation, token authentication, tenant resolution with
//! ambient scope installation, per-tenant CORS with pattern matching and
//! statistics, and error conversion onto the stable taxonomy.
//!
//! The middleware chain for a typical router is
//! `request_id` → `auth` → `tenant`; handlers then read
//! [`parley_tenancy::TenantScope::current`] implicitly through the data
//! gateway, and the response carries `X-Tenant-Id` / `X-Tenant-Key` plus the
//! reflected CORS headers.

pub mod errors;
pub mod middleware;
pub mod origin;
pub mod routes;

// Re-export commonly used types and functions
pub use errors::{WebError, WebResult};
pub use middleware::{
    auth_middleware, development_cors_layer, request_id_middleware, tenant_middleware,
    AuthContext, RequestId, TenantState, REQUEST_ID_HEADER,
};
pub use origin::{OriginDecision, OriginPattern, OriginPolicy, OriginStats};
pub use routes::RoutePolicy;
