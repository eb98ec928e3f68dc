pub mod auth;
pub mod cors;
pub mod request_id;
pub mod tenant;

// Re-export middleware entry points
pub use auth::{auth_middleware, AuthContext};
pub use cors::development_cors_layer;
pub use request_id::{request_id_middleware, RequestId, REQUEST_ID_HEADER};
pub use tenant::{tenant_middleware, TenantState};
