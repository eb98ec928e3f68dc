//! Static CORS layer for development
//!
//! Production traffic goes through the per-tenant origin policy inside the
//! tenant middleware, which reflects the origin after resolution. In
//! development the tenant is often not resolvable (localhost, no tenant
//! headers), so this static layer built from the configured development
//! origins handles preflights up front.

use axum::http::{HeaderName, HeaderValue, Method};
use parley_config::CorsConfig;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tracing::error;

/// Create a development CORS layer from the configured dev origins
pub fn development_cors_layer(config: &CorsConfig) -> CorsLayer {
    let mut cors = CorsLayer::new();

    let origins: Result<Vec<HeaderValue>, _> = config
        .development_origins
        .iter()
        .map(|origin| origin.parse::<HeaderValue>())
        .collect();

    match origins {
        Ok(origins) => {
            cors = cors.allow_origin(origins);
        }
        Err(e) => {
            error!("invalid development origin: {}, falling back to localhost", e);
            cors = cors.allow_origin("http://localhost:3000".parse::<HeaderValue>().expect("static origin"));
        }
    }

    let methods: Vec<Method> = ["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"]
        .iter()
        .filter_map(|method| method.parse().ok())
        .collect();
    cors = cors.allow_methods(methods);

    let headers: Vec<HeaderName> = [
        "content-type",
        "authorization",
        "x-tenant-id",
        "x-tenant-key",
        "x-request-id",
    ]
    .iter()
    .filter_map(|header| header.parse().ok())
    .collect();
    cors = cors.allow_headers(headers);

    cors.allow_credentials(true)
        .expose_headers([
            HeaderName::from_static("x-tenant-id"),
            HeaderName::from_static("x-tenant-key"),
            HeaderName::from_static("x-request-id"),
        ])
        .max_age(Duration::from_secs(3600))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_builds_from_defaults() {
        // Construction must not panic with the default origin list
        let _layer = development_cors_layer(&CorsConfig::default());
    }
}
