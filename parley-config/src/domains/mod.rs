//! Domain-specific configuration modules

pub mod auth;
pub mod cache;
pub mod cors;
pub mod realtime;
pub mod storage;
pub mod tenancy;
pub mod utils;

use crate::error::ConfigResult;
use crate::validation::Validatable;
use serde::{Deserialize, Serialize};

/// Deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Staging,
    #[default]
    Production,
}

impl Environment {
    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }
}

/// Main Parley configuration combining all domains
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ParleyConfig {
    /// Deployment environment
    #[serde(default)]
    pub environment: Environment,

    /// Tenancy resolution policy
    #[serde(default)]
    pub tenancy: tenancy::TenancyConfig,

    /// Token signing and verification
    #[serde(default)]
    pub auth: auth::AuthConfig,

    /// Per-tenant CORS policy
    #[serde(default)]
    pub cors: cors::CorsConfig,

    /// Tenant cache configuration
    #[serde(default)]
    pub cache: cache::CacheConfig,

    /// Realtime hub configuration
    #[serde(default)]
    pub realtime: realtime::RealtimeConfig,

    /// Object storage key layout
    #[serde(default)]
    pub storage: storage::StorageConfig,
}

impl ParleyConfig {
    /// Validate all domain configurations
    pub fn validate_all(&self) -> ConfigResult<()> {
        self.tenancy.validate()?;
        self.auth.validate()?;
        self.cors.validate()?;
        self.cache.validate()?;
        self.realtime.validate()?;
        self.storage.validate()?;
        Ok(())
    }
}
