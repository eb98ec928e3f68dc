//! Tenant cache configuration

use crate::error::ConfigResult;
use crate::validation::{validate_positive, Validatable};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Cache configuration for tenant records
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// TTL for cached tenant records and aliases
    #[serde(
        with = "crate::domains::utils::serde_duration",
        default = "default_tenant_cache_ttl"
    )]
    pub tenant_cache_ttl: Duration,

    /// Capacity hint for the tenant cache
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Interval for the expired-entry sweeper
    #[serde(
        with = "crate::domains::utils::serde_duration",
        default = "default_cleanup_interval"
    )]
    pub cleanup_interval: Duration,
}

fn default_tenant_cache_ttl() -> Duration {
    Duration::from_secs(300)
}

fn default_capacity() -> usize {
    1024
}

fn default_cleanup_interval() -> Duration {
    Duration::from_secs(60)
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            tenant_cache_ttl: default_tenant_cache_ttl(),
            capacity: default_capacity(),
            cleanup_interval: default_cleanup_interval(),
        }
    }
}

impl Validatable for CacheConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_positive(
            self.tenant_cache_ttl.as_secs(),
            "tenant_cache_ttl",
            self.domain_name(),
        )?;
        validate_positive(self.capacity, "capacity", self.domain_name())?;
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "cache"
    }
}
