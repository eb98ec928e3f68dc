//! Per-tenant CORS policy configuration

use crate::error::ConfigResult;
use crate::validation::{validate_positive, Validatable};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Origins accepted in development regardless of tenant lists.
    /// Active only when the environment is development.
    #[serde(default = "default_development_origins")]
    pub development_origins: Vec<String>,

    /// TTL for cached per-tenant origin lists
    #[serde(
        with = "crate::domains::utils::serde_duration",
        default = "default_origin_cache_ttl"
    )]
    pub origin_cache_ttl: Duration,

    /// Minimum blocked-origin count before a coarser pattern is suggested
    #[serde(default = "default_suggestion_threshold")]
    pub suggestion_threshold: u64,

    /// Maximum number of (tenant, origin) statistic entries kept in memory
    #[serde(default = "default_stats_capacity")]
    pub stats_capacity: usize,
}

fn default_development_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://localhost:5173".to_string(),
        "http://127.0.0.1:3000".to_string(),
        "http://127.0.0.1:5173".to_string(),
    ]
}

fn default_origin_cache_ttl() -> Duration {
    Duration::from_secs(300)
}

fn default_suggestion_threshold() -> u64 {
    3
}

fn default_stats_capacity() -> usize {
    4096
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            development_origins: default_development_origins(),
            origin_cache_ttl: default_origin_cache_ttl(),
            suggestion_threshold: default_suggestion_threshold(),
            stats_capacity: default_stats_capacity(),
        }
    }
}

impl Validatable for CorsConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_positive(
            self.origin_cache_ttl.as_secs(),
            "origin_cache_ttl",
            self.domain_name(),
        )?;
        validate_positive(self.stats_capacity, "stats_capacity", self.domain_name())?;
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "cors"
    }
}
