//! Configuration loading and environment variable handling

use crate::domains::{Environment, ParleyConfig};
use crate::error::{ConfigError, ConfigResult};
use std::path::Path;
use std::time::Duration;

/// Configuration loader with environment variable support
pub struct ConfigLoader {
    /// Environment variable prefix
    prefix: String,
}

impl ConfigLoader {
    /// Create a new config loader with default prefix
    pub fn new() -> Self {
        Self {
            prefix: "PARLEY".to_string(),
        }
    }

    /// Create a new config loader with custom prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Load configuration from a YAML file with environment overrides
    pub fn from_file(&self, path: impl AsRef<Path>) -> ConfigResult<ParleyConfig> {
        let content = std::fs::read_to_string(path)?;
        let mut config: ParleyConfig = serde_yaml::from_str(&content)?;

        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env(&self) -> ConfigResult<ParleyConfig> {
        let mut config = ParleyConfig::default();
        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;
        Ok(config)
    }

    /// Load configuration with fallback chain
    pub fn load(&self, config_path: Option<impl AsRef<Path>>) -> ConfigResult<ParleyConfig> {
        match config_path {
            Some(path) => self.from_file(path),
            None => self.from_env(),
        }
    }

    /// Apply environment variable overrides to configuration
    fn apply_env_overrides(&self, config: &mut ParleyConfig) -> ConfigResult<()> {
        if let Ok(env) = self.get_env_var("ENVIRONMENT") {
            config.environment = match env.as_str() {
                "development" => Environment::Development,
                "staging" => Environment::Staging,
                "production" => Environment::Production,
                other => {
                    return Err(ConfigError::EnvError(format!(
                        "unknown environment '{}'",
                        other
                    )))
                }
            };
        }

        if let Ok(value) = self.get_env_var("AUTH_SECRET") {
            config.auth.secret = value;
        }

        if let Ok(value) = self.get_env_var("ALLOW_LEGACY_TOKENS") {
            config.tenancy.allow_legacy_tokens = self.parse_bool("ALLOW_LEGACY_TOKENS", &value)?;
        }

        if let Ok(value) = self.get_env_var("USE_DEFAULT_TENANT_FALLBACK") {
            config.tenancy.use_default_tenant_fallback =
                self.parse_bool("USE_DEFAULT_TENANT_FALLBACK", &value)?;
        }

        if let Ok(value) = self.get_env_var("TENANT_CACHE_TTL_SECONDS") {
            let seconds: u64 = value.parse().map_err(|e| {
                ConfigError::EnvError(format!("invalid TENANT_CACHE_TTL_SECONDS: {}", e))
            })?;
            config.cache.tenant_cache_ttl = Duration::from_secs(seconds);
            config.cors.origin_cache_ttl = Duration::from_secs(seconds);
        }

        Ok(())
    }

    fn parse_bool(&self, name: &str, value: &str) -> ConfigResult<bool> {
        match value {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            other => Err(ConfigError::EnvError(format!(
                "invalid boolean for {}: '{}'",
                name, other
            ))),
        }
    }

    fn get_env_var(&self, suffix: &str) -> Result<String, std::env::VarError> {
        std::env::var(format!("{}_{}", self.prefix, suffix))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "environment: development\ncache:\n  tenant_cache_ttl: 60\n"
        )
        .unwrap();

        let config = ConfigLoader::with_prefix("PARLEY_TEST_UNSET")
            .from_file(file.path())
            .unwrap();
        assert!(config.environment.is_development());
        assert_eq!(config.cache.tenant_cache_ttl.as_secs(), 60);
    }

    #[test]
    fn test_env_override() {
        // Distinct prefix so parallel tests do not interfere
        std::env::set_var("PARLEY_LOADER_TEST_ALLOW_LEGACY_TOKENS", "true");
        std::env::set_var("PARLEY_LOADER_TEST_TENANT_CACHE_TTL_SECONDS", "120");

        let config = ConfigLoader::with_prefix("PARLEY_LOADER_TEST").from_env().unwrap();
        assert!(config.tenancy.allow_legacy_tokens);
        assert_eq!(config.cache.tenant_cache_ttl.as_secs(), 120);
        assert_eq!(config.cors.origin_cache_ttl.as_secs(), 120);

        std::env::remove_var("PARLEY_LOADER_TEST_ALLOW_LEGACY_TOKENS");
        std::env::remove_var("PARLEY_LOADER_TEST_TENANT_CACHE_TTL_SECONDS");
    }

    #[test]
    fn test_invalid_bool_rejected() {
        std::env::set_var("PARLEY_BADBOOL_ALLOW_LEGACY_TOKENS", "maybe");
        let result = ConfigLoader::with_prefix("PARLEY_BADBOOL").from_env();
        assert!(result.is_err());
        std::env::remove_var("PARLEY_BADBOOL_ALLOW_LEGACY_TOKENS");
    }
}
