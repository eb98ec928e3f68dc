//! Token signing and verification configuration

use crate::error::ConfigResult;
use crate::validation::{validate_positive, validate_required_string, Validatable};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Current token claim layout version. Version 2 introduced the mandatory
/// tenant claim for non-master subjects.
pub const CURRENT_TOKEN_VERSION: u32 = 2;

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Secret for signing/verification
    #[serde(default = "default_secret")]
    pub secret: String,

    /// Token issuer
    #[serde(default = "default_issuer")]
    pub issuer: String,

    /// Token audience
    #[serde(default = "default_audience")]
    pub audience: String,

    /// Token lifetime
    #[serde(
        with = "crate::domains::utils::serde_duration",
        default = "default_token_ttl"
    )]
    pub token_ttl: Duration,
}

fn default_secret() -> String {
    // Development placeholder; deployments override via PARLEY_AUTH_SECRET
    "insecure-dev-secret".to_string()
}

fn default_issuer() -> String {
    "parley".to_string()
}

fn default_audience() -> String {
    "parley-clients".to_string()
}

fn default_token_ttl() -> Duration {
    Duration::from_secs(24 * 3600)
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret: default_secret(),
            issuer: default_issuer(),
            audience: default_audience(),
            token_ttl: default_token_ttl(),
        }
    }
}

impl Validatable for AuthConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_required_string(&self.secret, "secret", self.domain_name())?;
        validate_required_string(&self.issuer, "issuer", self.domain_name())?;
        validate_required_string(&self.audience, "audience", self.domain_name())?;
        validate_positive(self.token_ttl.as_secs(), "token_ttl", self.domain_name())?;
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "auth"
    }
}
