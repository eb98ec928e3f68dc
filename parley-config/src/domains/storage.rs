//! Object storage key configuration

use crate::error::ConfigResult;
use crate::validation::{validate_positive, validate_required_string, Validatable};
use serde::{Deserialize, Serialize};

/// Object storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Environment segment baked into object keys
    #[serde(default = "default_env_segment")]
    pub env_segment: String,

    /// Maximum sanitized filename length
    #[serde(default = "default_max_name_len")]
    pub max_name_len: usize,
}

fn default_env_segment() -> String {
    "production".to_string()
}

fn default_max_name_len() -> usize {
    64
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            env_segment: default_env_segment(),
            max_name_len: default_max_name_len(),
        }
    }
}

impl Validatable for StorageConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_required_string(&self.env_segment, "env_segment", self.domain_name())?;
        validate_positive(self.max_name_len, "max_name_len", self.domain_name())?;
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "storage"
    }
}
