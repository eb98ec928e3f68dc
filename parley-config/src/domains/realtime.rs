//! Realtime hub configuration

use crate::error::ConfigResult;
use crate::validation::{validate_positive, Validatable};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Realtime fan-out configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RealtimeConfig {
    /// Bounded buffer size per fan-out group; slow consumers past this
    /// point drop frames rather than stall the emitter
    #[serde(default = "default_group_buffer")]
    pub group_buffer: usize,

    /// Handshake must complete within this window
    #[serde(
        with = "crate::domains::utils::serde_duration",
        default = "default_handshake_timeout"
    )]
    pub handshake_timeout: Duration,
}

fn default_group_buffer() -> usize {
    256
}

fn default_handshake_timeout() -> Duration {
    Duration::from_secs(10)
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            group_buffer: default_group_buffer(),
            handshake_timeout: default_handshake_timeout(),
        }
    }
}

impl Validatable for RealtimeConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_positive(self.group_buffer, "group_buffer", self.domain_name())?;
        validate_positive(
            self.handshake_timeout.as_secs(),
            "handshake_timeout",
            self.domain_name(),
        )?;
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "realtime"
    }
}
