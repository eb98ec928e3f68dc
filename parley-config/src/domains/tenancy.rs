//! Tenancy policy configuration

use crate::error::ConfigResult;
use crate::validation::{validate_required_string, Validatable};
use serde::{Deserialize, Serialize};

/// Behaviour when a tenant's subscription is suspended or expired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SuspendedPolicy {
    /// Deny the request outright
    #[default]
    Deny,
    /// Let the request through flagged as limited
    Limited,
}

/// Tenancy resolution and migration policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TenancyConfig {
    /// Accept version-1 tokens during migration
    #[serde(default = "crate::domains::utils::default_false")]
    pub allow_legacy_tokens: bool,

    /// Resolver may fall back to the default tenant for eligible routes
    #[serde(default = "crate::domains::utils::default_false")]
    pub use_default_tenant_fallback: bool,

    /// Key of the fallback tenant
    #[serde(default = "default_tenant_key")]
    pub default_tenant_key: String,

    /// Route prefixes eligible for the default-tenant fallback
    #[serde(default)]
    pub fallback_route_allowlist: Vec<String>,

    /// Whether the fallback also engages on identity-only routes.
    /// Off by default: attaching authenticated subjects to the default
    /// tenant is a data-placement decision, not a convenience.
    #[serde(default = "crate::domains::utils::default_false")]
    pub identity_only_fallback: bool,

    /// Accept the `tenant` query parameter as a resolution source
    #[serde(default = "crate::domains::utils::default_false")]
    pub allow_query_tenant: bool,

    /// Behaviour for suspended/expired subscriptions
    #[serde(default)]
    pub subscription_suspended_policy: SuspendedPolicy,
}

fn default_tenant_key() -> String {
    "default".to_string()
}

impl Default for TenancyConfig {
    fn default() -> Self {
        Self {
            allow_legacy_tokens: false,
            use_default_tenant_fallback: false,
            default_tenant_key: default_tenant_key(),
            fallback_route_allowlist: Vec::new(),
            identity_only_fallback: false,
            allow_query_tenant: false,
            subscription_suspended_policy: SuspendedPolicy::Deny,
        }
    }
}

impl Validatable for TenancyConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_required_string(&self.default_tenant_key, "default_tenant_key", self.domain_name())?;

        if self.use_default_tenant_fallback && self.fallback_route_allowlist.is_empty() {
            return Err(self.validation_error(
                "use_default_tenant_fallback requires a non-empty fallback_route_allowlist",
            ));
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "tenancy"
    }
}
