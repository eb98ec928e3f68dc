//! Tenant record and admission helpers

use chrono::{DateTime, Utc};
use parley_api_types::{ApiError, SubscriptionStatus, TenantId, TenantKey};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// A tenant record.
///
/// `key` and the historical `slug` both map 1:1 to `id`; the slug survives
/// for installations created before keys became canonical. `usage` is the
/// admission-time view of consumption; it is enforced against `limits` when
/// resources are admitted, never at storage time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub key: TenantKey,
    pub slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_domain: Option<String>,
    pub is_active: bool,
    pub subscription_status: SubscriptionStatus,
    #[serde(default)]
    pub enabled_modules: HashSet<String>,
    #[serde(default)]
    pub limits: HashMap<String, u64>,
    #[serde(default)]
    pub usage: HashMap<String, u64>,
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tenant {
    /// Create an active tenant with no modules, limits, or origins
    pub fn new(id: TenantId, key: TenantKey) -> Self {
        let now = Utc::now();
        let slug = key.as_str().to_string();
        Self {
            id,
            key,
            slug,
            custom_domain: None,
            is_active: true,
            subscription_status: SubscriptionStatus::Active,
            enabled_modules: HashSet::new(),
            limits: HashMap::new(),
            usage: HashMap::new(),
            allowed_origins: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the tenant is active with an operational subscription
    pub fn is_operational(&self) -> bool {
        self.is_active && self.subscription_status.is_operational()
    }

    /// Whether a feature module is enabled for this tenant
    pub fn module_enabled(&self, module: &str) -> bool {
        self.enabled_modules.contains(module)
    }

    /// Admission check against the plan limit for `resource`.
    ///
    /// Resources with no configured limit are unmetered.
    pub fn check_limit(&self, resource: &str) -> Result<(), ApiError> {
        let Some(&limit) = self.limits.get(resource) else {
            return Ok(());
        };
        let current = self.usage.get(resource).copied().unwrap_or(0);
        if current >= limit {
            return Err(ApiError::plan_limit_reached(resource, current, limit));
        }
        Ok(())
    }

    /// Require a module to be enabled
    pub fn require_module(&self, module: &str) -> Result<(), ApiError> {
        if self.module_enabled(module) {
            Ok(())
        } else {
            Err(ApiError::module_disabled(module))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_api_types::ErrorCode;

    fn tenant() -> Tenant {
        Tenant::new(TenantId::from("t1"), TenantKey::parse("acme").unwrap())
    }

    #[test]
    fn test_slug_defaults_to_key() {
        let t = tenant();
        assert_eq!(t.slug, "acme");
    }

    #[test]
    fn test_limit_admission() {
        let mut t = tenant();
        t.limits.insert("agents".to_string(), 5);
        t.usage.insert("agents".to_string(), 4);
        assert!(t.check_limit("agents").is_ok());

        t.usage.insert("agents".to_string(), 5);
        let err = t.check_limit("agents").unwrap_err();
        assert_eq!(err.code, ErrorCode::PlanLimitReached);
        let details = err.details.unwrap();
        assert_eq!(details["current"], 5);
        assert_eq!(details["limit"], 5);
    }

    #[test]
    fn test_unmetered_resource() {
        let t = tenant();
        assert!(t.check_limit("anything").is_ok());
    }

    #[test]
    fn test_module_gate() {
        let mut t = tenant();
        t.enabled_modules.insert("chat".to_string());
        assert!(t.require_module("chat").is_ok());
        assert_eq!(
            t.require_module("billing").unwrap_err().code,
            ErrorCode::ModuleDisabled
        );
    }

    #[test]
    fn test_operational() {
        let mut t = tenant();
        assert!(t.is_operational());
        t.subscription_status = SubscriptionStatus::Suspended;
        assert!(!t.is_operational());
        t.subscription_status = SubscriptionStatus::Active;
        t.is_active = false;
        assert!(!t.is_operational());
    }
}
