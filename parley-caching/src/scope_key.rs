//! Per-tenant invalidation keys
//!
//! Everything the kernel caches about a tenant is keyed by a
//! [`ScopeKey`] of the tenant id and an [`Aspect`]. Invalidating a tenant
//! means invalidating its scope keys; there are no independent per-alias
//! caches that can drift apart.

use parley_api_types::TenantId;
use serde::{Deserialize, Serialize};

/// Cached aspect of a tenant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aspect {
    /// The tenant record itself
    Record,
    /// The tenant's allowed-origin list
    Origins,
}

impl Aspect {
    /// All aspects, for full invalidation of one tenant
    pub const ALL: [Aspect; 2] = [Aspect::Record, Aspect::Origins];
}

/// The single invalidation key for per-tenant cached state
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopeKey {
    pub tenant: TenantId,
    pub aspect: Aspect,
}

impl ScopeKey {
    pub fn new(tenant: TenantId, aspect: Aspect) -> Self {
        Self { tenant, aspect }
    }

    pub fn record(tenant: TenantId) -> Self {
        Self::new(tenant, Aspect::Record)
    }

    pub fn origins(tenant: TenantId) -> Self {
        Self::new(tenant, Aspect::Origins)
    }
}
