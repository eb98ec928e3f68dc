//! Tenant and identity store interfaces
//!
//! These traits are the seam to the backing database. The kernel only needs
//! lookups and origin-list persistence; everything else about tenant CRUD
//! lives with the owning application. The in-memory implementation backs
//! tests and development wiring.

use async_trait::async_trait;
use parking_lot::RwLock;
use parley_api_types::{Role, SubjectId, TenantId};
use std::collections::HashMap;

use crate::error::TenancyResult;
use crate::tenant::Tenant;

/// A subject identity as the identity store sees it
#[derive(Debug, Clone)]
pub struct Identity {
    pub subject_id: SubjectId,
    pub tenant_id: Option<TenantId>,
    pub role: Role,
    pub is_active: bool,
}

/// Authoritative tenant store
#[async_trait]
pub trait TenantDirectory: Send + Sync {
    /// Find a tenant by its opaque id
    async fn find_by_id(&self, id: &TenantId) -> TenancyResult<Option<Tenant>>;

    /// Find a tenant by key or historical slug
    async fn find_by_key(&self, key: &str) -> TenancyResult<Option<Tenant>>;

    /// Find a tenant by custom domain (full host match)
    async fn find_by_domain(&self, host: &str) -> TenancyResult<Option<Tenant>>;

    /// Persist an updated tenant record
    async fn save(&self, tenant: Tenant) -> TenancyResult<()>;
}

/// Authoritative identity store
#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    /// Find an identity by subject id
    async fn find_by_subject(&self, subject: &SubjectId) -> TenancyResult<Option<Identity>>;
}

/// In-memory directory for tests and development
#[derive(Default)]
pub struct InMemoryDirectory {
    tenants: RwLock<HashMap<TenantId, Tenant>>,
    identities: RwLock<HashMap<SubjectId, Identity>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a tenant
    pub fn insert_tenant(&self, tenant: Tenant) {
        self.tenants.write().insert(tenant.id.clone(), tenant);
    }

    /// Insert or replace an identity
    pub fn insert_identity(&self, identity: Identity) {
        self.identities
            .write()
            .insert(identity.subject_id.clone(), identity);
    }
}

#[async_trait]
impl TenantDirectory for InMemoryDirectory {
    async fn find_by_id(&self, id: &TenantId) -> TenancyResult<Option<Tenant>> {
        Ok(self.tenants.read().get(id).cloned())
    }

    async fn find_by_key(&self, key: &str) -> TenancyResult<Option<Tenant>> {
        Ok(self
            .tenants
            .read()
            .values()
            .find(|t| t.key.as_str() == key || t.slug == key)
            .cloned())
    }

    async fn find_by_domain(&self, host: &str) -> TenancyResult<Option<Tenant>> {
        Ok(self
            .tenants
            .read()
            .values()
            .find(|t| t.custom_domain.as_deref() == Some(host))
            .cloned())
    }

    async fn save(&self, tenant: Tenant) -> TenancyResult<()> {
        self.tenants.write().insert(tenant.id.clone(), tenant);
        Ok(())
    }
}

#[async_trait]
impl IdentityDirectory for InMemoryDirectory {
    async fn find_by_subject(&self, subject: &SubjectId) -> TenancyResult<Option<Identity>> {
        Ok(self.identities.read().get(subject).cloned())
    }
}
