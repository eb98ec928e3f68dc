//! Cached, authoritative tenant lookup

use parley_api_types::{ApiError, TenantId};
use parley_caching::{Aspect, Cache, CacheStats, KeyedMutex, ScopeKey, TtlCache};
use parley_config::CacheConfig;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::directory::TenantDirectory;
use crate::error::{TenancyError, TenancyResult};
use crate::tenant::Tenant;

/// Read-through cache over the tenant directory.
///
/// Lookups by id, key, legacy slug, and custom domain all land on the same
/// cached record; aliases are a thin mapping onto the canonical id so they
/// cannot drift from the record. Absent tenants are never cached (a tenant
/// created moments ago must be visible on the next request). Writes bypass
/// the cache, are serialised per tenant, and invalidate every aspect and
/// alias of the tenant before returning.
pub struct TenantRegistry {
    directory: Arc<dyn TenantDirectory>,
    records: TtlCache<TenantId, Tenant>,
    origins: TtlCache<TenantId, Vec<String>>,
    aliases: TtlCache<String, TenantId>,
    fill_locks: KeyedMutex<String>,
    write_locks: KeyedMutex<TenantId>,
    ttl: Duration,
}

impl TenantRegistry {
    pub fn new(directory: Arc<dyn TenantDirectory>, config: &CacheConfig) -> Self {
        let ttl = config.tenant_cache_ttl;
        Self {
            directory,
            records: TtlCache::with_capacity(ttl, config.capacity),
            origins: TtlCache::with_capacity(ttl, config.capacity),
            aliases: TtlCache::with_capacity(ttl, config.capacity * 3),
            fill_locks: KeyedMutex::new(),
            write_locks: KeyedMutex::new(),
            ttl,
        }
    }

    /// Look up a tenant by id
    pub async fn by_id(&self, id: &TenantId) -> TenancyResult<Tenant> {
        if let Ok(Some(tenant)) = self.records.get(id).await {
            return Ok(tenant);
        }

        // Single writer per key while filling
        let _fill = self.fill_locks.lock(format!("id:{}", id)).await;
        if let Ok(Some(tenant)) = self.records.get(id).await {
            return Ok(tenant);
        }

        let found = match self.directory.find_by_id(id).await {
            Err(TenancyError::Directory { message }) => {
                warn!(tenant_id = %id, error = %message, "tenant lookup failed, retrying once");
                self.directory.find_by_id(id).await?
            }
            other => other?,
        };

        match found {
            Some(tenant) => {
                self.fill(&tenant).await;
                Ok(tenant)
            }
            None => Err(ApiError::tenant_not_found(id.as_str()).into()),
        }
    }

    /// Look up a tenant by key or historical slug
    pub async fn by_key(&self, key: &str) -> TenancyResult<Tenant> {
        let alias = format!("key:{}", key);
        if let Ok(Some(id)) = self.aliases.get(&alias).await {
            return self.by_id(&id).await;
        }

        let _fill = self.fill_locks.lock(alias.clone()).await;
        if let Ok(Some(id)) = self.aliases.get(&alias).await {
            return self.by_id(&id).await;
        }

        let found = match self.directory.find_by_key(key).await {
            Err(TenancyError::Directory { message }) => {
                warn!(tenant_key = key, error = %message, "tenant lookup failed, retrying once");
                self.directory.find_by_key(key).await?
            }
            other => other?,
        };

        match found {
            Some(tenant) => {
                self.fill(&tenant).await;
                Ok(tenant)
            }
            None => Err(ApiError::tenant_not_found(key).into()),
        }
    }

    /// Look up a tenant by custom domain (full host match)
    pub async fn by_domain(&self, host: &str) -> TenancyResult<Tenant> {
        let alias = format!("domain:{}", host);
        if let Ok(Some(id)) = self.aliases.get(&alias).await {
            return self.by_id(&id).await;
        }

        let _fill = self.fill_locks.lock(alias.clone()).await;
        if let Ok(Some(id)) = self.aliases.get(&alias).await {
            return self.by_id(&id).await;
        }

        let found = match self.directory.find_by_domain(host).await {
            Err(TenancyError::Directory { message }) => {
                warn!(host, error = %message, "tenant lookup failed, retrying once");
                self.directory.find_by_domain(host).await?
            }
            other => other?,
        };

        match found {
            Some(tenant) => {
                self.fill(&tenant).await;
                Ok(tenant)
            }
            None => Err(ApiError::tenant_not_found(host).into()),
        }
    }

    /// Allowed-origin list for a tenant, cached under its own aspect
    pub async fn allowed_origins(&self, id: &TenantId) -> TenancyResult<Vec<String>> {
        if let Ok(Some(list)) = self.origins.get(id).await {
            return Ok(list);
        }
        let tenant = self.by_id(id).await?;
        let _ = self
            .origins
            .put_with_ttl(id.clone(), tenant.allowed_origins.clone(), self.ttl)
            .await;
        Ok(tenant.allowed_origins)
    }

    /// Replace a tenant's allowed-origin list.
    ///
    /// The write bypasses the cache, is serialised with other writes to the
    /// same tenant, and invalidates the tenant's cached aspects before
    /// returning, so a read on this node immediately after observes the new
    /// list.
    pub async fn set_allowed_origins(
        &self,
        id: &TenantId,
        origins: Vec<String>,
    ) -> TenancyResult<()> {
        self.modify_allowed_origins(id, move |list| *list = origins).await
    }

    /// Read-modify-write a tenant's origin list under the per-tenant write
    /// lock, so concurrent additions and removals cannot lose each other.
    pub async fn modify_allowed_origins<F>(&self, id: &TenantId, mutate: F) -> TenancyResult<()>
    where
        F: FnOnce(&mut Vec<String>) + Send,
    {
        let _write = self.write_locks.lock(id.clone()).await;

        let mut tenant = match self.directory.find_by_id(id).await? {
            Some(tenant) => tenant,
            None => return Err(ApiError::tenant_not_found(id.as_str()).into()),
        };
        mutate(&mut tenant.allowed_origins);
        tenant.updated_at = chrono::Utc::now();

        let aliases = Self::alias_keys(&tenant);
        self.directory.save(tenant).await?;

        self.invalidate(ScopeKey::record(id.clone()), &aliases).await;
        self.invalidate(ScopeKey::origins(id.clone()), &[]).await;
        Ok(())
    }

    /// Drop every cached aspect and alias of a tenant
    pub async fn refresh(&self, id: &TenantId) {
        let aliases = match self.records.get(id).await {
            Ok(Some(tenant)) => Self::alias_keys(&tenant),
            _ => Vec::new(),
        };
        for aspect in Aspect::ALL {
            self.invalidate(ScopeKey::new(id.clone(), aspect), &aliases).await;
        }
    }

    /// The single invalidation primitive: one `(tenant, aspect)` key plus
    /// the alias entries pointing at it.
    async fn invalidate(&self, key: ScopeKey, aliases: &[String]) {
        debug!(tenant_id = %key.tenant, aspect = ?key.aspect, "invalidating cached tenant aspect");
        match key.aspect {
            Aspect::Record => {
                let _ = self.records.remove(&key.tenant).await;
            }
            Aspect::Origins => {
                let _ = self.origins.remove(&key.tenant).await;
            }
        }
        for alias in aliases {
            let _ = self.aliases.remove(alias).await;
        }
    }

    async fn fill(&self, tenant: &Tenant) {
        let _ = self
            .records
            .put_with_ttl(tenant.id.clone(), tenant.clone(), self.ttl)
            .await;
        for alias in Self::alias_keys(tenant) {
            let _ = self
                .aliases
                .put_with_ttl(alias, tenant.id.clone(), self.ttl)
                .await;
        }
    }

    fn alias_keys(tenant: &Tenant) -> Vec<String> {
        let mut keys = vec![
            format!("key:{}", tenant.key.as_str()),
            format!("key:{}", tenant.slug),
        ];
        if let Some(domain) = &tenant.custom_domain {
            keys.push(format!("domain:{}", domain));
        }
        keys
    }

    /// Record-cache statistics
    pub async fn cache_stats(&self) -> CacheStats {
        self.records.stats().await.unwrap_or_default()
    }
}
