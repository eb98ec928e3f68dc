//! The scoped data gateway
//!
//! Every persistence call for a tenant-scoped entity funnels through here.
//! The gateway reads the ambient [`TenantScope`] frame and enforces:
//!
//! 1. creates inherit the current tenant, and may not name another one
//! 2. reads, updates and deletes are intersected with the current tenant
//! 3. updates can never set, unset or change the tenant field
//! 4. aggregation pipelines get a tenant match prepended, and pre-existing
//!    stages pinning another tenant fail
//! 5. bypass suspends the filter for the enclosed call only, and is audited
//!    at scope entry
//! 6. moving a record between tenants goes through [`ScopedGateway::clone_to_tenant`],
//!    nothing else

use parley_api_types::{ApiError, TenantId};
use parley_tenancy::{ScopeFrame, TenantScope};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::debug;

use crate::entity::{ScopedEntity, TENANT_FIELD};
use crate::error::{StorageError, StorageResult};
use crate::filter::{Condition, Filter, Update};
use crate::pipeline::{Pipeline, Stage};
use crate::store::DocumentStore;

/// Uniform tenant-scoping wrapper over a document store
pub struct ScopedGateway<S> {
    store: Arc<S>,
}

impl<S: DocumentStore> ScopedGateway<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Create an entity under the current scope
    pub async fn create<E: ScopedEntity>(&self, mut entity: E) -> StorageResult<E> {
        if E::TENANT_SCOPED {
            let frame = TenantScope::current();
            self.admit_create(&mut entity, &frame)?;
        }

        let doc = serde_json::to_value(&entity)?;
        let stored = self.store.insert(E::ENTITY, doc).await?;
        Ok(serde_json::from_value(stored)?)
    }

    /// Find entities matching `filter`, intersected with the current scope
    pub async fn find<E: ScopedEntity>(&self, filter: Filter) -> StorageResult<Vec<E>> {
        let filter = self.scope_filter::<E>(filter)?;
        let docs = self.store.find(E::ENTITY, &filter).await?;
        docs.into_iter()
            .map(|doc| serde_json::from_value(doc).map_err(StorageError::from))
            .collect()
    }

    /// Find at most one entity
    pub async fn find_one<E: ScopedEntity>(&self, filter: Filter) -> StorageResult<Option<E>> {
        Ok(self.find(filter).await?.into_iter().next())
    }

    /// Update matching entities.
    ///
    /// The tenant field is stripped from the update document under every
    /// scope: updates never transfer ownership.
    pub async fn update<E: ScopedEntity>(
        &self,
        filter: Filter,
        mut update: Update,
    ) -> StorageResult<u64> {
        let filter = self.scope_filter::<E>(filter)?;

        if update.strip_field(TENANT_FIELD) {
            debug!(entity = E::ENTITY, "stripped tenant field from update document");
        }
        if update.is_empty() {
            return Ok(0);
        }

        Ok(self.store.update(E::ENTITY, &filter, &update).await?)
    }

    /// Delete matching entities
    pub async fn delete<E: ScopedEntity>(&self, filter: Filter) -> StorageResult<u64> {
        let filter = self.scope_filter::<E>(filter)?;
        Ok(self.store.delete(E::ENTITY, &filter).await?)
    }

    /// Run an aggregation pipeline with the tenant match prepended
    pub async fn aggregate<E: ScopedEntity>(
        &self,
        mut pipeline: Pipeline,
    ) -> StorageResult<Vec<JsonValue>> {
        if E::TENANT_SCOPED {
            let frame = TenantScope::current();
            if let Some(tenant) = self.pipeline_tenant(&pipeline, &frame)? {
                pipeline.prepend(Stage::Match(
                    Filter::new().eq(TENANT_FIELD, tenant.as_str()),
                ));
            }
        }
        Ok(self.store.aggregate(E::ENTITY, &pipeline).await?)
    }

    /// Clone an entity into another tenant.
    ///
    /// The only supported path for moving data across the boundary:
    /// identity fields are stripped, the tenant is rewritten, and the copy
    /// is created under a scope for the target tenant.
    pub async fn clone_to_tenant<E: ScopedEntity>(
        &self,
        entity: &E,
        target: &TenantId,
    ) -> StorageResult<E> {
        let mut copy = entity.clone();
        copy.strip_identity();
        copy.set_tenant_id(target.clone());

        TenantScope::with_tenant(target.clone(), self.create(copy)).await
    }

    /// Create-path admission for tenant-scoped entities
    fn admit_create<E: ScopedEntity>(
        &self,
        entity: &mut E,
        frame: &ScopeFrame,
    ) -> StorageResult<()> {
        if frame.bypass {
            debug!(entity = E::ENTITY, "create under bypass scope");
            return Ok(());
        }

        let explicit = entity.tenant_id().cloned();
        match (&frame.tenant, explicit) {
            (Some(current), Some(explicit)) => {
                if &explicit != current && !frame.master {
                    debug!(
                        entity = E::ENTITY,
                        current = %current,
                        explicit = %explicit,
                        "create with foreign tenant denied"
                    );
                    return Err(ApiError::cross_tenant_denied().into());
                }
                Ok(())
            }
            (Some(current), None) => {
                entity.set_tenant_id(current.clone());
                Ok(())
            }
            (None, Some(_)) if frame.master => Ok(()),
            (None, _) => Err(ApiError::tenant_required().into()),
        }
    }

    /// Intersect a filter with the current scope
    fn scope_filter<E: ScopedEntity>(&self, mut filter: Filter) -> StorageResult<Filter> {
        if !E::TENANT_SCOPED {
            return Ok(filter);
        }

        let frame = TenantScope::current();
        if frame.bypass {
            debug!(entity = E::ENTITY, "query under bypass scope");
            return Ok(filter);
        }

        if frame.master {
            // Masters may pin any tenant explicitly; otherwise their
            // override scope (if any) applies
            if !filter.references(TENANT_FIELD) {
                if let Some(tenant) = &frame.tenant {
                    filter.prepend(Condition::Eq(
                        TENANT_FIELD.to_string(),
                        JsonValue::from(tenant.as_str()),
                    ));
                }
            }
            return Ok(filter);
        }

        let Some(current) = frame.tenant else {
            return Err(ApiError::tenant_required().into());
        };

        if filter.references(TENANT_FIELD) {
            // Only an equality on the current tenant is acceptable
            let pinned_to_current = filter.eq_value(TENANT_FIELD)
                == Some(&JsonValue::from(current.as_str()));
            if pinned_to_current {
                Ok(filter)
            } else {
                debug!(entity = E::ENTITY, tenant = %current, "foreign tenant filter denied");
                Err(ApiError::cross_tenant_denied().into())
            }
        } else {
            filter.prepend(Condition::Eq(
                TENANT_FIELD.to_string(),
                JsonValue::from(current.as_str()),
            ));
            Ok(filter)
        }
    }

    /// Decide the tenant to prepend for an aggregation, policing existing
    /// match stages
    fn pipeline_tenant(
        &self,
        pipeline: &Pipeline,
        frame: &ScopeFrame,
    ) -> StorageResult<Option<TenantId>> {
        if frame.bypass {
            debug!("aggregation under bypass scope");
            return Ok(None);
        }

        if frame.master {
            // Master pipelines pinning a tenant stand as written
            for filter in pipeline.match_filters() {
                if filter.references(TENANT_FIELD) {
                    return Ok(None);
                }
            }
            return Ok(frame.tenant.clone());
        }

        let Some(current) = &frame.tenant else {
            return Err(ApiError::tenant_required().into());
        };

        for filter in pipeline.match_filters() {
            if filter.references(TENANT_FIELD) {
                match filter.eq_value(TENANT_FIELD) {
                    Some(value) if value == &JsonValue::from(current.as_str()) => {}
                    _ => {
                        debug!(tenant = %current, "pipeline pinning foreign tenant denied");
                        return Err(ApiError::cross_tenant_denied().into());
                    }
                }
            }
        }

        Ok(Some(current.clone()))
    }
}
