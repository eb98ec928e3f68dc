//! Scoped entity declaration and registration

use serde::de::DeserializeOwned;
use serde::Serialize;
use parley_api_types::TenantId;

use crate::error::{StorageError, StorageResult};
use crate::store::DocumentStore;

/// Document field carrying the owning tenant
pub const TENANT_FIELD: &str = "tenant_id";

/// An entity type the gateway may persist.
///
/// Tenant-scoped entities (the default) carry an immutable `tenant_id` and
/// are filtered by it on every operation. Exempt entities (the tenant table
/// itself, master identities, cross-tenant administrative tables) opt out
/// with `TENANT_SCOPED = false`.
pub trait ScopedEntity:
    Serialize + DeserializeOwned + Clone + Send + Sync + 'static
{
    /// Collection name
    const ENTITY: &'static str;

    /// Whether the gateway scopes this entity to a tenant
    const TENANT_SCOPED: bool = true;

    /// Entity id
    fn id(&self) -> &str;

    /// Owning tenant, once assigned
    fn tenant_id(&self) -> Option<&TenantId>;

    /// Assign the owning tenant (create path only)
    fn set_tenant_id(&mut self, tenant: TenantId);

    /// Clear identity fields so the record can be re-created elsewhere
    fn strip_identity(&mut self);

    /// Compound indexes for this entity. Tenant-scoped entities must lead
    /// every index with the tenant field; use [`IndexSpec::scoped`].
    fn indexes() -> Vec<IndexSpec> {
        Vec::new()
    }
}

/// A compound index declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub fields: Vec<String>,
    pub unique: bool,
}

impl IndexSpec {
    /// An index leading with the tenant field
    pub fn scoped(fields: &[&str]) -> Self {
        let mut all = vec![TENANT_FIELD.to_string()];
        all.extend(fields.iter().map(|f| f.to_string()));
        Self {
            fields: all,
            unique: false,
        }
    }

    /// A per-tenant uniqueness constraint, expressed as a compound unique
    /// index including the tenant field
    pub fn scoped_unique(fields: &[&str]) -> Self {
        let mut spec = Self::scoped(fields);
        spec.unique = true;
        spec
    }

    /// An unscoped index for exempt entities
    pub fn plain(fields: &[&str], unique: bool) -> Self {
        Self {
            fields: fields.iter().map(|f| f.to_string()).collect(),
            unique,
        }
    }

    fn leads_with_tenant(&self) -> bool {
        self.fields.first().map(String::as_str) == Some(TENANT_FIELD)
    }
}

/// One registration per entity type, collected in a single place
#[derive(Debug, Clone)]
pub struct EntityRegistration {
    pub entity: &'static str,
    pub tenant_scoped: bool,
    pub indexes: Vec<IndexSpec>,
}

/// The single place entity types are registered.
///
/// Registration validates the indexing requirement: every index of a
/// tenant-scoped entity leads with the tenant field.
#[derive(Debug, Default)]
pub struct EntityRegistry {
    entries: Vec<EntityRegistration>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity type
    pub fn register<E: ScopedEntity>(&mut self) -> StorageResult<()> {
        let indexes = E::indexes();
        if E::TENANT_SCOPED {
            if let Some(bad) = indexes.iter().find(|spec| !spec.leads_with_tenant()) {
                return Err(StorageError::backend(format!(
                    "entity '{}' declares index {:?} not led by {}",
                    E::ENTITY,
                    bad.fields,
                    TENANT_FIELD
                )));
            }
        }
        self.entries.push(EntityRegistration {
            entity: E::ENTITY,
            tenant_scoped: E::TENANT_SCOPED,
            indexes,
        });
        Ok(())
    }

    pub fn entries(&self) -> &[EntityRegistration] {
        &self.entries
    }

    /// Create every registered index on the backing store
    pub async fn ensure_all<S: DocumentStore>(&self, store: &S) -> StorageResult<()> {
        for entry in &self.entries {
            store.ensure_indexes(entry.entity, &entry.indexes).await?;
        }
        Ok(())
    }
}
