//! Document store interface and in-memory implementation
//!
//! The document store is the external-collaborator seam: the kernel only
//! assumes insert/find/update/delete/aggregate over JSON documents and
//! index creation. The in-memory implementation backs tests and
//! development wiring.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value as JsonValue;
use std::collections::HashMap;

use crate::entity::IndexSpec;
use crate::error::{StorageError, StorageResult};
use crate::filter::{Filter, Update};
use crate::pipeline::Pipeline;

/// Raw document persistence
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a document, returning it as stored
    async fn insert(&self, collection: &str, doc: JsonValue) -> StorageResult<JsonValue>;

    /// Find documents matching a filter
    async fn find(&self, collection: &str, filter: &Filter) -> StorageResult<Vec<JsonValue>>;

    /// Apply an update to matching documents, returning the count touched
    async fn update(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> StorageResult<u64>;

    /// Delete matching documents, returning the count removed
    async fn delete(&self, collection: &str, filter: &Filter) -> StorageResult<u64>;

    /// Run an aggregation pipeline
    async fn aggregate(&self, collection: &str, pipeline: &Pipeline) -> StorageResult<Vec<JsonValue>>;

    /// Ensure the given indexes exist
    async fn ensure_indexes(&self, collection: &str, indexes: &[IndexSpec]) -> StorageResult<()>;
}

/// In-memory document store for tests and development
#[derive(Default)]
pub struct InMemoryStore {
    collections: RwLock<HashMap<String, Vec<JsonValue>>>,
    indexes: RwLock<HashMap<String, Vec<IndexSpec>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declared indexes for a collection (inspection helper)
    pub fn declared_indexes(&self, collection: &str) -> Vec<IndexSpec> {
        self.indexes
            .read()
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    fn check_unique(
        docs: &[JsonValue],
        indexes: &[IndexSpec],
        candidate: &JsonValue,
        skip_id: Option<&JsonValue>,
    ) -> StorageResult<()> {
        for spec in indexes.iter().filter(|s| s.unique) {
            let collides = docs.iter().any(|existing| {
                if skip_id.is_some() && existing.get("id") == skip_id {
                    return false;
                }
                spec.fields
                    .iter()
                    .all(|field| existing.get(field) == candidate.get(field))
            });
            if collides {
                return Err(StorageError::backend(format!(
                    "unique index violation on {:?}",
                    spec.fields
                )));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn insert(&self, collection: &str, doc: JsonValue) -> StorageResult<JsonValue> {
        let indexes = self.declared_indexes(collection);
        let mut collections = self.collections.write();
        let docs = collections.entry(collection.to_string()).or_default();
        Self::check_unique(docs, &indexes, &doc, None)?;
        docs.push(doc.clone());
        Ok(doc)
    }

    async fn find(&self, collection: &str, filter: &Filter) -> StorageResult<Vec<JsonValue>> {
        let collections = self.collections.read();
        Ok(collections
            .get(collection)
            .map(|docs| docs.iter().filter(|d| filter.matches(d)).cloned().collect())
            .unwrap_or_default())
    }

    async fn update(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> StorageResult<u64> {
        let mut collections = self.collections.write();
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(0);
        };
        let mut touched = 0;
        for doc in docs.iter_mut() {
            if filter.matches(doc) {
                update.apply(doc);
                touched += 1;
            }
        }
        Ok(touched)
    }

    async fn delete(&self, collection: &str, filter: &Filter) -> StorageResult<u64> {
        let mut collections = self.collections.write();
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(0);
        };
        let before = docs.len();
        docs.retain(|doc| !filter.matches(doc));
        Ok((before - docs.len()) as u64)
    }

    async fn aggregate(&self, collection: &str, pipeline: &Pipeline) -> StorageResult<Vec<JsonValue>> {
        let docs = {
            let collections = self.collections.read();
            collections.get(collection).cloned().unwrap_or_default()
        };
        Ok(pipeline.run(docs))
    }

    async fn ensure_indexes(&self, collection: &str, indexes: &[IndexSpec]) -> StorageResult<()> {
        self.indexes
            .write()
            .insert(collection.to_string(), indexes.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_insert_find_update_delete() {
        let store = InMemoryStore::new();

        store
            .insert("items", json!({"id": "a", "tenant_id": "t1", "n": 1}))
            .await
            .unwrap();
        store
            .insert("items", json!({"id": "b", "tenant_id": "t2", "n": 2}))
            .await
            .unwrap();

        let t1 = Filter::new().eq("tenant_id", "t1");
        assert_eq!(store.find("items", &t1).await.unwrap().len(), 1);

        let touched = store
            .update("items", &t1, &Update::new().set("n", 10))
            .await
            .unwrap();
        assert_eq!(touched, 1);
        assert_eq!(store.find("items", &t1).await.unwrap()[0]["n"], 10);

        assert_eq!(store.delete("items", &t1).await.unwrap(), 1);
        assert!(store.find("items", &t1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unique_index_enforced() {
        let store = InMemoryStore::new();
        store
            .ensure_indexes("items", &[IndexSpec::scoped_unique(&["reference"])])
            .await
            .unwrap();

        store
            .insert("items", json!({"id": "a", "tenant_id": "t1", "reference": "r1"}))
            .await
            .unwrap();

        // Same reference in the same tenant collides
        assert!(store
            .insert("items", json!({"id": "b", "tenant_id": "t1", "reference": "r1"}))
            .await
            .is_err());

        // Same reference in another tenant is fine: uniqueness is per tenant
        assert!(store
            .insert("items", json!({"id": "c", "tenant_id": "t2", "reference": "r1"}))
            .await
            .is_ok());
    }
}
