//! Tenant-scoped persistence for the Parley kernel
//!
//! [`gateway::ScopedGateway`] is the single wrapper through which every
//! tenant-scoped entity reaches the document store. It injects the ambient
//! tenant on create, intersects every read/update/delete with it, refuses
//! tenant mutation on update, polices aggregation pipelines, and supports
//! audited bypass. Entities declare themselves through [`entity::ScopedEntity`]
//! and are registered, with their compound indexes, in one
//! [`entity::EntityRegistry`].

pub mod entity;
pub mod error;
pub mod filter;
pub mod gateway;
pub mod object_key;
pub mod pipeline;
pub mod store;

pub use entity::{EntityRegistry, IndexSpec, ScopedEntity, TENANT_FIELD};
pub use error::{StorageError, StorageResult};
pub use filter::{Condition, Filter, Update};
pub use gateway::ScopedGateway;
pub use object_key::ObjectKey;
pub use pipeline::{Pipeline, Stage};
pub use store::{DocumentStore, InMemoryStore};
