//! Caching abstractions for the Parley kernel
//!
//! Provides the cache trait and the TTL store used by the tenant registry
//! and the origin policy, cache statistics, the `(tenant, aspect)`
//! invalidation key that keeps every per-tenant cached view coherent, and a
//! per-key mutex for single-writer coordination.

pub mod cache;
pub mod errors;
pub mod keyed;
pub mod scope_key;
pub mod stats;
pub mod stores;

// Re-export main types
pub use cache::{Cache, CacheEntry, CacheKey, CacheValue};
pub use errors::{CacheError, CacheResult};
pub use keyed::KeyedMutex;
pub use scope_key::{Aspect, ScopeKey};
pub use stats::CacheStats;
pub use stores::TtlCache;
