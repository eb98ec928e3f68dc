//! Per-key async mutual exclusion
//!
//! Used by the registry for read-through fills (single writer per cache key)
//! and for serialising writes per tenant id. The lock table grows with the
//! number of distinct keys; callers key by tenant, so growth is bounded by
//! tenant count.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// A map of independently lockable keys
pub struct KeyedMutex<K> {
    locks: Mutex<HashMap<K, Arc<AsyncMutex<()>>>>,
}

impl<K: Eq + Hash + Clone> KeyedMutex<K> {
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Acquire the lock for `key`, waiting if another holder is active.
    ///
    /// The guard is owned, so it can be held across await points.
    pub async fn lock(&self, key: K) -> OwnedMutexGuard<()> {
        let entry = {
            let mut locks = self.locks.lock();
            locks
                .entry(key)
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        entry.lock_owned().await
    }

    /// Number of keys that currently have a lock allocated
    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.lock().is_empty()
    }
}

impl<K: Eq + Hash + Clone> Default for KeyedMutex<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_same_key_serialises() {
        let mutex = Arc::new(KeyedMutex::new());
        let counter = Arc::new(AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let mutex = mutex.clone();
            let counter = counter.clone();
            handles.push(tokio::spawn(async move {
                let _guard = mutex.lock("tenant-1").await;
                let active = counter.fetch_add(1, Ordering::SeqCst);
                // Nobody else may be inside the critical section
                assert_eq!(active, 0);
                tokio::time::sleep(std::time::Duration::from_millis(1)).await;
                counter.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_block() {
        let mutex = KeyedMutex::new();
        let _a = mutex.lock("a").await;
        // Would deadlock if keys shared a lock
        let _b = mutex.lock("b").await;
        assert_eq!(mutex.len(), 2);
    }
}
