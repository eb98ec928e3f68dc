//! Cache statistics

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Cache statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    /// Total number of get requests
    pub total_gets: u64,

    /// Number of cache hits
    pub hits: u64,

    /// Number of cache misses
    pub misses: u64,

    /// Total number of put requests
    pub total_puts: u64,

    /// Total number of evictions
    pub evictions: u64,

    /// Current number of entries
    pub entry_count: usize,

    /// Hit rate (0.0 to 1.0)
    pub hit_rate: f64,
}

impl CacheStats {
    /// Create new empty stats
    pub fn new() -> Self {
        Self {
            total_gets: 0,
            hits: 0,
            misses: 0,
            total_puts: 0,
            evictions: 0,
            entry_count: 0,
            hit_rate: 0.0,
        }
    }
}

impl Default for CacheStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Thread-safe statistics collector
#[derive(Debug)]
pub struct StatsCollector {
    total_gets: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    total_puts: AtomicU64,
    evictions: AtomicU64,
}

/// Shared statistics collector handle
pub type SharedStatsCollector = Arc<StatsCollector>;

/// Create a new shared stats collector
pub fn create_stats_collector() -> SharedStatsCollector {
    Arc::new(StatsCollector::new())
}

impl StatsCollector {
    /// Create a new stats collector
    pub fn new() -> Self {
        Self {
            total_gets: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            total_puts: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Record a cache hit
    pub fn record_hit(&self) {
        self.total_gets.fetch_add(1, Ordering::Relaxed);
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a cache miss
    pub fn record_miss(&self) {
        self.total_gets.fetch_add(1, Ordering::Relaxed);
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a put operation
    pub fn record_put(&self) {
        self.total_puts.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an eviction
    pub fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current stats
    pub fn get_stats(&self, entry_count: usize) -> CacheStats {
        let total_gets = self.total_gets.load(Ordering::Relaxed);
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total_puts = self.total_puts.load(Ordering::Relaxed);
        let evictions = self.evictions.load(Ordering::Relaxed);

        let hit_rate = if total_gets > 0 {
            hits as f64 / total_gets as f64
        } else {
            0.0
        };

        CacheStats {
            total_gets,
            hits,
            misses,
            total_puts,
            evictions,
            entry_count,
            hit_rate,
        }
    }
}

impl Default for StatsCollector {
    fn default() -> Self {
        Self::new()
    }
}
