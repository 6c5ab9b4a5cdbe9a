//! TTL cache for URL risk verdicts

use moka::sync::Cache;
use phish_common::{AtomicCounter, RiskVerdict};
use std::time::Duration;

/// How long a verdict stays valid
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Default entry capacity
pub const DEFAULT_CAPACITY: u64 = 10_000;

/// Verdict cache keyed by exact URL string
///
/// Expiry is lazy: an entry older than the TTL is simply absent on the
/// next lookup. Writes are last-write-wins.
pub struct RiskCache {
    cache: Cache<String, RiskVerdict>,
    hits: AtomicCounter,
    misses: AtomicCounter,
}

impl RiskCache {
    /// Create cache with capacity and TTL
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(capacity)
            .time_to_live(ttl)
            .build();

        Self {
            cache,
            hits: AtomicCounter::new(0),
            misses: AtomicCounter::new(0),
        }
    }

    /// Get a live verdict, re-sourced as a cache hit
    pub fn lookup(&self, url: &str) -> Option<RiskVerdict> {
        match self.cache.get(url) {
            Some(verdict) => {
                self.hits.inc();
                Some(verdict.into_cached())
            }
            None => {
                self.misses.inc();
                None
            }
        }
    }

    /// Store a verdict
    pub fn store(&self, url: &str, verdict: RiskVerdict) {
        self.cache.insert(url.to_string(), verdict);
    }

    /// Drop all entries
    pub fn clear(&self) {
        self.cache.invalidate_all();
    }

    /// Current entry count
    pub fn len(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.cache.entry_count() == 0
    }

    /// Hit/miss counters
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.get(),
            misses: self.misses.get(),
        }
    }
}

impl Default for RiskCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_TTL)
    }
}

/// Cache effectiveness counters
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    /// Lookups served from cache
    pub hits: u64,
    /// Lookups that fell through to the pipeline
    pub misses: u64,
}
