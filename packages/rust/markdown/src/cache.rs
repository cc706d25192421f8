//! Process-wide result cache keyed by the raw input text.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use moka::notification::RemovalCause;
use moka::sync::Cache;
use serde::Serialize;

use chatmark_shared::ProcessedMarkdown;

/// Snapshot of cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Entries removed for capacity or expiry.
    pub evictions: u64,
    pub size: u64,
}

impl CacheStats {
    /// Fraction of lookups served from the cache, 0.0 when nothing was looked up.
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}

/// Bounded, expire-after-write cache of finished results.
pub(crate) struct ProcessCache {
    inner: Cache<String, Arc<ProcessedMarkdown>>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: Arc<AtomicU64>,
}

impl ProcessCache {
    pub(crate) fn new(capacity: u64, ttl: Duration) -> Self {
        let evictions = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&evictions);

        let inner = Cache::builder()
            .max_capacity(capacity)
            .time_to_live(ttl)
            .eviction_listener(move |_key, _value, cause: RemovalCause| {
                if cause.was_evicted() {
                    counter.fetch_add(1, Ordering::Relaxed);
                }
            })
            .build();

        Self {
            inner,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions,
        }
    }

    pub(crate) fn get(&self, key: &str) -> Option<Arc<ProcessedMarkdown>> {
        let found = self.inner.get(key);
        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    pub(crate) fn insert(&self, key: String, value: Arc<ProcessedMarkdown>) {
        self.inner.insert(key, value);
    }

    pub(crate) fn clear(&self) {
        self.inner.invalidate_all();
        self.inner.run_pending_tasks();
    }

    pub(crate) fn stats(&self) -> CacheStats {
        self.inner.run_pending_tasks();
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            size: self.inner.entry_count(),
        }
    }
}
