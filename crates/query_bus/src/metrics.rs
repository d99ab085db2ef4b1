//! Bus counters for observability

use std::sync::atomic::{AtomicU64, Ordering};

use contracts::BusStats;

/// Lock-free counters of a query bus
#[derive(Debug, Default)]
pub struct BusMetrics {
    queries: AtomicU64,
    cache_hits: AtomicU64,
    cache_stores: AtomicU64,
    iterator_queries: AtomicU64,
    iterator_completed: AtomicU64,
    iterator_timeouts: AtomicU64,
    errors: AtomicU64,
}

impl BusMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_queries(&self) {
        self.queries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_cache_hits(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_cache_stores(&self) {
        self.cache_stores.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_iterator_queries(&self) {
        self.iterator_queries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_iterator_completed(&self) {
        self.iterator_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_iterator_timeouts(&self) {
        self.iterator_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_errors(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all counters
    pub fn snapshot(&self, workers: usize) -> BusStats {
        BusStats {
            queries: self.queries.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_stores: self.cache_stores.load(Ordering::Relaxed),
            iterator_queries: self.iterator_queries.load(Ordering::Relaxed),
            iterator_completed: self.iterator_completed.load(Ordering::Relaxed),
            iterator_timeouts: self.iterator_timeouts.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            workers,
        }
    }
}
