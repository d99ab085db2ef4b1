//! BusStats - point-in-time counters of a query bus

use serde::{Deserialize, Serialize};

/// Snapshot of query bus counters (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusStats {
    /// Synchronous queries dispatched
    pub queries: u64,
    /// Synchronous queries served from cache
    pub cache_hits: u64,
    /// Results accepted by at least one cache adapter
    pub cache_stores: u64,
    /// Iterator queries enqueued
    pub iterator_queries: u64,
    /// Iterator queries run to completion by a worker
    pub iterator_completed: u64,
    /// Iterator queries abandoned without a listener
    pub iterator_timeouts: u64,
    /// Errors delivered to the error fan-out
    pub errors: u64,
    /// Live iterator workers
    pub workers: usize,
}

impl BusStats {
    /// Cache hit rate as percentage of synchronous queries
    pub fn cache_hit_rate(&self) -> f64 {
        if self.queries > 0 {
            (self.cache_hits as f64 / self.queries as f64) * 100.0
        } else {
            0.0
        }
    }
}
