//! MemoryCacheAdapter - default in-process cache adapter

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use contracts::{CacheAdapter, Cacheable, QueryContext, QueryResult};
use dashmap::DashMap;
use tracing::{debug, trace};

/// In-memory cache keyed by cache key
///
/// Entries expire lazily on read, against the result's `expires_at`.
#[derive(Debug, Default)]
pub struct MemoryCacheAdapter {
    store: DashMap<Bytes, QueryResult>,
}

impl MemoryCacheAdapter {
    /// Create an empty adapter
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Remove every expired entry; returns how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let before = self.store.len();
        self.store.retain(|_, result| !result.is_expired_at(now));
        before.saturating_sub(self.store.len())
    }
}

#[async_trait]
impl CacheAdapter for MemoryCacheAdapter {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(&self, _ctx: &QueryContext, query: &dyn Cacheable) -> Option<QueryResult> {
        let key = query.cache_key();
        let now = Utc::now();

        // Expiry check and removal are atomic per key.
        if self
            .store
            .remove_if(&key, |_, result| result.is_expired_at(now))
            .is_some()
        {
            trace!("Expired entry evicted");
            return None;
        }

        self.store.get(&key).map(|entry| entry.value().clone())
    }

    async fn set(&self, _ctx: &QueryContext, query: &dyn Cacheable, result: &QueryResult) -> bool {
        self.store.insert(query.cache_key(), result.clone());
        true
    }

    async fn expire(&self, _ctx: &QueryContext, query: &dyn Cacheable) {
        self.store.remove(&query.cache_key());
    }

    fn shutdown(&self) {
        let entries = self.store.len();
        self.store.clear();
        debug!(entries, "MemoryCacheAdapter cleared");
    }
}
