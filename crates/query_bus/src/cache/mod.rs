//! Cache integration
//!
//! Read-through lookup across an ordered list of adapters and
//! write-after-success with duration-gated storage.

mod memory;

pub use self::memory::MemoryCacheAdapter;

use std::sync::Arc;

use chrono::Utc;
use contracts::{CacheAdapter, Cacheable, QueryContext, QueryResult};
use tracing::{debug, instrument};

/// Ordered set of cache adapters
#[derive(Clone)]
pub struct CacheLayer {
    adapters: Arc<[Arc<dyn CacheAdapter>]>,
}

impl CacheLayer {
    pub fn new(adapters: Vec<Arc<dyn CacheAdapter>>) -> Self {
        Self {
            adapters: adapters.into(),
        }
    }

    pub fn adapter_count(&self) -> usize {
        self.adapters.len()
    }

    /// Ask adapters in registration order; the first hit wins
    pub async fn lookup(&self, ctx: &QueryContext, query: &dyn Cacheable) -> Option<QueryResult> {
        for adapter in self.adapters.iter() {
            if let Some(mut result) = adapter.get(ctx, query).await {
                debug!(adapter = adapter.name(), "Cache hit");
                result.loaded_from_cache();
                return Some(result);
            }
        }
        None
    }

    /// Write a successful result back to every adapter
    ///
    /// Skipped for a zero cache duration. A duration too large to represent
    /// as a timestamp stores the result without expiry. Adapters receive the
    /// result already stamped with `cached_at`; `result` is stamped too when
    /// at least one adapter accepted it. Returns that outcome.
    #[instrument(name = "cache_store", skip_all, fields(adapters = self.adapters.len()))]
    pub async fn store(
        &self,
        ctx: &QueryContext,
        query: &dyn Cacheable,
        result: &mut QueryResult,
    ) -> bool {
        let duration = query.cache_duration();
        if duration.is_zero() {
            return false;
        }

        let at = Utc::now();
        let expires_at = chrono::Duration::from_std(duration)
            .ok()
            .and_then(|ttl| at.checked_add_signed(ttl));
        match expires_at {
            Some(expires_at) => result.expires(expires_at),
            None => debug!(?duration, "Cache duration out of range, storing without expiry"),
        }

        let mut stored = result.clone();
        stored.cached(at);

        let mut accepted = false;
        for adapter in self.adapters.iter() {
            // Every adapter receives the write, even after one accepted.
            if adapter.set(ctx, query, &stored).await {
                accepted = true;
            } else {
                debug!(adapter = adapter.name(), "Adapter rejected result");
            }
        }

        if accepted {
            result.cached(at);
        }
        accepted
    }

    /// Drop the stored result from every adapter
    pub async fn expire(&self, ctx: &QueryContext, query: &dyn Cacheable) {
        for adapter in self.adapters.iter() {
            adapter.expire(ctx, query).await;
        }
    }

    /// Shut down every adapter
    pub fn shutdown(&self) {
        for adapter in self.adapters.iter() {
            adapter.shutdown();
            debug!(adapter = adapter.name(), "Cache adapter shut down");
        }
    }
}
