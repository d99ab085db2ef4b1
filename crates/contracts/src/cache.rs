//! CacheAdapter trait - storage backend for cacheable query results
//!
//! Adapters are shared across concurrent dispatches and must synchronise
//! internally; the bus never locks around adapter calls.

use async_trait::async_trait;

use crate::{Cacheable, QueryContext, QueryResult};

/// Cache adapter trait
#[async_trait]
pub trait CacheAdapter: Send + Sync {
    /// Adapter name (used for logging)
    fn name(&self) -> &str;

    /// Look up a stored result; `None` is a miss, never an error
    async fn get(&self, ctx: &QueryContext, query: &dyn Cacheable) -> Option<QueryResult>;

    /// Store a result; returns whether the adapter accepted it
    async fn set(&self, ctx: &QueryContext, query: &dyn Cacheable, result: &QueryResult) -> bool;

    /// Drop any stored result for the query
    async fn expire(&self, ctx: &QueryContext, query: &dyn Cacheable);

    /// Release adapter resources
    fn shutdown(&self);
}
