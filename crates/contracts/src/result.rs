//! QueryResult - synchronous result container
//!
//! Owned by the bus for the duration of one dispatch, mutated by the
//! handler chain, then either written back to the cache or handed to the
//! caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Cache metadata attached to a result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheMeta {
    /// Result was served by a cache adapter
    #[serde(default)]
    pub from_cache: bool,

    /// When at least one adapter accepted the result
    #[serde(default)]
    pub cached_at: Option<DateTime<Utc>>,

    /// When the cached result stops being valid
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Result of a synchronous query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Accumulated values
    data: Vec<Value>,

    /// Set once any handler contributed data (or called `done`)
    handled: bool,

    /// Chain control flag, meaningless outside a dispatch
    #[serde(skip)]
    propagation_stopped: bool,

    /// Cache metadata
    #[serde(default)]
    cache: CacheMeta,
}

impl QueryResult {
    /// Create an empty, unhandled result
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the accumulated values and mark the result handled
    pub fn set<I, V>(&mut self, values: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.data = values.into_iter().map(Into::into).collect();
        self.handled = true;
    }

    /// Append one value and mark the result handled
    pub fn add(&mut self, value: impl Into<Value>) {
        self.data.push(value.into());
        self.handled = true;
    }

    /// Mark the result handled without contributing data
    pub fn done(&mut self) {
        self.handled = true;
    }

    /// End the handler chain after the current handler
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn data(&self) -> &[Value] {
        &self.data
    }

    pub fn into_data(self) -> Vec<Value> {
        self.data
    }

    pub fn first(&self) -> Option<&Value> {
        self.data.first()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_handled(&self) -> bool {
        self.handled
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }

    pub fn cache_meta(&self) -> &CacheMeta {
        &self.cache
    }

    /// Served by a cache adapter instead of the handler chain
    pub fn is_from_cache(&self) -> bool {
        self.cache.from_cache
    }

    /// Accepted by at least one cache adapter
    pub fn is_cached(&self) -> bool {
        self.cache.cached_at.is_some()
    }

    pub fn cached_at(&self) -> Option<DateTime<Utc>> {
        self.cache.cached_at
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.cache.expires_at
    }

    /// Check expiry against `now`; results without expiry never expire
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.cache.expires_at.is_some_and(|at| at <= now)
    }

    /// Mark the result as served from cache
    ///
    /// Called by the bus on an adapter hit.
    pub fn loaded_from_cache(&mut self) {
        self.cache.from_cache = true;
        self.propagation_stopped = false;
    }

    /// Record the expiry computed by the bus before write-back
    pub fn expires(&mut self, at: DateTime<Utc>) {
        self.cache.expires_at = Some(at);
    }

    /// Record when the result was written to the cache
    pub fn cached(&mut self, at: DateTime<Utc>) {
        self.cache.cached_at = Some(at);
    }
}
