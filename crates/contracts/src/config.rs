//! Bus configuration contracts that can be shared across crates.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Default iterator work-queue capacity
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Default time a worker waits for a consumer to attach
pub const DEFAULT_LISTENER_TIMEOUT_MS: u64 = 1000;

/// Query bus configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct BusConfig {
    /// Iterator worker pool size (None = host parallelism)
    #[serde(default)]
    #[validate(range(min = 1))]
    pub worker_pool_size: Option<usize>,

    /// Iterator work-queue capacity
    #[serde(default = "default_queue_capacity")]
    #[validate(range(min = 1))]
    pub queue_capacity: usize,

    /// Delivery buffer of each iterator result
    #[serde(default)]
    pub result_buffer: usize,

    /// Listener readiness timeout in milliseconds
    #[serde(default = "default_listener_timeout_ms")]
    #[validate(range(min = 1))]
    pub listener_timeout_ms: u64,

    /// Cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

fn default_listener_timeout_ms() -> u64 {
    DEFAULT_LISTENER_TIMEOUT_MS
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            worker_pool_size: None,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            result_buffer: 0,
            listener_timeout_ms: DEFAULT_LISTENER_TIMEOUT_MS,
            cache: CacheConfig::default(),
        }
    }
}

impl BusConfig {
    /// Effective worker pool size
    pub fn effective_pool_size(&self) -> usize {
        self.worker_pool_size.unwrap_or_else(host_parallelism)
    }

    pub fn listener_timeout(&self) -> Duration {
        Duration::from_millis(self.listener_timeout_ms)
    }
}

/// Cache configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Register the in-memory adapter
    #[serde(default = "default_memory_cache")]
    pub memory: bool,
}

fn default_memory_cache() -> bool {
    true
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { memory: true }
    }
}

/// Available parallelism of the host, at least 1
pub fn host_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
