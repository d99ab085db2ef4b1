//! Demo queries and handlers driven by the `run` command.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use contracts::{
    async_trait, Cacheable, ErrorHandler, Handler, HandlerError, IteratorHandler, IteratorResult,
    Query, QueryContext, QueryError, QueryResult,
};
use serde_json::json;
use tracing::trace;

/// Cacheable lookup answered by [`EchoHandler`]
#[derive(Debug, Clone)]
pub struct EchoQuery {
    pub key: String,
    pub ttl: Duration,
}

impl Query for EchoQuery {
    fn id(&self) -> Bytes {
        Bytes::from(format!("echo:{}", self.key))
    }

    fn as_cacheable(&self) -> Option<&dyn Cacheable> {
        Some(self)
    }
}

impl Cacheable for EchoQuery {
    fn cache_key(&self) -> Bytes {
        Bytes::from(self.key.clone())
    }

    fn cache_duration(&self) -> Duration {
        self.ttl
    }
}

/// Streaming query answered by [`CountdownHandler`]
#[derive(Debug, Clone)]
pub struct CountdownQuery {
    pub stream: u64,
    pub from: u32,
}

impl Query for CountdownQuery {
    fn id(&self) -> Bytes {
        Bytes::from(format!("countdown:{}", self.stream))
    }
}

/// Answers [`EchoQuery`] with its key
#[derive(Debug, Default)]
pub struct EchoHandler {
    invocations: AtomicU64,
}

impl EchoHandler {
    /// Times the handler produced a value (cache hits excluded)
    pub fn invocations(&self) -> u64 {
        self.invocations.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Handler for EchoHandler {
    async fn handle(
        &self,
        _ctx: &QueryContext,
        query: &dyn Query,
        result: &mut QueryResult,
    ) -> Result<(), HandlerError> {
        let Some(echo) = query.downcast_ref::<EchoQuery>() else {
            return Ok(());
        };
        self.invocations.fetch_add(1, Ordering::Relaxed);
        result.add(json!({ "key": echo.key }));
        Ok(())
    }
}

/// Yields `from..=1` for [`CountdownQuery`], then ends the chain
#[derive(Debug, Default)]
pub struct CountdownHandler;

#[async_trait]
impl IteratorHandler for CountdownHandler {
    async fn handle(
        &self,
        ctx: &QueryContext,
        query: &dyn Query,
        result: &mut IteratorResult,
    ) -> Result<(), HandlerError> {
        let Some(countdown) = query.downcast_ref::<CountdownQuery>() else {
            return Ok(());
        };

        for n in (1..=countdown.from).rev() {
            if ctx.is_cancelled() || !result.yield_value(n).await {
                trace!(stream = countdown.stream, "Consumer went away");
                break;
            }
        }
        result.done();
        result.stop_propagation();
        Ok(())
    }
}

/// Counts errors delivered through the fan-out
#[derive(Debug, Clone, Default)]
pub struct ErrorCounter {
    count: Arc<AtomicU64>,
}

impl ErrorCounter {
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ErrorHandler for ErrorCounter {
    async fn handle(&self, _ctx: &QueryContext, _query: &dyn Query, _error: &QueryError) {
        self.count.fetch_add(1, Ordering::Relaxed);
    }
}
