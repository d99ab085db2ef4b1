//! QueryBus - dispatch core
//!
//! Synchronous queries run the handler chain on the calling task, behind
//! the cache layer. Iterator queries are enqueued for the worker pool and
//! return their consumer handle immediately.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use contracts::{
    iterator_channel, BusConfig, BusStats, CacheAdapter, Cacheable, ErrorHandler, Handler,
    IteratorHandler, IteratorReceiver, Query, QueryContext, QueryError, QueryResult, SharedQuery,
};
use tracing::{debug, info, instrument};

use crate::cache::{CacheLayer, MemoryCacheAdapter};
use crate::chain::run_handlers;
use crate::fanout::ErrorFanout;
use crate::metrics::BusMetrics;
use crate::worker::{PendingQuery, PendingRun, WorkerPool, WorkerShared};

/// Builder for creating a QueryBus
pub struct QueryBusBuilder {
    config: BusConfig,
    handlers: Vec<Arc<dyn Handler>>,
    error_handlers: Vec<Arc<dyn ErrorHandler>>,
    cache_adapters: Option<Vec<Arc<dyn CacheAdapter>>>,
}

impl Default for QueryBusBuilder {
    fn default() -> Self {
        Self::new(BusConfig::default())
    }
}

impl QueryBusBuilder {
    /// Create a new QueryBusBuilder
    pub fn new(config: BusConfig) -> Self {
        Self {
            config,
            handlers: Vec::new(),
            error_handlers: Vec::new(),
            cache_adapters: None,
        }
    }

    /// Append a query handler; handlers run in registration order
    pub fn handler(mut self, handler: impl Handler + 'static) -> Self {
        self.handlers.push(Arc::new(handler));
        self
    }

    /// Replace the query handlers
    pub fn handlers(mut self, handlers: Vec<Arc<dyn Handler>>) -> Self {
        self.handlers = handlers;
        self
    }

    /// Append an error handler
    pub fn error_handler(mut self, handler: impl ErrorHandler + 'static) -> Self {
        self.error_handlers.push(Arc::new(handler));
        self
    }

    /// Replace the error handlers
    pub fn error_handlers(mut self, handlers: Vec<Arc<dyn ErrorHandler>>) -> Self {
        self.error_handlers = handlers;
        self
    }

    /// Use these adapters instead of the default in-memory adapter
    pub fn cache_adapters(mut self, adapters: Vec<Arc<dyn CacheAdapter>>) -> Self {
        self.cache_adapters = Some(adapters);
        self
    }

    pub fn worker_pool_size(mut self, size: usize) -> Self {
        self.config.worker_pool_size = Some(size);
        self
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    pub fn result_buffer(mut self, buffer: usize) -> Self {
        self.config.result_buffer = buffer;
        self
    }

    pub fn listener_timeout(mut self, timeout: Duration) -> Self {
        self.config.listener_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Build the bus; the worker pool starts with [`QueryBus::initialize`]
    #[instrument(
        name = "query_bus_builder_build",
        skip(self),
        fields(handlers = self.handlers.len(), error_handlers = self.error_handlers.len())
    )]
    pub fn build(self) -> QueryBus {
        let adapters = match self.cache_adapters {
            Some(adapters) => adapters,
            None if self.config.cache.memory => {
                vec![Arc::new(MemoryCacheAdapter::new()) as Arc<dyn CacheAdapter>]
            }
            None => Vec::new(),
        };
        debug!(adapters = adapters.len(), "Cache adapters registered");

        let metrics = Arc::new(BusMetrics::new());

        QueryBus {
            handlers: self.handlers.into(),
            cache: CacheLayer::new(adapters),
            errors: ErrorFanout::new(self.error_handlers, Arc::clone(&metrics)),
            metrics,
            worker_pool_size: AtomicUsize::new(self.config.effective_pool_size()),
            queue_capacity: AtomicUsize::new(self.config.queue_capacity),
            result_buffer: AtomicUsize::new(self.config.result_buffer),
            listener_timeout: self.config.listener_timeout(),
            initialized: AtomicBool::new(false),
            shutting_down: Arc::new(AtomicBool::new(false)),
            workers: AtomicUsize::new(0),
            pool: Mutex::new(None),
        }
    }
}

/// The query bus
pub struct QueryBus {
    handlers: Arc<[Arc<dyn Handler>]>,
    cache: CacheLayer,
    errors: ErrorFanout,
    metrics: Arc<BusMetrics>,
    worker_pool_size: AtomicUsize,
    queue_capacity: AtomicUsize,
    result_buffer: AtomicUsize,
    listener_timeout: Duration,
    initialized: AtomicBool,
    shutting_down: Arc<AtomicBool>,
    workers: AtomicUsize,
    pool: Mutex<Option<WorkerPool>>,
}

impl QueryBus {
    /// Builder with default configuration
    pub fn builder() -> QueryBusBuilder {
        QueryBusBuilder::default()
    }

    /// Builder seeded from a loaded configuration
    pub fn from_config(config: BusConfig) -> QueryBusBuilder {
        QueryBusBuilder::new(config)
    }

    /// Start the iterator worker pool
    ///
    /// Only the first call after construction (or after a completed
    /// shutdown) has an effect; returns whether this call started the pool.
    /// Must be called from within a tokio runtime.
    #[instrument(name = "query_bus_initialize", skip_all, fields(iterator_handlers = iterator_handlers.len()))]
    pub fn initialize(&self, iterator_handlers: Vec<Arc<dyn IteratorHandler>>) -> bool {
        // The slot lock orders initialize against shutdown.
        let mut slot = self.pool_slot();
        if self
            .initialized
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Query bus already initialized");
            return false;
        }

        let size = self.worker_pool_size.load(Ordering::Acquire);
        let capacity = self.queue_capacity.load(Ordering::Acquire);
        let shared = Arc::new(WorkerShared {
            handlers: iterator_handlers.into(),
            errors: self.errors.clone(),
            metrics: Arc::clone(&self.metrics),
            shutting_down: Arc::clone(&self.shutting_down),
            listener_timeout: self.listener_timeout,
        });

        *slot = Some(WorkerPool::spawn(size, capacity, shared, &self.workers));
        self.shutting_down.store(false, Ordering::Release);
        drop(slot);

        info!(
            workers = size,
            queue_capacity = capacity,
            "Query bus initialized"
        );
        true
    }

    /// Query for a single result or a pre-populated collection
    ///
    /// Cacheable queries are served from the first adapter holding a result;
    /// otherwise the handler chain runs and a successful result is written
    /// back when the query's cache duration is non-zero. Values added before
    /// a failure are discarded; use [`QueryBus::query_outcome`] to keep them.
    ///
    /// # Errors
    /// `InvalidQuery`, the first handler error, or `NoHandlersFound`.
    pub async fn query(
        &self,
        ctx: &QueryContext,
        query: &dyn Query,
    ) -> Result<QueryResult, QueryError> {
        let (result, outcome) = self.query_outcome(ctx, query).await;
        outcome.map(|()| result)
    }

    /// Like [`QueryBus::query`], but the result is returned even on failure
    ///
    /// On error it holds whatever the handlers produced before the chain
    /// aborted (empty for validation errors). Failed results are never cached.
    #[instrument(name = "query_bus_query", skip_all, fields(query_id = %query.id_string()))]
    pub async fn query_outcome(
        &self,
        ctx: &QueryContext,
        query: &dyn Query,
    ) -> (QueryResult, Result<(), QueryError>) {
        if let Err(e) = self.validate(ctx, query).await {
            return (QueryResult::new(), Err(e));
        }
        self.metrics.inc_queries();

        let cacheable = query.as_cacheable();
        if let Some(result) = self.cached_result(ctx, cacheable).await {
            self.metrics.inc_cache_hits();
            return (result, Ok(()));
        }

        let mut result = QueryResult::new();
        if let Err(e) = run_handlers(&self.handlers, &self.errors, ctx, query, &mut result).await {
            return (result, Err(e));
        }

        if let Some(cacheable) = cacheable {
            if self.cache.store(ctx, cacheable, &mut result).await {
                self.metrics.inc_cache_stores();
            }
        }

        (result, Ok(()))
    }

    /// Query whose results are streamed while they are being produced
    ///
    /// Returns as soon as the request is enqueued; waits only when the work
    /// queue is full. Iterator queries are never cached.
    ///
    /// # Errors
    /// `InvalidQuery`, `NotInitialized` or `ShuttingDown`.
    #[instrument(name = "query_bus_query_iterator", skip_all, fields(query_id = %query.id_string()))]
    pub async fn query_iterator(
        &self,
        ctx: &QueryContext,
        query: SharedQuery,
    ) -> Result<IteratorReceiver, QueryError> {
        self.validate_iterator(ctx, query.as_ref()).await?;

        let sender = self.pool_slot().as_ref().map(WorkerPool::sender);
        let Some(sender) = sender else {
            return Err(self.reject(ctx, query.as_ref(), self.unavailable()).await);
        };

        let (result, receiver) = iterator_channel(self.result_buffer.load(Ordering::Relaxed));
        let pending = PendingQuery::Run(PendingRun {
            ctx: ctx.clone(),
            query: Arc::clone(&query),
            result,
        });

        if sender.send(pending).await.is_err() {
            return Err(self
                .reject(ctx, query.as_ref(), QueryError::ShuttingDown)
                .await);
        }

        self.metrics.inc_iterator_queries();
        Ok(receiver)
    }

    /// Drop the cached result of `query` from every adapter
    pub async fn expire(&self, ctx: &QueryContext, query: &dyn Cacheable) {
        self.cache.expire(ctx, query).await;
    }

    /// Shut the bus down gracefully
    ///
    /// Only the first caller drains the pool; concurrent and later calls
    /// return immediately. Iterator queries still queued are disregarded.
    /// Cache adapters are shut down once every worker stopped.
    ///
    /// After a drain the bus reports `ShuttingDown` to iterator queries until
    /// the next initialize. A bus that was never initialized has nothing to
    /// drain and stays in the uninitialized state.
    #[instrument(name = "query_bus_shutdown", skip(self))]
    pub async fn shutdown(&self) {
        let pool = {
            let mut slot = self.pool_slot();
            if self
                .shutting_down
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                debug!("Query bus shutdown already requested");
                return;
            }
            slot.take()
        };

        info!(
            workers = self.worker_count(),
            "Query bus shutting down"
        );

        let Some(pool) = pool else {
            self.cache.shutdown();
            self.shutting_down.store(false, Ordering::Release);
            info!("Query bus was not initialized, nothing to drain");
            return;
        };

        pool.drain(&self.workers).await;
        self.cache.shutdown();
        self.initialized.store(false, Ordering::Release);

        info!("Query bus shutdown complete");
    }

    /// Adjust the worker pool size; ignored once initialized
    pub fn set_worker_pool_size(&self, size: usize) -> bool {
        if self.is_initialized() {
            return false;
        }
        self.worker_pool_size.store(size, Ordering::Release);
        true
    }

    /// Adjust the work-queue capacity; ignored once initialized
    pub fn set_queue_capacity(&self, capacity: usize) -> bool {
        if self.is_initialized() {
            return false;
        }
        self.queue_capacity.store(capacity, Ordering::Release);
        true
    }

    /// Adjust the delivery buffer of iterator results created from now on
    pub fn set_result_buffer(&self, buffer: usize) {
        self.result_buffer.store(buffer, Ordering::Relaxed);
    }

    pub fn worker_pool_size(&self) -> usize {
        self.worker_pool_size.load(Ordering::Acquire)
    }

    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity.load(Ordering::Acquire)
    }

    pub fn result_buffer(&self) -> usize {
        self.result_buffer.load(Ordering::Relaxed)
    }

    /// Live iterator workers
    pub fn worker_count(&self) -> usize {
        self.workers.load(Ordering::Acquire)
    }

    /// Iterator queries waiting for a worker
    pub fn queued(&self) -> usize {
        self.pool_slot().as_ref().map_or(0, WorkerPool::queued)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    pub fn error_handler_count(&self) -> usize {
        self.errors.len()
    }

    pub fn cache_adapter_count(&self) -> usize {
        self.cache.adapter_count()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::Acquire)
    }

    /// Get snapshot of bus counters
    pub fn stats(&self) -> BusStats {
        self.metrics.snapshot(self.worker_count())
    }

    async fn cached_result(
        &self,
        ctx: &QueryContext,
        cacheable: Option<&dyn Cacheable>,
    ) -> Option<QueryResult> {
        match cacheable {
            Some(cacheable) => self.cache.lookup(ctx, cacheable).await,
            None => None,
        }
    }

    async fn validate(&self, ctx: &QueryContext, query: &dyn Query) -> Result<(), QueryError> {
        if query.id().is_empty() {
            return Err(self.reject(ctx, query, QueryError::InvalidQuery).await);
        }
        Ok(())
    }

    async fn validate_iterator(
        &self,
        ctx: &QueryContext,
        query: &dyn Query,
    ) -> Result<(), QueryError> {
        self.validate(ctx, query).await?;
        if self.is_shutting_down() {
            return Err(self.reject(ctx, query, QueryError::ShuttingDown).await);
        }
        if !self.is_initialized() {
            return Err(self.reject(ctx, query, QueryError::NotInitialized).await);
        }
        Ok(())
    }

    /// Error for an iterator query that found no running pool
    fn unavailable(&self) -> QueryError {
        if self.is_shutting_down() {
            QueryError::ShuttingDown
        } else {
            QueryError::NotInitialized
        }
    }

    /// Report a validation error and hand it back for returning
    async fn reject(&self, ctx: &QueryContext, query: &dyn Query, err: QueryError) -> QueryError {
        self.errors.report(ctx, query, &err).await;
        err
    }

    fn pool_slot(&self) -> MutexGuard<'_, Option<WorkerPool>> {
        self.pool.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use contracts::{async_trait, HandlerError, IteratorResult};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::AtomicU32;

    struct TestQuery;

    impl Query for TestQuery {
        fn id(&self) -> Bytes {
            Bytes::from_static(b"UUID")
        }
    }

    struct ErrorQuery;

    impl Query for ErrorQuery {
        fn id(&self) -> Bytes {
            Bytes::from_static(b"UUID-ERROR")
        }
    }

    struct UnsupportedQuery;

    impl Query for UnsupportedQuery {
        fn id(&self) -> Bytes {
            Bytes::from_static(b"UUID-UNSUPPORTED")
        }
    }

    struct NilQuery;

    impl Query for NilQuery {
        fn id(&self) -> Bytes {
            Bytes::new()
        }
    }

    struct CacheQuery {
        key: &'static [u8],
        duration: Duration,
    }

    impl Query for CacheQuery {
        fn id(&self) -> Bytes {
            Bytes::from_static(b"UUID-CACHE")
        }

        fn as_cacheable(&self) -> Option<&dyn Cacheable> {
            Some(self)
        }
    }

    impl Cacheable for CacheQuery {
        fn cache_key(&self) -> Bytes {
            Bytes::from_static(self.key)
        }

        fn cache_duration(&self) -> Duration {
            self.duration
        }
    }

    #[derive(Default)]
    struct TestHandler {
        calls: AtomicU32,
    }

    #[async_trait]
    impl Handler for TestHandler {
        async fn handle(
            &self,
            _ctx: &QueryContext,
            query: &dyn Query,
            result: &mut QueryResult,
        ) -> Result<(), HandlerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if query.is::<TestQuery>() || query.is::<CacheQuery>() {
                result.add("bar");
            }
            if query.is::<ErrorQuery>() {
                return Err("query failed".into());
            }
            Ok(())
        }
    }

    struct TestIteratorHandler;

    #[async_trait]
    impl IteratorHandler for TestIteratorHandler {
        async fn handle(
            &self,
            _ctx: &QueryContext,
            query: &dyn Query,
            result: &mut IteratorResult,
        ) -> Result<(), HandlerError> {
            if query.is::<TestQuery>() {
                result.yield_value("bar").await;
                result.done();
            }
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct StoreErrors {
        errs: Arc<Mutex<HashMap<String, String>>>,
    }

    impl StoreErrors {
        fn error(&self, key: &str) -> Option<String> {
            self.errs.lock().unwrap().get(key).cloned()
        }
    }

    #[async_trait]
    impl ErrorHandler for StoreErrors {
        async fn handle(&self, _ctx: &QueryContext, query: &dyn Query, error: &QueryError) {
            let key = match query.id_string() {
                id if id.is_empty() => "nil".to_string(),
                id => id,
            };
            self.errs.lock().unwrap().insert(key, error.to_string());
        }
    }

    fn iterator_handlers() -> Vec<Arc<dyn IteratorHandler>> {
        vec![Arc::new(TestIteratorHandler)]
    }

    #[tokio::test]
    async fn test_query_scenarios() {
        let errors = StoreErrors::default();
        let bus = QueryBus::builder()
            .handler(TestHandler::default())
            .error_handler(errors.clone())
            .build();
        let ctx = QueryContext::new();

        let res = bus.query(&ctx, &TestQuery).await.unwrap();
        assert_eq!(res.data(), &[json!("bar")]);

        let err = bus.query(&ctx, &ErrorQuery).await.unwrap_err();
        assert_eq!(err.to_string(), "query failed");
        assert_eq!(errors.error("UUID-ERROR").as_deref(), Some("query failed"));

        let err = bus.query(&ctx, &UnsupportedQuery).await.unwrap_err();
        assert!(matches!(err, QueryError::NoHandlersFound { .. }));
        assert!(errors.error("UUID-UNSUPPORTED").is_some());

        let err = bus.query(&ctx, &NilQuery).await.unwrap_err();
        assert!(matches!(err, QueryError::InvalidQuery));
        assert!(errors.error("nil").is_some());
    }

    #[tokio::test]
    async fn test_query_iterator_requires_initialize() {
        let bus = QueryBus::builder().build();
        let err = bus
            .query_iterator(&QueryContext::new(), Arc::new(TestQuery))
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::NotInitialized));
    }

    #[tokio::test]
    async fn test_query_iterator_yields_and_closes() {
        let bus = QueryBus::builder().worker_pool_size(2).build();
        assert!(bus.initialize(iterator_handlers()));
        assert!(!bus.initialize(iterator_handlers()));
        assert_eq!(bus.worker_count(), 2);

        let receiver = bus
            .query_iterator(&QueryContext::new(), Arc::new(TestQuery))
            .await
            .unwrap();
        assert_eq!(receiver.collect().await, vec![json!("bar")]);

        bus.shutdown().await;
    }

    #[tokio::test]
    async fn test_cached_query_skips_handlers() {
        let handler = Arc::new(TestHandler::default());
        let bus = QueryBus::builder()
            .handlers(vec![handler.clone() as Arc<dyn Handler>])
            .build();
        let ctx = QueryContext::new();
        let query = CacheQuery {
            key: b"CACHE-KEY",
            duration: Duration::from_secs(60),
        };

        let first = bus.query(&ctx, &query).await.unwrap();
        assert!(first.is_cached());
        assert!(!first.is_from_cache());

        let second = bus.query(&ctx, &query).await.unwrap();
        assert!(second.is_from_cache());
        assert_eq!(second.data(), first.data());
        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);

        let stats = bus.stats();
        assert_eq!(stats.queries, 2);
        assert_eq!(stats.cache_hits, 1);
        assert_eq!(stats.cache_stores, 1);

        bus.expire(&ctx, &query).await;
        assert!(!bus.query(&ctx, &query).await.unwrap().is_from_cache());
        assert_eq!(handler.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_zero_duration_is_not_cached() {
        let handler = Arc::new(TestHandler::default());
        let bus = QueryBus::builder()
            .handlers(vec![handler.clone() as Arc<dyn Handler>])
            .build();
        let ctx = QueryContext::new();
        let query = CacheQuery {
            key: b"CACHE-KEY-2",
            duration: Duration::ZERO,
        };

        assert!(!bus.query(&ctx, &query).await.unwrap().is_cached());
        assert!(!bus.query(&ctx, &query).await.unwrap().is_from_cache());
        assert_eq!(handler.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent_and_blocks_iterators() {
        let bus = QueryBus::builder().worker_pool_size(4).build();
        bus.initialize(iterator_handlers());

        bus.shutdown().await;
        bus.shutdown().await;

        assert!(bus.is_shutting_down());
        assert!(!bus.is_initialized());
        assert_eq!(bus.worker_count(), 0);

        let err = bus
            .query_iterator(&QueryContext::new(), Arc::new(TestQuery))
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::ShuttingDown));
    }

    #[tokio::test]
    async fn test_reinitialize_after_shutdown() {
        let bus = QueryBus::builder().worker_pool_size(1).build();
        bus.initialize(iterator_handlers());
        bus.shutdown().await;

        assert!(bus.set_worker_pool_size(3));
        assert!(bus.initialize(iterator_handlers()));
        assert!(!bus.is_shutting_down());
        assert_eq!(bus.worker_count(), 3);
        assert!(!bus.set_queue_capacity(10));

        let receiver = bus
            .query_iterator(&QueryContext::new(), Arc::new(TestQuery))
            .await
            .unwrap();
        assert_eq!(receiver.collect().await, vec![json!("bar")]);

        bus.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_before_initialize_keeps_bus_uninitialized() {
        let bus = QueryBus::builder().build();
        bus.shutdown().await;

        assert!(!bus.is_shutting_down());
        assert!(!bus.is_initialized());

        let err = bus
            .query_iterator(&QueryContext::new(), Arc::new(TestQuery))
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::NotInitialized));

        assert!(bus.initialize(iterator_handlers()));
        bus.shutdown().await;
        assert_eq!(bus.worker_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_initialize_and_shutdown_keep_worker_count() {
        for _ in 0..50 {
            let bus = Arc::new(QueryBus::builder().worker_pool_size(2).build());

            let init = {
                let bus = Arc::clone(&bus);
                tokio::spawn(async move { bus.initialize(iterator_handlers()) })
            };
            let stop = {
                let bus = Arc::clone(&bus);
                tokio::spawn(async move { bus.shutdown().await })
            };
            init.await.unwrap();
            stop.await.unwrap();

            if bus.is_initialized() {
                assert_eq!(bus.worker_count(), 2);
                bus.shutdown().await;
            }
            assert!(!bus.is_initialized());
            assert_eq!(bus.worker_count(), 0);
        }
    }

    struct FailingHandler;

    #[async_trait]
    impl Handler for FailingHandler {
        async fn handle(
            &self,
            _ctx: &QueryContext,
            _query: &dyn Query,
            _result: &mut QueryResult,
        ) -> Result<(), HandlerError> {
            Err("second handler failed".into())
        }
    }

    #[tokio::test]
    async fn test_query_outcome_keeps_partial_result() {
        let bus = QueryBus::builder()
            .handler(TestHandler::default())
            .handler(FailingHandler)
            .build();
        let ctx = QueryContext::new();

        let (partial, outcome) = bus.query_outcome(&ctx, &TestQuery).await;
        assert_eq!(outcome.unwrap_err().to_string(), "second handler failed");
        assert_eq!(partial.data(), &[json!("bar")]);

        let query = CacheQuery {
            key: b"CACHE-KEY-FAIL",
            duration: Duration::from_secs(60),
        };
        let (partial, outcome) = bus.query_outcome(&ctx, &query).await;
        assert!(outcome.is_err());
        assert_eq!(partial.len(), 1);
        assert!(!partial.is_cached());
        assert_eq!(bus.stats().cache_stores, 0);

        assert!(bus.query(&ctx, &TestQuery).await.is_err());
    }

    #[tokio::test]
    async fn test_query_outcome_validation_error_is_empty() {
        let bus = QueryBus::builder().handler(TestHandler::default()).build();
        let (result, outcome) = bus.query_outcome(&QueryContext::new(), &NilQuery).await;
        assert!(matches!(outcome, Err(QueryError::InvalidQuery)));
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_default_cache_adapter_can_be_replaced() {
        assert_eq!(QueryBus::builder().build().cache_adapter_count(), 1);
        assert_eq!(
            QueryBus::builder()
                .cache_adapters(Vec::new())
                .build()
                .cache_adapter_count(),
            0
        );
    }
}
