//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 配置文件 -> QueryBus -> 指标 的 e2e 测试
//! - 并发与关闭行为

#[cfg(test)]
mod contract_tests {
    use contracts::{BusConfig, QueryError, QueryResult};

    #[test]
    fn test_default_config_snapshot() {
        let json = serde_json::to_value(BusConfig::default()).unwrap();
        assert_eq!(json["queue_capacity"], 100);
        assert_eq!(json["result_buffer"], 0);
        assert_eq!(json["listener_timeout_ms"], 1000);
        assert_eq!(json["cache"]["memory"], true);
        assert!(json["worker_pool_size"].is_null());
    }

    #[test]
    fn test_error_kind_snapshot() {
        assert_eq!(QueryError::InvalidQuery.kind(), "invalid_query");
        assert_eq!(QueryError::ShuttingDown.kind(), "shutting_down");
        assert_eq!(
            QueryError::no_handlers_found("Q").kind(),
            "no_handlers_found"
        );
    }

    #[test]
    fn test_result_serializes_without_stop_flag() {
        let mut result = QueryResult::new();
        result.add("bar");
        result.stop_propagation();

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["data"], serde_json::json!(["bar"]));
        assert!(json.get("propagation_stopped").is_none());
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use bytes::Bytes;
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{
        async_trait, Cacheable, ErrorHandler, Handler, HandlerError, IteratorHandler,
        IteratorResult, Query, QueryContext, QueryError, QueryResult,
    };
    use observability::{LatencyAggregator, QueryKind};
    use query_bus::QueryBus;
    use serde_json::json;

    struct Lookup(&'static str);

    impl Query for Lookup {
        fn id(&self) -> Bytes {
            Bytes::from(format!("lookup:{}", self.0))
        }

        fn as_cacheable(&self) -> Option<&dyn Cacheable> {
            Some(self)
        }
    }

    impl Cacheable for Lookup {
        fn cache_key(&self) -> Bytes {
            Bytes::from_static(self.0.as_bytes())
        }

        fn cache_duration(&self) -> Duration {
            Duration::from_secs(30)
        }
    }

    struct Range(u32);

    impl Query for Range {
        fn id(&self) -> Bytes {
            Bytes::from(format!("range:{}", self.0))
        }
    }

    #[derive(Default)]
    struct LookupHandler {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Handler for LookupHandler {
        async fn handle(
            &self,
            _ctx: &QueryContext,
            query: &dyn Query,
            result: &mut QueryResult,
        ) -> Result<(), HandlerError> {
            if let Some(lookup) = query.downcast_ref::<Lookup>() {
                self.calls.fetch_add(1, Ordering::SeqCst);
                result.add(lookup.0.to_uppercase());
            }
            Ok(())
        }
    }

    struct RangeHandler;

    #[async_trait]
    impl IteratorHandler for RangeHandler {
        async fn handle(
            &self,
            _ctx: &QueryContext,
            query: &dyn Query,
            result: &mut IteratorResult,
        ) -> Result<(), HandlerError> {
            let Some(range) = query.downcast_ref::<Range>() else {
                return Ok(());
            };
            for n in 0..range.0 {
                result.yield_value(n).await;
            }
            result.done();
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct ErrorLog {
        entries: Arc<Mutex<HashMap<String, &'static str>>>,
    }

    #[async_trait]
    impl ErrorHandler for ErrorLog {
        async fn handle(&self, _ctx: &QueryContext, query: &dyn Query, error: &QueryError) {
            self.entries
                .lock()
                .unwrap()
                .insert(query.id_string(), error.kind());
        }
    }

    const CONFIG: &str = r#"
worker_pool_size = 3
queue_capacity = 8
result_buffer = 4
listener_timeout_ms = 100
"#;

    /// End-to-end: config file -> QueryBus -> cache -> workers -> shutdown
    #[tokio::test]
    async fn test_e2e_config_to_bus() {
        let config = ConfigLoader::load_from_str(CONFIG, ConfigFormat::Toml).unwrap();
        let lookup = Arc::new(LookupHandler::default());
        let errors = ErrorLog::default();

        let bus = Arc::new(
            QueryBus::from_config(config)
                .handlers(vec![lookup.clone() as Arc<dyn Handler>])
                .error_handler(errors.clone())
                .build(),
        );
        assert_eq!(bus.result_buffer(), 4);
        assert!(bus.initialize(vec![Arc::new(RangeHandler) as Arc<dyn IteratorHandler>]));
        assert_eq!(bus.worker_count(), 3);

        let ctx = QueryContext::new();

        // Synchronous path with cache write-back
        for _ in 0..3 {
            let result = bus.query(&ctx, &Lookup("alpha")).await.unwrap();
            assert_eq!(result.data(), &[json!("ALPHA")]);
        }
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 1);

        // Streaming path: more streams than workers
        let mut consumers = Vec::new();
        for n in 1..=6u32 {
            let bus = Arc::clone(&bus);
            let ctx = ctx.clone();
            consumers.push(tokio::spawn(async move {
                let receiver = bus.query_iterator(&ctx, Arc::new(Range(n))).await?;
                Ok::<_, QueryError>(receiver.collect().await.len())
            }));
        }
        let mut lengths = Vec::new();
        for consumer in consumers {
            lengths.push(consumer.await.unwrap().unwrap());
        }
        assert_eq!(lengths, vec![1, 2, 3, 4, 5, 6]);

        // Unknown streaming query closes the stream and reaches the fan-out
        let receiver = bus
            .query_iterator(&ctx, Arc::new(Lookup("beta")))
            .await
            .unwrap();
        assert!(receiver.collect().await.is_empty());

        bus.shutdown().await;
        assert_eq!(bus.worker_count(), 0);

        let stats = bus.stats();
        assert_eq!(stats.queries, 3);
        assert_eq!(stats.cache_hits, 2);
        assert_eq!(stats.iterator_queries, 7);
        assert_eq!(stats.iterator_completed, 6);
        assert_eq!(
            errors.entries.lock().unwrap().get("lookup:beta").copied(),
            Some("no_handlers_found")
        );

        observability::record_bus_stats(&stats);
    }

    /// A stream nobody listens to is abandoned after the listener timeout
    #[tokio::test]
    async fn test_e2e_unconsumed_stream_times_out() {
        let errors = ErrorLog::default();
        let bus = QueryBus::builder()
            .worker_pool_size(1)
            .listener_timeout(Duration::from_millis(30))
            .error_handler(errors.clone())
            .build();
        bus.initialize(vec![Arc::new(RangeHandler) as Arc<dyn IteratorHandler>]);

        let receiver = bus
            .query_iterator(&QueryContext::new(), Arc::new(Range(3)))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(receiver.is_closed());
        assert_eq!(bus.stats().iterator_timeouts, 1);
        assert_eq!(
            errors.entries.lock().unwrap().get("range:3").copied(),
            Some("query_timed_out")
        );

        bus.shutdown().await;
    }

    struct Broken(u32);

    impl Query for Broken {
        fn id(&self) -> Bytes {
            Bytes::from(format!("broken:{}", self.0))
        }
    }

    /// Yields the values below the threshold, then fails
    struct BrokenHandler;

    #[async_trait]
    impl IteratorHandler for BrokenHandler {
        async fn handle(
            &self,
            _ctx: &QueryContext,
            query: &dyn Query,
            result: &mut IteratorResult,
        ) -> Result<(), HandlerError> {
            let Some(broken) = query.downcast_ref::<Broken>() else {
                return Ok(());
            };
            for n in 0..broken.0 {
                result.yield_value(n).await;
            }
            Err(format!("failed after {} values", broken.0).into())
        }
    }

    /// A failing iterator handler reaches the error handlers; the consumer
    /// only sees its stream end
    #[tokio::test]
    async fn test_e2e_iterator_handler_error_closes_stream() {
        let errors = ErrorLog::default();
        let bus = QueryBus::builder()
            .worker_pool_size(2)
            .error_handler(errors.clone())
            .build();
        bus.initialize(vec![
            Arc::new(BrokenHandler) as Arc<dyn IteratorHandler>,
            Arc::new(RangeHandler) as Arc<dyn IteratorHandler>,
        ]);
        let ctx = QueryContext::new();

        let receiver = bus
            .query_iterator(&ctx, Arc::new(Broken(2)))
            .await
            .unwrap();
        assert_eq!(receiver.collect().await, vec![json!(0), json!(1)]);

        let receiver = bus
            .query_iterator(&ctx, Arc::new(Broken(0)))
            .await
            .unwrap();
        assert!(receiver.collect().await.is_empty());

        // Later streams on the same workers are unaffected
        let receiver = bus.query_iterator(&ctx, Arc::new(Range(3))).await.unwrap();
        assert_eq!(receiver.collect().await.len(), 3);

        bus.shutdown().await;

        let entries = errors.entries.lock().unwrap();
        assert_eq!(entries.get("broken:2").copied(), Some("handler"));
        assert_eq!(entries.get("broken:0").copied(), Some("handler"));
        assert_eq!(entries.len(), 2);
        drop(entries);

        let stats = bus.stats();
        assert_eq!(stats.iterator_queries, 3);
        assert_eq!(stats.iterator_completed, 1);
    }

    /// Concurrent shutdown callers all return
    #[tokio::test]
    async fn test_e2e_concurrent_shutdown() {
        let bus = Arc::new(QueryBus::builder().worker_pool_size(4).build());
        bus.initialize(vec![Arc::new(RangeHandler) as Arc<dyn IteratorHandler>]);

        let calls: Vec<_> = (0..4)
            .map(|_| {
                let bus = Arc::clone(&bus);
                tokio::spawn(async move { bus.shutdown().await })
            })
            .collect();
        for call in calls {
            tokio::time::timeout(Duration::from_secs(5), call)
                .await
                .unwrap()
                .unwrap();
        }

        // The draining caller may still be finishing; wait for it.
        tokio::time::timeout(Duration::from_secs(5), async {
            while bus.is_initialized() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        assert_eq!(bus.worker_count(), 0);
    }

    #[test]
    fn test_latency_aggregator_with_bus_stats() {
        let mut latency = LatencyAggregator::new();
        latency.observe(QueryKind::Sync, 0.5);
        latency.observe_failure(QueryKind::Iterator, "shutting_down");

        let summary = latency.summary(Default::default()).to_string();
        assert!(summary.contains("Failed queries: 1"));
    }
}
