//! Workload runner - builds a bus and drives demo traffic through it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use contracts::{BusConfig, Handler, IteratorHandler, QueryContext, QueryError};
use observability::{record_bus_stats, record_iterator_items, QueryKind};
use query_bus::QueryBus;
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument};

use super::{CountdownHandler, CountdownQuery, EchoHandler, EchoQuery, ErrorCounter, WorkloadStats};

/// Workload configuration
#[derive(Debug, Clone)]
pub struct WorkloadConfig {
    /// Bus settings
    pub bus: BusConfig,

    /// Synchronous echo queries to issue
    pub queries: u64,

    /// Distinct cache keys the echo queries cycle through
    pub distinct_keys: u64,

    /// Cache duration of echo results (zero disables caching)
    pub cache_ttl: Duration,

    /// Concurrent countdown streams
    pub streams: u64,

    /// Items yielded by each stream
    pub items: u32,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Query bus with demo handlers registered
pub struct Workload {
    config: WorkloadConfig,
    bus: Arc<QueryBus>,
    echo: Arc<EchoHandler>,
    errors: ErrorCounter,
    ctx: QueryContext,
}

impl Workload {
    /// Build the bus; call [`Workload::start`] before [`Workload::run`]
    pub fn new(config: WorkloadConfig) -> Self {
        let echo = Arc::new(EchoHandler::default());
        let errors = ErrorCounter::default();

        let bus = QueryBus::from_config(config.bus.clone())
            .handlers(vec![Arc::clone(&echo) as Arc<dyn Handler>])
            .error_handler(errors.clone())
            .build();

        Self {
            config,
            bus: Arc::new(bus),
            echo,
            errors,
            ctx: QueryContext::new(),
        }
    }

    /// Install the metrics exporter (if enabled) and start the worker pool
    pub fn start(&self) -> Result<()> {
        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let iterator_handlers: Vec<Arc<dyn IteratorHandler>> = vec![Arc::new(CountdownHandler)];
        self.bus.initialize(iterator_handlers);
        Ok(())
    }

    /// Run both phases to completion
    pub async fn run(&self) -> Result<WorkloadStats> {
        let start_time = Instant::now();
        let mut stats = WorkloadStats::default();

        self.run_queries(&mut stats).await;
        record_bus_stats(&self.bus.stats());

        self.run_streams(&mut stats).await;

        stats.duration = start_time.elapsed();
        stats.handler_invocations = self.echo.invocations();
        stats.errors_observed = self.errors.count();
        stats.bus = self.bus.stats();
        record_bus_stats(&stats.bus);

        Ok(stats)
    }

    /// Cancel in-flight work and shut the bus down
    pub async fn shutdown(&self) {
        self.ctx.cancel();
        self.bus.shutdown().await;
        record_bus_stats(&self.bus.stats());
    }

    #[instrument(name = "workload_queries", skip_all, fields(queries = self.config.queries))]
    async fn run_queries(&self, stats: &mut WorkloadStats) {
        let keys = self.config.distinct_keys.max(1);

        for i in 0..self.config.queries {
            let query = EchoQuery {
                key: format!("key-{}", i % keys),
                ttl: self.config.cache_ttl,
            };

            let started = Instant::now();
            match self.bus.query(&self.ctx, &query).await {
                Ok(result) => {
                    stats.queries_ok += 1;
                    stats.latency.observe(QueryKind::Sync, elapsed_ms(started));
                    debug!(key = %query.key, from_cache = result.is_from_cache(), "Echo answered");
                }
                Err(e) => stats.latency.observe_failure(QueryKind::Sync, e.kind()),
            }
        }
    }

    #[instrument(name = "workload_streams", skip_all, fields(streams = self.config.streams))]
    async fn run_streams(&self, stats: &mut WorkloadStats) {
        let mut streams = JoinSet::new();

        for stream in 0..self.config.streams {
            let bus = Arc::clone(&self.bus);
            let ctx = self.ctx.child();
            let query = Arc::new(CountdownQuery {
                stream,
                from: self.config.items,
            });

            streams.spawn(async move {
                let started = Instant::now();
                let mut receiver = bus.query_iterator(&ctx, query).await?;
                let mut items = 0u64;
                while receiver.recv().await.is_some() {
                    items += 1;
                }
                Ok::<_, QueryError>((items, elapsed_ms(started)))
            });
        }

        while let Some(joined) = streams.join_next().await {
            match joined {
                Ok(Ok((items, latency_ms))) => {
                    stats.streams_ok += 1;
                    stats.items_received += items;
                    stats.latency.observe(QueryKind::Iterator, latency_ms);
                    record_iterator_items(items as usize);
                }
                Ok(Err(e)) => stats.latency.observe_failure(QueryKind::Iterator, e.kind()),
                Err(e) => error!(error = %e, "Stream consumer panicked"),
            }
        }
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}
