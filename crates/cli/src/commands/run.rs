//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{error, info, warn};

use contracts::BusConfig;

use crate::cli::RunArgs;
use crate::workload::{Workload, WorkloadConfig};

/// Execute the `run` command
pub async fn run_workload(args: &RunArgs) -> Result<()> {
    let mut config = load_config(args)?;

    // Apply CLI overrides
    if let Some(workers) = args.workers {
        info!(workers, "Overriding worker pool size from CLI");
        config.worker_pool_size = Some(workers);
    }
    if let Some(capacity) = args.queue_capacity {
        info!(capacity, "Overriding queue capacity from CLI");
        config.queue_capacity = capacity;
    }
    config_loader::ConfigLoader::validate(&config).context("Invalid bus configuration")?;

    info!(
        workers = config.effective_pool_size(),
        queue_capacity = config.queue_capacity,
        result_buffer = config.result_buffer,
        listener_timeout_ms = config.listener_timeout_ms,
        memory_cache = config.cache.memory,
        "Configuration loaded"
    );

    let workload = Workload::new(WorkloadConfig {
        bus: config,
        queries: args.queries,
        distinct_keys: args.distinct_keys,
        cache_ttl: Duration::from_millis(args.cache_ttl_ms),
        streams: args.streams,
        items: args.items,
        metrics_port: (args.metrics_port != 0).then_some(args.metrics_port),
    });
    workload.start()?;

    let timeout = async {
        match args.timeout {
            0 => std::future::pending::<()>().await,
            secs => tokio::time::sleep(Duration::from_secs(secs)).await,
        }
    };

    info!("Starting workload...");

    tokio::select! {
        result = workload.run() => {
            let stats = result.context("Workload execution failed")?;
            info!(
                queries = stats.queries_ok,
                streams = stats.streams_ok,
                duration_secs = stats.duration.as_secs_f64(),
                throughput = format!("{:.2}", stats.throughput()),
                "Workload completed successfully"
            );
            stats.print_summary();
        }
        _ = timeout => {
            warn!(timeout_secs = args.timeout, "Workload timed out, stopping...");
        }
        _ = shutdown_signal() => {
            warn!("Received shutdown signal, stopping workload...");
        }
    }

    workload.shutdown().await;
    info!("Query bus finished");
    Ok(())
}

/// Load configuration from file, or fall back to defaults
fn load_config(args: &RunArgs) -> Result<BusConfig> {
    let Some(path) = &args.config else {
        info!("No configuration file given, using defaults");
        return Ok(BusConfig::default());
    };

    info!(config = %path.display(), "Loading configuration");
    if !path.exists() {
        anyhow::bail!("Configuration file not found: {}", path.display());
    }

    config_loader::ConfigLoader::load_from_path(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}

/// Resolve on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
