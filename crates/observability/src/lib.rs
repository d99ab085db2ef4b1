//! # Observability
//!
//! 查询总线的日志与指标引导。
//!
//! ## 功能
//!
//! - Tracing 初始化 (JSON/Pretty/Compact 格式)，总线相关 target 默认按所选级别输出，
//!   其余依赖默认只输出 warn
//! - 过滤器优先级：`QUERY_BUS_LOG` > `RUST_LOG` > 默认指令
//! - 可选 Prometheus 指标导出
//! - BusStats 快照发布与查询延迟统计
//!
//! ## 使用示例
//!
//! ```ignore
//! use observability::{LogFormat, ObservabilityConfig};
//!
//! observability::init_with_config(
//!     ObservabilityConfig::new(LogFormat::Compact, "debug").with_metrics_port(9000),
//! )?;
//!
//! // 周期性发布总线指标
//! observability::record_bus_stats(&bus.stats());
//! ```

pub mod metrics;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

// Re-exports
pub use crate::metrics::{
    record_bus_stats, record_iterator_items, record_query_error, record_query_latency_ms,
    LatencyAggregator, MetricsSummary, QueryKind, RunningStats, StatsSummary,
};

/// 覆盖全部日志过滤指令的环境变量
pub const LOG_ENV: &str = "QUERY_BUS_LOG";

/// 默认日志级别适用的 target；其余 target 只输出 warn
pub const BUS_TARGETS: &[&str] = &["query_bus", "contracts", "config_loader", "observability"];

/// 可观测性配置
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// 日志格式
    pub log_format: LogFormat,
    /// Prometheus 端口 (None = 禁用)
    pub metrics_port: Option<u16>,
    /// 总线 target 的默认级别
    pub level: String,
}

impl ObservabilityConfig {
    /// 仅日志，不导出指标
    pub fn new(log_format: LogFormat, level: impl Into<String>) -> Self {
        Self {
            log_format,
            metrics_port: None,
            level: level.into(),
        }
    }

    /// 同时在 0.0.0.0:port 导出 Prometheus 指标
    pub fn with_metrics_port(mut self, port: u16) -> Self {
        self.metrics_port = Some(port);
        self
    }

    /// 未设置环境变量时使用的过滤指令
    pub fn default_directives(&self) -> String {
        let mut directives = String::from("warn");
        for target in BUS_TARGETS {
            directives.push_str(&format!(",{target}={}", self.level));
        }
        directives
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_env(LOG_ENV)
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new(self.default_directives()))
    }
}

/// 日志格式
#[derive(Debug, Clone, Copy, Default)]
pub enum LogFormat {
    /// JSON 结构化日志
    #[default]
    Json,
    /// 人类可读格式
    Pretty,
    /// 紧凑单行格式
    Compact,
}

/// 初始化 Tracing，并按配置安装 Prometheus exporter
///
/// 导出指标时需要在 tokio runtime 内调用。
pub fn init_with_config(config: ObservabilityConfig) -> Result<()> {
    let fmt_layer = match config.log_format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
        LogFormat::Compact => fmt::layer().compact().boxed(),
    };

    tracing_subscriber::registry()
        .with(config.env_filter())
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    if let Some(port) = config.metrics_port {
        install_prometheus(port)?;
    }

    tracing::info!(
        log_format = ?config.log_format,
        level = %config.level,
        metrics_port = ?config.metrics_port,
        "Observability initialized"
    );

    Ok(())
}

/// 仅安装 Prometheus exporter（Tracing 已初始化时使用）
pub fn init_metrics_only(port: u16) -> Result<()> {
    install_prometheus(port)
}

fn install_prometheus(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .with_context(|| format!("Failed to install Prometheus recorder on port {port}"))?;

    tracing::info!(port, "Prometheus metrics endpoint initialized");
    Ok(())
}
