//! Query Bus 指标收集模块
//!
//! 将 `BusStats` 快照与查询延迟发布到 `metrics` facade，
//! 并在内存中聚合延迟统计以便输出摘要。

use contracts::BusStats;
use metrics::{counter, gauge, histogram};

/// 查询种类标签
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    /// 同步查询
    Sync,
    /// 流式 (iterator) 查询
    Iterator,
}

impl QueryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sync => "sync",
            Self::Iterator => "iterator",
        }
    }
}

/// 从 BusStats 快照记录指标
///
/// 快照是累计值，计数器使用 `absolute` 直接覆盖。
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_bus_stats;
///
/// record_bus_stats(&bus.stats());
/// ```
pub fn record_bus_stats(stats: &BusStats) {
    counter!("query_bus_queries_total").absolute(stats.queries);
    counter!("query_bus_cache_hits_total").absolute(stats.cache_hits);
    counter!("query_bus_cache_stores_total").absolute(stats.cache_stores);
    counter!("query_bus_iterator_queries_total").absolute(stats.iterator_queries);
    counter!("query_bus_iterator_completed_total").absolute(stats.iterator_completed);
    counter!("query_bus_iterator_timeouts_total").absolute(stats.iterator_timeouts);
    counter!("query_bus_errors_total").absolute(stats.errors);

    gauge!("query_bus_workers").set(stats.workers as f64);
    gauge!("query_bus_cache_hit_rate").set(stats.cache_hit_rate());
}

/// 记录单次查询延迟 (从提交到结果可用)
pub fn record_query_latency_ms(kind: QueryKind, latency_ms: f64) {
    histogram!("query_bus_query_latency_ms", "kind" => kind.as_str()).record(latency_ms);
}

/// 记录查询失败
pub fn record_query_error(kind: QueryKind, error_kind: &'static str) {
    counter!(
        "query_bus_query_errors_total",
        "kind" => kind.as_str(),
        "error" => error_kind
    )
    .increment(1);
}

/// 记录 iterator 查询产出的元素数
pub fn record_iterator_items(items: usize) {
    histogram!("query_bus_iterator_items").record(items as f64);
}

/// 查询延迟聚合器
///
/// 在内存中聚合延迟，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct LatencyAggregator {
    /// 同步查询延迟 (毫秒)
    pub sync: RunningStats,

    /// iterator 查询延迟 (毫秒，到流关闭为止)
    pub iterator: RunningStats,

    /// 失败查询数
    pub failures: u64,
}

impl LatencyAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一次成功查询，并发布到 metrics
    pub fn observe(&mut self, kind: QueryKind, latency_ms: f64) {
        record_query_latency_ms(kind, latency_ms);
        match kind {
            QueryKind::Sync => self.sync.push(latency_ms),
            QueryKind::Iterator => self.iterator.push(latency_ms),
        }
    }

    /// 记录一次失败查询
    pub fn observe_failure(&mut self, kind: QueryKind, error_kind: &'static str) {
        record_query_error(kind, error_kind);
        self.failures += 1;
    }

    /// 生成摘要报告
    pub fn summary(&self, stats: BusStats) -> MetricsSummary {
        MetricsSummary {
            stats,
            failures: self.failures,
            sync_latency_ms: StatsSummary::from(&self.sync),
            iterator_latency_ms: StatsSummary::from(&self.iterator),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub stats: BusStats,
    pub failures: u64,
    pub sync_latency_ms: StatsSummary,
    pub iterator_latency_ms: StatsSummary,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stats = &self.stats;
        writeln!(f, "=== Query Bus Summary ===")?;
        writeln!(
            f,
            "Queries: {} (cache hits: {}, {:.2}%)",
            stats.queries,
            stats.cache_hits,
            stats.cache_hit_rate()
        )?;
        writeln!(f, "Cache stores: {}", stats.cache_stores)?;
        writeln!(
            f,
            "Iterator queries: {} (completed: {}, timed out: {})",
            stats.iterator_queries, stats.iterator_completed, stats.iterator_timeouts
        )?;
        writeln!(f, "Errors reported: {}", stats.errors)?;
        writeln!(f, "Failed queries: {}", self.failures)?;
        writeln!(f, "Sync latency (ms): {}", self.sync_latency_ms)?;
        writeln!(f, "Iterator latency (ms): {}", self.iterator_latency_ms)?;
        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            return write!(f, "N/A");
        }
        write!(
            f,
            "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
            self.min, self.max, self.mean, self.std_dev, self.count
        )
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            return;
        }

        self.min = self.min.min(value);
        self.max = self.max.max(value);
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 { 0.0 } else { self.mean }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }
}
