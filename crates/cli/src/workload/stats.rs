//! Workload statistics.

use std::time::Duration;

use contracts::BusStats;
use observability::LatencyAggregator;

/// Statistics from a workload run
#[derive(Debug, Clone, Default)]
pub struct WorkloadStats {
    /// Synchronous queries that returned a result
    pub queries_ok: u64,

    /// Iterator streams consumed to the end
    pub streams_ok: u64,

    /// Items received across all streams
    pub items_received: u64,

    /// Values produced by the echo handler (cache misses)
    pub handler_invocations: u64,

    /// Errors seen by the error handler
    pub errors_observed: u64,

    /// Total duration of the run
    pub duration: Duration,

    /// Final bus counters
    pub bus: BusStats,

    /// Per-query latency aggregator
    pub latency: LatencyAggregator,
}

impl WorkloadStats {
    /// Completed queries (both kinds) per second
    pub fn throughput(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            (self.queries_ok + self.streams_ok) as f64 / secs
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n=== Workload Statistics ===\n");
        println!("Duration: {:.2}s", self.duration.as_secs_f64());
        println!("Throughput: {:.2} queries/s", self.throughput());
        println!("Sync queries ok: {}", self.queries_ok);
        println!("Handler invocations: {}", self.handler_invocations);
        println!(
            "Streams ok: {} ({} items)",
            self.streams_ok, self.items_received
        );
        println!("Errors observed: {}", self.errors_observed);
        println!();
        print!("{}", self.latency.summary(self.bus));
        println!();
    }
}
