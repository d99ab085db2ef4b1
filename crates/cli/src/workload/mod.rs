//! Demo workload driving a query bus.

mod handlers;
mod runner;
mod stats;

pub use handlers::{CountdownHandler, CountdownQuery, EchoHandler, EchoQuery, ErrorCounter};
pub use runner::{Workload, WorkloadConfig};
pub use stats::WorkloadStats;
