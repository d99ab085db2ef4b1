//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Query Bus - in-process query dispatch with caching and streaming workers
#[derive(Parser, Debug)]
#[command(
    name = "query-bus",
    author,
    version,
    about = "In-process query bus demo and configuration tool",
    long_about = "Drives a query bus with a demo workload.\n\n\
                  Synchronous echo queries exercise the handler chain and the cache \n\
                  layer; countdown streams exercise the iterator worker pool."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "QUERY_BUS_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "QUERY_BUS_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Default log level derived from -v / -q
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "warn";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the demo workload against a query bus
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON); defaults apply when omitted
    #[arg(short, long, env = "QUERY_BUS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override iterator worker pool size
    #[arg(long, env = "QUERY_BUS_WORKERS")]
    pub workers: Option<usize>,

    /// Override iterator work-queue capacity
    #[arg(long, env = "QUERY_BUS_QUEUE_CAPACITY")]
    pub queue_capacity: Option<usize>,

    /// Synchronous echo queries to issue
    #[arg(long, default_value = "1000")]
    pub queries: u64,

    /// Distinct cache keys the echo queries cycle through
    #[arg(long, default_value = "16")]
    pub distinct_keys: u64,

    /// Cache duration of echo results in milliseconds (0 = no caching)
    #[arg(long, default_value = "60000")]
    pub cache_ttl_ms: u64,

    /// Concurrent countdown streams
    #[arg(long, default_value = "32")]
    pub streams: u64,

    /// Items yielded by each stream
    #[arg(long, default_value = "10")]
    pub items: u32,

    /// Workload timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "QUERY_BUS_TIMEOUT")]
    pub timeout: u64,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "QUERY_BUS_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "bus.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
