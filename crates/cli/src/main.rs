//! # Query Bus CLI
//!
//! 命令行接口入口点。
//!
//! 提供：
//! - 配置加载与验证
//! - 演示负载：同步查询 + 流式查询
//! - 优雅关闭处理

mod cli;
mod commands;
mod workload;

use anyhow::Result;
use clap::Parser;
use observability::ObservabilityConfig;
use tracing::info;

use cli::{Cli, Commands};
use commands::{run_validate, run_workload};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Metrics exporter is installed by `run` when requested
    observability::init_with_config(ObservabilityConfig::new(
        cli.log_format.into(),
        cli.log_level(),
    ))?;

    info!(version = env!("CARGO_PKG_VERSION"), "Query Bus CLI starting");

    let result = match &cli.command {
        Commands::Run(args) => run_workload(args).await,
        Commands::Validate(args) => run_validate(args),
    };

    if let Err(ref e) = result {
        tracing::error!(error = %e, "Command failed");
    }

    result
}
