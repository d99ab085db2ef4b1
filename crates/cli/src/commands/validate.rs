//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::BusConfig;
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    worker_pool_size: usize,
    queue_capacity: usize,
    result_buffer: usize,
    listener_timeout_ms: u64,
    memory_cache: bool,
}

impl From<&BusConfig> for ConfigSummary {
    fn from(config: &BusConfig) -> Self {
        Self {
            worker_pool_size: config.effective_pool_size(),
            queue_capacity: config.queue_capacity,
            result_buffer: config.result_buffer,
            listener_timeout_ms: config.listener_timeout_ms,
            memory_cache: config.cache.memory,
        }
    }
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: (!warnings.is_empty()).then_some(warnings),
                summary: Some(ConfigSummary::from(&config)),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &BusConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.worker_pool_size.is_none() {
        warnings.push(format!(
            "worker_pool_size not set - using host parallelism ({})",
            config.effective_pool_size()
        ));
    }

    if config.result_buffer == 0 {
        warnings.push("result_buffer is 0 - iterator results use a single-slot buffer".to_string());
    }

    if !config.cache.memory {
        warnings.push("cache.memory is disabled - no cache adapter will be registered".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Workers: {}", summary.worker_pool_size);
            println!("  Queue capacity: {}", summary.queue_capacity);
            println!("  Result buffer: {}", summary.result_buffer);
            println!("  Listener timeout: {}ms", summary.listener_timeout_ms);
            println!("  Memory cache: {}", summary.memory_cache);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
