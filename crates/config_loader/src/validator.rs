//! 配置校验模块
//!
//! 校验规则：
//! - worker_pool_size >= 1 (若指定)
//! - queue_capacity >= 1
//! - 1 <= listener_timeout_ms <= MAX_LISTENER_TIMEOUT_MS
//! - result_buffer <= queue_capacity

use contracts::{BusConfig, ConfigError};
use ::validator::{Validate, ValidationErrors};

/// Upper bound for the listener readiness timeout
pub const MAX_LISTENER_TIMEOUT_MS: u64 = 60_000;

/// 校验 BusConfig 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &BusConfig) -> Result<(), ConfigError> {
    validate_fields(config)?;
    validate_listener_timeout(config)?;
    validate_result_buffer(config)?;
    Ok(())
}

/// 字段级规则 (validator derive)
fn validate_fields(config: &BusConfig) -> Result<(), ConfigError> {
    config.validate().map_err(first_field_error)
}

/// 取第一个字段错误，按字段名排序保证输出稳定
fn first_field_error(errors: ValidationErrors) -> ConfigError {
    let field_errors = errors.field_errors();
    let mut fields: Vec<_> = field_errors.iter().collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));

    match fields.first() {
        Some((field, errs)) => {
            let message = errs
                .first()
                .map(|e| match &e.message {
                    Some(message) => message.to_string(),
                    None => format!("failed '{}' rule", e.code),
                })
                .unwrap_or_else(|| "invalid value".to_string());
            ConfigError::validation(field.to_string(), message)
        }
        None => ConfigError::validation("config", errors.to_string()),
    }
}

/// 校验 listener 超时上限
fn validate_listener_timeout(config: &BusConfig) -> Result<(), ConfigError> {
    if config.listener_timeout_ms > MAX_LISTENER_TIMEOUT_MS {
        return Err(ConfigError::validation(
            "listener_timeout_ms",
            format!(
                "listener_timeout_ms must be <= {MAX_LISTENER_TIMEOUT_MS}, got {}",
                config.listener_timeout_ms
            ),
        ));
    }
    Ok(())
}

/// 校验结果缓冲不超过队列容量
fn validate_result_buffer(config: &BusConfig) -> Result<(), ConfigError> {
    if config.result_buffer > config.queue_capacity {
        return Err(ConfigError::validation(
            "result_buffer",
            format!(
                "result_buffer ({}) must be <= queue_capacity ({})",
                config.result_buffer, config.queue_capacity
            ),
        ));
    }
    Ok(())
}
