//! Layered error definitions
//!
//! Categorized by source: dispatch / handler / configuration

use thiserror::Error;

/// Error type returned by handlers; passed through the bus unmodified
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Dispatch error
#[derive(Debug, Error)]
pub enum QueryError {
    // ===== Validation Errors =====
    /// Query carries no identity
    #[error("invalid query: query identity is empty")]
    InvalidQuery,

    /// Iterator query before the worker pool was started
    #[error("query bus is not initialized")]
    NotInitialized,

    /// Iterator query while the bus drains or after it shut down
    #[error("query bus is shutting down")]
    ShuttingDown,

    // ===== Chain Errors =====
    /// No handler marked the result handled
    #[error("no query handlers found for query '{query_id}'")]
    NoHandlersFound { query_id: String },

    /// No consumer attached to an iterator result in time
    #[error("iterator query '{query_id}' timed out after {waited_ms}ms waiting for a listener")]
    QueryTimedOut { query_id: String, waited_ms: u64 },

    /// Error raised by a handler
    #[error("{0}")]
    Handler(#[source] HandlerError),
}

impl QueryError {
    /// Create no handlers found error
    pub fn no_handlers_found(query_id: impl Into<String>) -> Self {
        Self::NoHandlersFound {
            query_id: query_id.into(),
        }
    }

    /// Create query timed out error
    pub fn query_timed_out(query_id: impl Into<String>, waited_ms: u64) -> Self {
        Self::QueryTimedOut {
            query_id: query_id.into(),
            waited_ms,
        }
    }

    /// Wrap a handler error
    pub fn handler(error: impl Into<HandlerError>) -> Self {
        Self::Handler(error.into())
    }

    /// The original handler error, if this error came from a handler
    pub fn handler_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            Self::Handler(err) => Some(err.as_ref()),
            _ => None,
        }
    }

    /// Stable short name of the error kind (logs and metric labels)
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidQuery => "invalid_query",
            Self::NotInitialized => "not_initialized",
            Self::ShuttingDown => "shutting_down",
            Self::NoHandlersFound { .. } => "no_handlers_found",
            Self::QueryTimedOut { .. } => "query_timed_out",
            Self::Handler(_) => "handler",
        }
    }
}

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration parse error
    #[error("config parse error: {message}")]
    Parse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    Validation { field: String, message: String },

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    /// Create configuration parse error
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}
