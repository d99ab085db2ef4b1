//! Error fan-out - delivers dispatch failures to every error handler

use std::sync::Arc;

use contracts::{ErrorHandler, Query, QueryContext, QueryError};
use tracing::warn;

use crate::metrics::BusMetrics;

/// Ordered list of error handlers
#[derive(Clone)]
pub struct ErrorFanout {
    handlers: Arc<[Arc<dyn ErrorHandler>]>,
    metrics: Arc<BusMetrics>,
}

impl ErrorFanout {
    pub fn new(handlers: Vec<Arc<dyn ErrorHandler>>, metrics: Arc<BusMetrics>) -> Self {
        Self {
            handlers: handlers.into(),
            metrics,
        }
    }

    /// Number of registered error handlers
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Deliver `error` to every handler in registration order
    pub async fn report(&self, ctx: &QueryContext, query: &dyn Query, error: &QueryError) {
        self.metrics.inc_errors();
        warn!(
            query_id = %query.id_string(),
            kind = error.kind(),
            error = %error,
            "Query failed"
        );

        for handler in self.handlers.iter() {
            handler.handle(ctx, query, error).await;
        }
    }
}
