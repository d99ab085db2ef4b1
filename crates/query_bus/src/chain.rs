//! Handler chains - ordered, short-circuiting handler execution
//!
//! Both chains share one shape: handlers run strictly in registration order,
//! the first error aborts, a stop-propagation flag ends the chain
//! successfully, and an unhandled result becomes `NoHandlersFound`.
//! Every failure is reported through the error fan-out before it is returned.

use std::sync::Arc;

use contracts::{
    Handler, IteratorHandler, IteratorResult, Query, QueryContext, QueryError, QueryResult,
};
use tracing::trace;

use crate::fanout::ErrorFanout;

/// Run synchronous handlers against `result`
pub async fn run_handlers(
    handlers: &[Arc<dyn Handler>],
    errors: &ErrorFanout,
    ctx: &QueryContext,
    query: &dyn Query,
    result: &mut QueryResult,
) -> Result<(), QueryError> {
    for (position, handler) in handlers.iter().enumerate() {
        if let Err(e) = handler.handle(ctx, query, result).await {
            let err = QueryError::Handler(e);
            errors.report(ctx, query, &err).await;
            return Err(err);
        }
        if result.is_propagation_stopped() {
            trace!(position, "Propagation stopped");
            break;
        }
    }

    if !result.is_handled() {
        let err = QueryError::no_handlers_found(query.id_string());
        errors.report(ctx, query, &err).await;
        return Err(err);
    }

    Ok(())
}

/// Run iterator handlers against `result`
///
/// There is no caller to return to; errors only reach the fan-out.
pub async fn run_iterator_handlers(
    handlers: &[Arc<dyn IteratorHandler>],
    errors: &ErrorFanout,
    ctx: &QueryContext,
    query: &dyn Query,
    result: &mut IteratorResult,
) -> Result<(), QueryError> {
    for (position, handler) in handlers.iter().enumerate() {
        if let Err(e) = handler.handle(ctx, query, result).await {
            let err = QueryError::Handler(e);
            errors.report(ctx, query, &err).await;
            return Err(err);
        }
        if result.is_propagation_stopped() {
            trace!(position, "Propagation stopped");
            return Ok(());
        }
    }

    if !result.is_handled() {
        let err = QueryError::no_handlers_found(query.id_string());
        errors.report(ctx, query, &err).await;
        return Err(err);
    }

    Ok(())
}
