//! Handler traits - the collaborators the bus dispatches to
//!
//! All traits are object safe; the bus keeps them as ordered
//! `Vec<Arc<dyn ...>>` lists.

use async_trait::async_trait;

use crate::{HandlerError, IteratorResult, Query, QueryContext, QueryError, QueryResult};

/// Synchronous query handler
#[async_trait]
pub trait Handler: Send + Sync {
    /// Handle a query
    ///
    /// Handlers ignore queries they do not recognise by returning `Ok(())`
    /// without touching the result.
    ///
    /// # Errors
    /// Any error aborts the handler chain and is returned to the caller.
    async fn handle(
        &self,
        ctx: &QueryContext,
        query: &dyn Query,
        result: &mut QueryResult,
    ) -> Result<(), HandlerError>;
}

/// Streaming query handler
#[async_trait]
pub trait IteratorHandler: Send + Sync {
    /// Handle a query by yielding values into the iterator result
    ///
    /// # Errors
    /// Any error aborts the chain and is reported to the error handlers.
    async fn handle(
        &self,
        ctx: &QueryContext,
        query: &dyn Query,
        result: &mut IteratorResult,
    ) -> Result<(), HandlerError>;
}

/// Observer of dispatch failures
#[async_trait]
pub trait ErrorHandler: Send + Sync {
    /// Receive an error raised while dispatching `query`
    async fn handle(&self, ctx: &QueryContext, query: &dyn Query, error: &QueryError);
}
