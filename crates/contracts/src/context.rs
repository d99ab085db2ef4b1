//! QueryContext - caller context threaded through every handler and adapter

use tokio_util::sync::CancellationToken;

/// Per-dispatch caller context
///
/// The bus never interprets cancellation itself; handlers and cache adapters
/// are expected to observe it.
#[derive(Debug, Clone, Default)]
pub struct QueryContext {
    cancellation: CancellationToken,
}

impl QueryContext {
    /// Create a fresh, uncancelled context
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context bound to an existing cancellation token
    pub fn with_cancellation(cancellation: CancellationToken) -> Self {
        Self { cancellation }
    }

    /// Derive a child context; cancelling the parent cancels the child
    pub fn child(&self) -> Self {
        Self {
            cancellation: self.cancellation.child_token(),
        }
    }

    /// Underlying cancellation token
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Check whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Wait until cancellation is requested
    pub async fn cancelled(&self) {
        self.cancellation.cancelled().await;
    }
}
