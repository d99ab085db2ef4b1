//! Streaming result containers
//!
//! An iterator query produces values incrementally. The producer half
//! ([`IteratorResult`]) is handed to exactly one pool worker; the consumer
//! half ([`IteratorReceiver`]) is returned to the caller. Attaching a
//! consumer (first `recv`, or `listen`) raises the listener-readiness flag
//! the worker waits on before running any handler.

use std::time::Duration;

use async_channel::{bounded, Receiver, Sender};
use serde_json::Value;
use tokio::sync::watch;

/// Create a connected producer/consumer pair
///
/// `buffer` is the delivery buffer size. `async_channel` has no rendezvous
/// mode, so a buffer of 0 is rounded up to a single slot.
pub fn iterator_channel(buffer: usize) -> (IteratorResult, IteratorReceiver) {
    let (tx, rx) = bounded(buffer.max(1));
    let (ready_tx, ready_rx) = watch::channel(false);

    (
        IteratorResult {
            tx,
            listener: ready_rx,
            handled: false,
            propagation_stopped: false,
        },
        IteratorReceiver {
            rx,
            listener: ready_tx,
        },
    )
}

/// Producer half of a streaming result
#[derive(Debug)]
pub struct IteratorResult {
    tx: Sender<Value>,
    listener: watch::Receiver<bool>,
    handled: bool,
    propagation_stopped: bool,
}

impl IteratorResult {
    /// Deliver one value to the consumer
    ///
    /// Waits while the delivery buffer is full. Returns `false` when the
    /// stream is closed and the value was dropped.
    pub async fn yield_value(&mut self, value: impl Into<Value>) -> bool {
        self.handled = true;
        self.tx.send(value.into()).await.is_ok()
    }

    /// Mark the stream handled without delivering a value
    pub fn done(&mut self) {
        self.handled = true;
    }

    /// End the iterator handler chain after the current handler
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn is_handled(&self) -> bool {
        self.handled
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Check whether a consumer has attached
    pub fn has_listener(&self) -> bool {
        *self.listener.borrow()
    }

    /// Wait up to `timeout` for a consumer to attach
    ///
    /// Returns `false` on timeout or if the consumer went away without
    /// ever listening.
    pub async fn wait_listener(&mut self, timeout: Duration) -> bool {
        match tokio::time::timeout(timeout, self.listener.wait_for(|ready| *ready)).await {
            Ok(Ok(_)) => true,
            Ok(Err(_)) | Err(_) => false,
        }
    }

    /// Close the stream; the consumer sees the end after draining buffered values
    ///
    /// Idempotent.
    pub fn close(&self) {
        self.tx.close();
    }
}

/// Consumer half of a streaming result
#[derive(Debug)]
pub struct IteratorReceiver {
    rx: Receiver<Value>,
    listener: watch::Sender<bool>,
}

impl IteratorReceiver {
    /// Signal listener readiness without receiving
    ///
    /// Idempotent; `recv` calls this implicitly.
    pub fn listen(&self) {
        self.listener.send_replace(true);
    }

    /// Receive the next value, `None` once the stream is closed and drained
    pub async fn recv(&mut self) -> Option<Value> {
        self.listen();
        self.rx.recv().await.ok()
    }

    /// Drain the whole stream
    pub async fn collect(mut self) -> Vec<Value> {
        let mut values = Vec::new();
        while let Some(value) = self.recv().await {
            values.push(value);
        }
        values
    }

    /// Stop consuming; pending and future values are dropped
    ///
    /// Idempotent.
    pub fn close(&self) {
        self.rx.close();
    }

    pub fn is_closed(&self) -> bool {
        self.rx.is_closed()
    }

    /// Number of values buffered and not yet received
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_values_flow_until_close() {
        let (mut producer, consumer) = iterator_channel(4);

        assert!(producer.yield_value("a").await);
        assert!(producer.yield_value("b").await);
        producer.close();
        producer.close();

        assert!(producer.is_handled());
        assert_eq!(consumer.collect().await, vec![json!("a"), json!("b")]);
    }

    #[tokio::test]
    async fn test_listener_readiness_on_recv() {
        let (mut producer, mut consumer) = iterator_channel(0);
        assert!(!producer.has_listener());

        let handle = tokio::spawn(async move {
            let ready = producer.wait_listener(Duration::from_secs(1)).await;
            if ready {
                producer.yield_value("bar").await;
            }
            ready
        });

        assert_eq!(consumer.recv().await, Some(json!("bar")));
        assert!(handle.await.unwrap());
        assert_eq!(consumer.recv().await, None);
    }

    #[tokio::test]
    async fn test_wait_listener_times_out() {
        let (mut producer, _consumer) = iterator_channel(0);
        assert!(!producer.wait_listener(Duration::from_millis(20)).await);
    }

    #[tokio::test]
    async fn test_wait_listener_fails_when_consumer_dropped() {
        let (mut producer, consumer) = iterator_channel(0);
        drop(consumer);
        assert!(!producer.wait_listener(Duration::from_secs(5)).await);
        assert!(producer.is_closed());
    }

    #[tokio::test]
    async fn test_consumer_close_rejects_values() {
        let (mut producer, consumer) = iterator_channel(1);
        consumer.close();
        assert!(!producer.yield_value(1).await);
    }
}
