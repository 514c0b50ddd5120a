//! Subscription loop feeding the execution bridge.
//!
//! The consumer pulls one message at a time and hands it to
//! [`ExecutionBridge::handle`], which blocks while the pool's intake is
//! full. Stopping the consumer ends the loop and drops the subscription so
//! the broker stops delivering to this process.

use tokio_util::sync::CancellationToken;

use crate::bridge::{Admission, ExecutionBridge};
use crate::broker::MessageSource;

/// Counters reported when the consumer loop ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumerStats {
    pub received: u64,
    pub admitted: u64,
    pub malformed: u64,
    pub refused: u64,
    pub receive_errors: u64,
}

/// Pulls messages from a [`MessageSource`] into the bridge until stopped.
#[derive(Debug)]
pub struct QueueConsumer {
    bridge: ExecutionBridge,
    stop: CancellationToken,
}

impl QueueConsumer {
    pub fn new(bridge: ExecutionBridge) -> Self {
        Self {
            bridge,
            stop: CancellationToken::new(),
        }
    }

    /// Token that stops the loop when cancelled. Independent of the pool's
    /// token so the subscription can end before workers are drained.
    pub fn stop_token(&self) -> CancellationToken {
        self.stop.clone()
    }

    /// Run until stopped or the subscription ends.
    pub async fn run<S: MessageSource>(self, mut source: S) -> ConsumerStats {
        let mut stats = ConsumerStats::default();
        tracing::info!("Queue consumer started");

        loop {
            let next = tokio::select! {
                biased;
                _ = self.stop.cancelled() => break,
                next = source.next() => next,
            };

            let message = match next {
                Some(Ok(message)) => message,
                Some(Err(e)) => {
                    stats.receive_errors += 1;
                    tracing::error!(error = %e, "Failed to receive message");
                    continue;
                }
                None => {
                    tracing::warn!("Subscription ended");
                    break;
                }
            };

            stats.received += 1;
            match self.bridge.handle(message).await {
                Admission::Admitted => stats.admitted += 1,
                Admission::Malformed => stats.malformed += 1,
                Admission::Refused => stats.refused += 1,
            }
        }

        drop(source);
        tracing::info!(
            received = stats.received,
            admitted = stats.admitted,
            malformed = stats.malformed,
            refused = stats.refused,
            receive_errors = stats.receive_errors,
            "Queue consumer stopped",
        );
        stats
    }
}
