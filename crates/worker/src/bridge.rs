//! Broker message to work item bridge.
//!
//! [`ExecutionBridge::handle`] decodes one broker message, forwards the
//! resulting [`WorkItem`] into the pool's intake, and schedules the task
//! that turns the item's outcome into an ack (success) or nak (failure).
//! Undecodable messages are nak'd immediately and never reach the pool.

use chrono::Utc;
use relay_core::EventEnvelope;
use tokio_util::task::TaskTracker;

use crate::broker::InboundMessage;
use crate::intake::{IntakeClosed, IntakeSender};
use crate::work::{CompletionHandle, Outcome, WorkItem};

/// How the bridge disposed of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Admitted to the intake; acknowledgement follows the pool's outcome.
    Admitted,
    /// Body could not be decoded; nak'd immediately.
    Malformed,
    /// The intake was closed; the message is nak'd for redelivery.
    Refused,
}

/// Converts broker deliveries into work items. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ExecutionBridge {
    intake: IntakeSender,
    acks: TaskTracker,
}

impl ExecutionBridge {
    pub fn new(intake: IntakeSender) -> Self {
        Self {
            intake,
            acks: TaskTracker::new(),
        }
    }

    /// Handle one delivery.
    ///
    /// Waits for intake capacity when the pool is saturated. That wait is
    /// the backpressure that throttles broker delivery.
    pub async fn handle<M: InboundMessage>(&self, message: M) -> Admission {
        let envelope = match EventEnvelope::decode(message.payload()) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::error!(subject = %message.subject(), error = %e, "Failed to decode event");
                if let Err(e) = message.nak().await {
                    tracing::warn!(error = %e, "Failed to nak malformed message");
                }
                return Admission::Malformed;
            }
        };

        let lag_ms = envelope
            .received_at()
            .map(|at| (Utc::now() - at).num_milliseconds());
        tracing::debug!(relay_id = %envelope.relay_id, lag_ms = ?lag_ms, "Received event");

        let (item, handle) = WorkItem::new(envelope.relay_id.clone(), envelope.payload_bytes());
        let item_id = item.id;
        self.acks.spawn(acknowledge(message, envelope.relay_id, handle));

        match self.intake.send(item).await {
            Ok(()) => {
                tracing::trace!(item_id = %item_id, "Work item admitted");
                Admission::Admitted
            }
            Err(IntakeClosed(item)) => {
                tracing::warn!(relay_id = %item.relay_id, "Intake closed, requesting redelivery");
                item.completion.complete(Outcome::Failure);
                Admission::Refused
            }
        }
    }

    /// Acknowledgement tasks not yet finished.
    pub fn pending_acks(&self) -> usize {
        self.acks.len()
    }

    /// Wait until every scheduled acknowledgement has been sent. Call after
    /// the pool has shut down, when every outcome is known.
    pub async fn wait_for_acks(&self) {
        self.acks.close();
        self.acks.wait().await;
    }
}

/// Map the pool's outcome onto the broker's acknowledgement primitive.
async fn acknowledge<M: InboundMessage>(message: M, relay_id: String, handle: CompletionHandle) {
    let result = match handle.outcome().await {
        Some(Outcome::Success) => {
            let result = message.ack().await;
            tracing::debug!(relay_id = %relay_id, "Acknowledged message");
            result
        }
        Some(Outcome::Failure) => {
            let result = message.nak().await;
            tracing::info!(relay_id = %relay_id, "Nacked message for redelivery");
            result
        }
        None => {
            tracing::warn!(relay_id = %relay_id, "Work item abandoned, requesting redelivery");
            message.nak().await
        }
    };

    if let Err(e) = result {
        // The broker redelivers after ack_wait either way.
        tracing::warn!(relay_id = %relay_id, error = %e, "Failed to acknowledge message");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::memory::{Ack, MemoryMessage};
    use crate::intake;
    use std::num::NonZeroUsize;

    fn capacity(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[tokio::test]
    async fn malformed_message_is_nacked_and_not_admitted() {
        let (tx, rx) = intake::channel(capacity(1));
        let bridge = ExecutionBridge::new(tx);
        let (message, mut acks) = MemoryMessage::new("events.x", b"{not json".to_vec());

        assert_eq!(bridge.handle(message).await, Admission::Malformed);
        assert_eq!(acks.next().await, Some(Ack::Nak));
        assert_eq!(acks.next().await, None);
        assert!(rx.drain().await.is_empty());
    }

    #[tokio::test]
    async fn admitted_item_carries_relay_and_payload() {
        let (tx, rx) = intake::channel(capacity(1));
        let bridge = ExecutionBridge::new(tx);
        let (message, _acks) =
            MemoryMessage::new("events.r1", br#"{"relay_id":"R1","payload":"hello"}"#.to_vec());

        assert_eq!(bridge.handle(message).await, Admission::Admitted);
        let item = rx.recv().await.unwrap();
        assert_eq!(item.relay_id, "R1");
        assert_eq!(item.payload, br#""hello""#.to_vec());
    }

    #[tokio::test]
    async fn envelope_without_payload_is_admitted() {
        let (tx, rx) = intake::channel(capacity(2));
        let bridge = ExecutionBridge::new(tx);
        let (missing_payload, mut acks) = MemoryMessage::new("events.r1", br#"{"relay_id":"R1"}"#.to_vec());
        let (blank_relay, _blank_acks) = MemoryMessage::new("events.x", br#"{"relay_id":""}"#.to_vec());

        assert_eq!(bridge.handle(missing_payload).await, Admission::Admitted);
        assert_eq!(bridge.handle(blank_relay).await, Admission::Admitted);

        let item = rx.recv().await.unwrap();
        assert_eq!(item.relay_id, "R1");
        assert!(item.payload.is_empty());
        item.completion.complete(Outcome::Success);
        assert_eq!(acks.next().await, Some(Ack::Ack));
        assert_eq!(rx.recv().await.unwrap().relay_id, "");
    }

    #[tokio::test]
    async fn outcome_maps_to_ack_or_nak() {
        let (tx, rx) = intake::channel(capacity(2));
        let bridge = ExecutionBridge::new(tx);
        let (ok_msg, mut ok_acks) =
            MemoryMessage::new("events.r1", br#"{"relay_id":"R1","payload":{}}"#.to_vec());
        let (bad_msg, mut bad_acks) =
            MemoryMessage::new("events.r2", br#"{"relay_id":"R2","payload":{}}"#.to_vec());

        bridge.handle(ok_msg).await;
        bridge.handle(bad_msg).await;
        rx.recv().await.unwrap().completion.complete(Outcome::Success);
        rx.recv().await.unwrap().completion.complete(Outcome::Failure);
        bridge.wait_for_acks().await;

        assert_eq!(ok_acks.next().await, Some(Ack::Ack));
        assert_eq!(ok_acks.next().await, None);
        assert_eq!(bad_acks.next().await, Some(Ack::Nak));
        assert_eq!(bad_acks.next().await, None);
        assert_eq!(bridge.pending_acks(), 0);
    }

    #[tokio::test]
    async fn closed_intake_refuses_and_nacks() {
        let (tx, rx) = intake::channel(capacity(1));
        rx.close().await;
        let bridge = ExecutionBridge::new(tx);
        let (message, mut acks) =
            MemoryMessage::new("events.r1", br#"{"relay_id":"R1","payload":{}}"#.to_vec());

        assert_eq!(bridge.handle(message).await, Admission::Refused);
        assert_eq!(acks.next().await, Some(Ack::Nak));
        assert_eq!(acks.next().await, None);
    }

    #[tokio::test]
    async fn dropped_item_is_nacked() {
        let (tx, rx) = intake::channel(capacity(1));
        let bridge = ExecutionBridge::new(tx);
        let (message, mut acks) =
            MemoryMessage::new("events.r1", br#"{"relay_id":"R1","payload":{}}"#.to_vec());

        bridge.handle(message).await;
        drop(rx.recv().await.unwrap());

        assert_eq!(acks.next().await, Some(Ack::Nak));
    }
}
