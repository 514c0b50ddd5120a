//! Work items and their single-shot completion continuation.
//!
//! A [`WorkItem`] carries a [`Completion`] that is consumed by
//! [`Completion::complete`], so the type system enforces at most one
//! outcome per item. The paired [`CompletionHandle`] resolves to `None` when
//! a completion is dropped without firing, so an abandoned item still
//! yields exactly one acknowledgement decision upstream.

use std::fmt;

use tokio::sync::oneshot;
use uuid::Uuid;

/// Final classification of a dispatched work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Processed, or silently dropped. The broker must not redeliver.
    Success,
    /// Processing failed. The broker should redeliver.
    Failure,
}

impl Outcome {
    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

impl From<bool> for Outcome {
    fn from(success: bool) -> Self {
        if success {
            Self::Success
        } else {
            Self::Failure
        }
    }
}

/// Sending half of a work item's continuation.
#[derive(Debug)]
pub struct Completion {
    tx: oneshot::Sender<Outcome>,
}

/// Receiving half, held by whoever must act on the outcome.
#[derive(Debug)]
pub struct CompletionHandle {
    rx: oneshot::Receiver<Outcome>,
}

impl Completion {
    /// Create a connected completion / handle pair.
    pub fn pair() -> (Completion, CompletionHandle) {
        let (tx, rx) = oneshot::channel();
        (Completion { tx }, CompletionHandle { rx })
    }

    /// Report the outcome. Consumes the completion.
    pub fn complete(self, outcome: Outcome) {
        if self.tx.send(outcome).is_err() {
            tracing::debug!(?outcome, "Completion handle already dropped");
        }
    }
}

impl CompletionHandle {
    /// Wait for the outcome. `None` means the completion was dropped
    /// without being fired.
    pub async fn outcome(self) -> Option<Outcome> {
        self.rx.await.ok()
    }
}

/// One event awaiting dispatch.
pub struct WorkItem {
    /// Correlation id for logs.
    pub id: Uuid,
    pub relay_id: String,
    /// Opaque to the dispatcher, handed to the executor verbatim.
    pub payload: Vec<u8>,
    pub completion: Completion,
}

impl WorkItem {
    /// Build an item together with the handle that observes its outcome.
    pub fn new(relay_id: impl Into<String>, payload: Vec<u8>) -> (Self, CompletionHandle) {
        let (completion, handle) = Completion::pair();
        let item = Self {
            id: Uuid::now_v7(),
            relay_id: relay_id.into(),
            payload,
            completion,
        };
        (item, handle)
    }
}

impl fmt::Debug for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkItem")
            .field("id", &self.id)
            .field("relay_id", &self.relay_id)
            .field("payload_len", &self.payload.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn completion_delivers_outcome() {
        let (item, handle) = WorkItem::new("R1", b"hello".to_vec());
        item.completion.complete(Outcome::Failure);
        assert_eq!(handle.outcome().await, Some(Outcome::Failure));
    }

    #[tokio::test]
    async fn dropped_completion_resolves_to_none() {
        let (item, handle) = WorkItem::new("R1", Vec::new());
        drop(item);
        assert_eq!(handle.outcome().await, None);
    }

    #[test]
    fn complete_after_handle_dropped_does_not_panic() {
        let (completion, handle) = Completion::pair();
        drop(handle);
        completion.complete(Outcome::Success);
    }

    #[test]
    fn outcome_from_bool() {
        assert_eq!(Outcome::from(true), Outcome::Success);
        assert_eq!(Outcome::from(false), Outcome::Failure);
        assert!(Outcome::Success.is_success());
        assert!(!Outcome::Failure.is_success());
    }

    #[test]
    fn debug_omits_payload_bytes() {
        let (item, _handle) = WorkItem::new("R1", vec![1, 2, 3]);
        let rendered = format!("{item:?}");
        assert!(rendered.contains("payload_len: 3"));
        assert!(rendered.contains("R1"));
    }
}
