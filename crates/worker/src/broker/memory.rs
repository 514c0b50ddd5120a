//! Channel-backed broker for tests and local runs.
//!
//! Each [`MemoryMessage`] reports its acknowledgements on an [`AckReceiver`],
//! which ends once the message is dropped. That makes "exactly one
//! acknowledgement per message" directly observable.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{AckError, ConsumerError, InboundMessage, MessageSource};

/// Acknowledgement sent for a memory message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ack {
    Ack,
    Nak,
}

/// Observes the acknowledgements of one message.
#[derive(Debug)]
pub struct AckReceiver {
    rx: mpsc::UnboundedReceiver<Ack>,
}

impl AckReceiver {
    /// Next acknowledgement, or `None` once the message is gone and no more
    /// can arrive.
    pub async fn next(&mut self) -> Option<Ack> {
        self.rx.recv().await
    }
}

/// In-memory delivery.
#[derive(Debug)]
pub struct MemoryMessage {
    subject: String,
    payload: Vec<u8>,
    acks: mpsc::UnboundedSender<Ack>,
}

impl MemoryMessage {
    pub fn new(subject: impl Into<String>, payload: impl Into<Vec<u8>>) -> (Self, AckReceiver) {
        let (acks, rx) = mpsc::unbounded_channel();
        let message = Self {
            subject: subject.into(),
            payload: payload.into(),
            acks,
        };
        (message, AckReceiver { rx })
    }

    fn record(&self, ack: Ack) -> Result<(), AckError> {
        self.acks
            .send(ack)
            .map_err(|_| AckError("acknowledgement receiver dropped".into()))
    }
}

#[async_trait]
impl InboundMessage for MemoryMessage {
    fn payload(&self) -> &[u8] {
        &self.payload
    }

    fn subject(&self) -> &str {
        &self.subject
    }

    async fn ack(&self) -> Result<(), AckError> {
        self.record(Ack::Ack)
    }

    async fn nak(&self) -> Result<(), AckError> {
        self.record(Ack::Nak)
    }
}

/// Subscription fed through an mpsc channel. Ends when every publisher is
/// dropped.
#[derive(Debug)]
pub struct MemorySource {
    rx: mpsc::Receiver<MemoryMessage>,
}

impl MemorySource {
    /// Create a source and the publisher that feeds it.
    pub fn channel(buffer: usize) -> (mpsc::Sender<MemoryMessage>, Self) {
        let (tx, rx) = mpsc::channel(buffer);
        (tx, Self { rx })
    }
}

#[async_trait]
impl MessageSource for MemorySource {
    type Message = MemoryMessage;

    async fn next(&mut self) -> Option<Result<MemoryMessage, ConsumerError>> {
        self.rx.recv().await.map(Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn acks_are_observed_until_message_dropped() {
        let (message, mut acks) = MemoryMessage::new("events.r1", b"{}".to_vec());
        assert_eq!(message.subject(), "events.r1");
        assert_eq!(message.payload(), b"{}");

        message.nak().await.unwrap();
        drop(message);

        assert_eq!(acks.next().await, Some(Ack::Nak));
        assert_eq!(acks.next().await, None);
    }

    #[tokio::test]
    async fn source_ends_when_publisher_dropped() {
        let (publisher, mut source) = MemorySource::channel(4);
        let (message, _acks) = MemoryMessage::new("events.r1", Vec::new());
        publisher.send(message).await.unwrap();
        drop(publisher);

        assert!(source.next().await.unwrap().is_ok());
        assert!(source.next().await.is_none());
    }
}
