//! Durable message broker capability.
//!
//! - [`MessageSource`]: a manually acknowledged subscription yielding
//!   [`InboundMessage`]s.
//! - [`nats`]: JetStream durable pull consumer used in production.
//! - [`memory`]: channel-backed source recording acknowledgements, for
//!   tests and local runs.
//!
//! Delivery is at-least-once: a message is redelivered unless it is
//! positively acknowledged before the broker's ack deadline.

pub mod memory;
pub mod nats;

use async_trait::async_trait;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure sending an acknowledgement back to the broker.
#[derive(Debug, thiserror::Error)]
#[error("Acknowledgement failed: {0}")]
pub struct AckError(#[source] pub BoxError);

/// Errors establishing or reading a subscription.
#[derive(Debug, thiserror::Error)]
pub enum ConsumerError {
    #[error("Broker connection failed: {0}")]
    Connect(#[source] BoxError),

    #[error("Subscription failed: {0}")]
    Subscribe(#[source] BoxError),

    /// A transient error reading the next message; the subscription stays
    /// usable.
    #[error("Receive failed: {0}")]
    Receive(#[source] BoxError),
}

/// One delivery from the broker.
#[async_trait]
pub trait InboundMessage: Send + Sync + 'static {
    /// Raw message body.
    fn payload(&self) -> &[u8];

    /// Subject the message was published on.
    fn subject(&self) -> &str;

    /// Positive acknowledgement: the message is handled.
    async fn ack(&self) -> Result<(), AckError>;

    /// Negative acknowledgement: request redelivery.
    async fn nak(&self) -> Result<(), AckError>;
}

/// A manually acknowledged subscription.
#[async_trait]
pub trait MessageSource: Send {
    type Message: InboundMessage;

    /// Next delivery. `None` once the subscription has ended.
    async fn next(&mut self) -> Option<Result<Self::Message, ConsumerError>>;
}
