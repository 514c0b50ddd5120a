//! NATS JetStream durable pull consumer.
//!
//! Prefetch and unacknowledged deliveries are bounded by the worker count and
//! intake size. Each held delivery runs down its `ack_wait` timer until the
//! pool finishes it.

use std::time::Duration;

use async_nats::jetstream::consumer::{pull, AckPolicy};
use async_nats::jetstream::{self, AckKind};
use async_trait::async_trait;
use futures::StreamExt;

use super::{AckError, ConsumerError, InboundMessage, MessageSource};
use crate::config::WorkerConfig;

/// Reconnect attempts before the client gives up on the server.
const MAX_RECONNECTS: usize = 10;

/// Where and how to subscribe.
#[derive(Debug, Clone)]
pub struct JetStreamSettings {
    pub url: String,
    /// Stream capturing `subject`; created if missing.
    pub stream: String,
    /// Wildcard subject, e.g. `events.>`.
    pub subject: String,
    /// Durable consumer name shared across worker processes.
    pub durable_name: String,
    /// Redelivery deadline for unacknowledged messages.
    pub ack_wait: Duration,
    /// Messages requested per pull.
    pub batch_size: usize,
    /// Server-side cap on deliveries awaiting acknowledgement.
    pub max_ack_pending: usize,
}

impl JetStreamSettings {
    /// Settings sized to the pool: pulls of one message per worker, and no
    /// more unacked deliveries than busy workers plus a full intake.
    pub fn from_config(config: &WorkerConfig) -> Self {
        Self {
            url: config.nats_url.clone(),
            stream: config.event_stream.clone(),
            subject: config.event_subject.clone(),
            durable_name: config.consumer_name.clone(),
            ack_wait: config.ack_wait,
            batch_size: config.max_workers.max(1),
            max_ack_pending: config.max_unacked().max(1),
        }
    }
}

/// A JetStream delivery.
pub struct JetStreamMessage {
    inner: jetstream::Message,
}

#[async_trait]
impl InboundMessage for JetStreamMessage {
    fn payload(&self) -> &[u8] {
        &self.inner.payload
    }

    fn subject(&self) -> &str {
        self.inner.subject.as_str()
    }

    async fn ack(&self) -> Result<(), AckError> {
        self.inner.ack().await.map_err(AckError)
    }

    async fn nak(&self) -> Result<(), AckError> {
        self.inner.ack_with(AckKind::Nak(None)).await.map_err(AckError)
    }
}

/// Explicit-ack subscription on a durable pull consumer.
pub struct JetStreamSource {
    messages: pull::Stream,
}

impl JetStreamSource {
    /// Connect, ensure the stream and durable consumer exist, and open the
    /// message stream.
    pub async fn connect(settings: &JetStreamSettings) -> Result<Self, ConsumerError> {
        let client = async_nats::ConnectOptions::new()
            .max_reconnects(MAX_RECONNECTS)
            .connect(settings.url.as_str())
            .await
            .map_err(|e| ConsumerError::Connect(Box::new(e)))?;
        let context = jetstream::new(client);

        let stream = context
            .get_or_create_stream(jetstream::stream::Config {
                name: settings.stream.clone(),
                subjects: vec![settings.subject.clone()],
                ..Default::default()
            })
            .await
            .map_err(|e| ConsumerError::Subscribe(Box::new(e)))?;

        let consumer = stream
            .get_or_create_consumer(
                &settings.durable_name,
                pull::Config {
                    durable_name: Some(settings.durable_name.clone()),
                    filter_subject: settings.subject.clone(),
                    ack_policy: AckPolicy::Explicit,
                    ack_wait: settings.ack_wait,
                    max_ack_pending: i64::try_from(settings.max_ack_pending).unwrap_or(i64::MAX),
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| ConsumerError::Subscribe(Box::new(e)))?;

        let messages = consumer
            .stream()
            .max_messages_per_batch(settings.batch_size)
            .messages()
            .await
            .map_err(|e| ConsumerError::Subscribe(Box::new(e)))?;

        tracing::info!(
            stream = %settings.stream,
            subject = %settings.subject,
            durable_name = %settings.durable_name,
            ack_wait_secs = settings.ack_wait.as_secs(),
            batch_size = settings.batch_size,
            max_ack_pending = settings.max_ack_pending,
            "JetStream subscription established",
        );
        Ok(Self { messages })
    }
}

#[async_trait]
impl MessageSource for JetStreamSource {
    type Message = JetStreamMessage;

    async fn next(&mut self) -> Option<Result<JetStreamMessage, ConsumerError>> {
        let next = self.messages.next().await?;
        Some(
            next.map(|inner| JetStreamMessage { inner })
                .map_err(|e| ConsumerError::Receive(Box::new(e))),
        )
    }
}
