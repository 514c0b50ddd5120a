//! JSON envelope carried by every broker message.
//!
//! ```json
//! {"relay_id": "R1", "payload": {"any": "json"}, "received_at": "2024-05-01T12:00:00Z"}
//! ```
//!
//! The payload is kept as raw JSON text so executors receive exactly the
//! bytes the producer sent. A missing payload decodes to empty bytes and an
//! empty `relay_id` is accepted; the store reports it as not found.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::types::{RelayId, Timestamp};

/// Errors decoding a broker message body.
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("Malformed event envelope: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Decoded inbound event.
#[derive(Debug, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub relay_id: RelayId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Box<RawValue>>,
    /// Producer-side receipt time, as sent (normally RFC 3339).
    #[serde(default)]
    pub received_at: String,
}

impl EventEnvelope {
    /// Decode a raw message body.
    pub fn decode(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// The payload as the raw bytes handed to executors. Empty when absent.
    pub fn payload_bytes(&self) -> Vec<u8> {
        self.payload
            .as_deref()
            .map(|raw| raw.get().as_bytes().to_vec())
            .unwrap_or_default()
    }

    /// `received_at` parsed as RFC 3339, if it is one.
    pub fn received_at(&self) -> Option<Timestamp> {
        DateTime::parse_from_rfc3339(&self.received_at)
            .ok()
            .map(|ts| ts.with_timezone(&Utc))
    }
}
