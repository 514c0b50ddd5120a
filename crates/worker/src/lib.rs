//! Relay worker: consumes relay events from a durable broker subscription
//! and executes each relay's configured action on a bounded worker pool.
//!
//! Flow: [`consumer::QueueConsumer`] pulls messages, [`bridge::ExecutionBridge`]
//! turns each into a [`work::WorkItem`] on the bounded [`intake`], and the
//! [`pool::WorkerPool`] dispatches it. The item's outcome becomes the
//! broker ack or nak.

pub mod bridge;
pub mod broker;
pub mod config;
pub mod consumer;
pub mod error;
pub mod intake;
pub mod pool;
pub mod telemetry;
pub mod work;

pub use bridge::{Admission, ExecutionBridge};
pub use config::WorkerConfig;
pub use consumer::{ConsumerStats, QueueConsumer};
pub use error::WorkerError;
pub use pool::{PoolStats, WorkerPool};
pub use work::{Outcome, WorkItem};
