//! Shared domain types for the relay worker.
//!
//! This crate has no internal dependencies and defines the capabilities the
//! dispatch core is built against:
//!
//! - [`ActionExecutor`]: pluggable per-action-type capability.
//! - [`ActionRegistry`]: action-type name to executor dispatch table.
//! - [`InstructionStore`]: relay instruction lookup and execution audit log.
//! - [`EventEnvelope`]: JSON envelope carried by broker messages.

pub mod action;
pub mod envelope;
pub mod error;
pub mod instruction;
pub mod registry;
pub mod store;
pub mod types;

pub use action::{ActionConfig, ActionError, ActionExecutor};
pub use envelope::{EnvelopeError, EventEnvelope};
pub use error::{RegistryError, StoreError};
pub use instruction::{ExecutionRecord, ExecutionStatus, RelayInstruction};
pub use registry::ActionRegistry;
pub use store::{InstructionStore, MemoryInstructionStore};
