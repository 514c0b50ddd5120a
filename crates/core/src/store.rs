//! Instruction store capability.
//!
//! The production implementation is backed by PostgreSQL (`relay-db`);
//! [`MemoryInstructionStore`] serves tests and local development.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::error::StoreError;
use crate::instruction::{ExecutionRecord, RelayInstruction};

/// Read relay instructions and append execution audit records.
///
/// Shared by every worker, so implementations must tolerate concurrent
/// calls.
#[async_trait]
pub trait InstructionStore: Send + Sync {
    /// Resolve the instructions of an active relay.
    ///
    /// Returns [`StoreError::NotFound`] when the relay does not exist or is
    /// inactive.
    async fn lookup(&self, relay_id: &str) -> Result<RelayInstruction, StoreError>;

    /// Append one row to the execution audit trail.
    async fn append_execution_record(&self, record: &ExecutionRecord) -> Result<(), StoreError>;
}

// ---------------------------------------------------------------------------
// MemoryInstructionStore
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct MemoryState {
    relays: HashMap<String, RelayInstruction>,
    records: Vec<ExecutionRecord>,
    fail_lookups: Option<String>,
    fail_appends: Option<String>,
}

/// In-process store keeping instructions in a map and records in a vector.
///
/// Not durable. Failure injection hooks let tests exercise the backend
/// error paths.
#[derive(Debug, Default)]
pub struct MemoryInstructionStore {
    state: Mutex<MemoryState>,
}

impl MemoryInstructionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the instructions for a relay.
    pub fn insert(&self, instruction: RelayInstruction) {
        self.with_state(|state| {
            state
                .relays
                .insert(instruction.relay_id.clone(), instruction);
        });
    }

    /// Remove a relay, as if it had been deactivated.
    pub fn remove(&self, relay_id: &str) {
        self.with_state(|state| {
            state.relays.remove(relay_id);
        });
    }

    /// Make every subsequent lookup fail with a backend error.
    pub fn fail_lookups(&self, message: impl Into<String>) {
        let message = message.into();
        self.with_state(|state| state.fail_lookups = Some(message));
    }

    /// Make every subsequent record append fail with a backend error.
    pub fn fail_appends(&self, message: impl Into<String>) {
        let message = message.into();
        self.with_state(|state| state.fail_appends = Some(message));
    }

    /// Snapshot of all execution records appended so far.
    pub fn records(&self) -> Vec<ExecutionRecord> {
        self.with_state(|state| state.records.clone())
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut MemoryState) -> T) -> T {
        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}

#[async_trait]
impl InstructionStore for MemoryInstructionStore {
    async fn lookup(&self, relay_id: &str) -> Result<RelayInstruction, StoreError> {
        self.with_state(|state| {
            if let Some(message) = &state.fail_lookups {
                return Err(StoreError::backend(message.clone()));
            }
            state
                .relays
                .get(relay_id)
                .cloned()
                .ok_or_else(|| StoreError::NotFound(relay_id.to_string()))
        })
    }

    async fn append_execution_record(&self, record: &ExecutionRecord) -> Result<(), StoreError> {
        self.with_state(|state| {
            if let Some(message) = &state.fail_appends {
                return Err(StoreError::backend(message.clone()));
            }
            state.records.push(record.clone());
            Ok(())
        })
    }
}
