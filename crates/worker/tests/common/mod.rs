//! Executors and fixtures shared by the worker integration tests.

#![allow(dead_code)]

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use relay_core::{
    ActionConfig, ActionError, ActionExecutor, ActionRegistry, MemoryInstructionStore,
    RelayInstruction,
};
use relay_worker::WorkerPool;
use tokio::sync::{Notify, Semaphore};
use tokio_util::sync::CancellationToken;

pub fn nz(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).unwrap()
}

pub fn instruction(relay_id: &str, action_type: &str, config: serde_json::Value) -> RelayInstruction {
    RelayInstruction {
        relay_id: relay_id.to_string(),
        action_type: action_type.to_string(),
        config: config.as_object().cloned().unwrap_or_default(),
    }
}

pub fn envelope(relay_id: &str) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "relay_id": relay_id,
        "payload": {"text": "hello"},
    }))
    .unwrap()
}

/// Counts calls and remembers the last payload.
#[derive(Default)]
pub struct Recording {
    pub calls: AtomicUsize,
    pub payloads: std::sync::Mutex<Vec<Vec<u8>>>,
}

#[async_trait]
impl ActionExecutor for Recording {
    async fn execute(
        &self,
        _config: &ActionConfig,
        payload: &[u8],
        _cancel: &CancellationToken,
    ) -> Result<(), ActionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.payloads.lock().unwrap().push(payload.to_vec());
        Ok(())
    }
}

/// Always fails with an HTTP status.
pub struct Rejecting;

#[async_trait]
impl ActionExecutor for Rejecting {
    async fn execute(
        &self,
        _config: &ActionConfig,
        _payload: &[u8],
        _cancel: &CancellationToken,
    ) -> Result<(), ActionError> {
        Err(ActionError::HttpStatus(500))
    }
}

/// Sleeps while tracking how many calls overlap.
#[derive(Default)]
pub struct Overlapping {
    current: AtomicUsize,
    pub peak: AtomicUsize,
    pub calls: AtomicUsize,
}

#[async_trait]
impl ActionExecutor for Overlapping {
    async fn execute(
        &self,
        _config: &ActionConfig,
        _payload: &[u8],
        _cancel: &CancellationToken,
    ) -> Result<(), ActionError> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.current.fetch_sub(1, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Blocks each call until a permit is released. Ignores cancellation so
/// tests control exactly when in-flight work ends.
pub struct Gated {
    pub started: Notify,
    pub gate: Semaphore,
}

impl Default for Gated {
    fn default() -> Self {
        Self {
            started: Notify::new(),
            gate: Semaphore::new(0),
        }
    }
}

#[async_trait]
impl ActionExecutor for Gated {
    async fn execute(
        &self,
        _config: &ActionConfig,
        _payload: &[u8],
        _cancel: &CancellationToken,
    ) -> Result<(), ActionError> {
        self.started.notify_one();
        let permit = self.gate.acquire().await.map_err(|e| ActionError::Transport(Box::new(e)))?;
        permit.forget();
        Ok(())
    }
}

/// Panics on every call.
pub struct Panicking;

#[async_trait]
impl ActionExecutor for Panicking {
    async fn execute(
        &self,
        _config: &ActionConfig,
        _payload: &[u8],
        _cancel: &CancellationToken,
    ) -> Result<(), ActionError> {
        panic!("executor blew up");
    }
}

/// Runs until the pool's token is cancelled, then reports cancellation.
#[derive(Default)]
pub struct UntilCancelled {
    pub started: Notify,
}

#[async_trait]
impl ActionExecutor for UntilCancelled {
    async fn execute(
        &self,
        _config: &ActionConfig,
        _payload: &[u8],
        cancel: &CancellationToken,
    ) -> Result<(), ActionError> {
        self.started.notify_one();
        cancel.cancelled().await;
        Err(ActionError::Cancelled)
    }
}

/// Pool over `store` with `executor` registered as `test_action`.
pub fn pool_with(
    store: Arc<MemoryInstructionStore>,
    executor: Arc<dyn ActionExecutor>,
    workers: usize,
    capacity: usize,
) -> WorkerPool {
    let mut registry = ActionRegistry::new();
    registry.register("test_action", executor);
    WorkerPool::new(nz(workers), store, Arc::new(registry), nz(capacity))
}
