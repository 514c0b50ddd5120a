//! Fixed-size worker pool draining the bounded intake.
//!
//! Each worker processes one [`WorkItem`] at a time to completion before
//! taking the next, so concurrent store queries and executor calls never
//! exceed the worker count. Per item:
//!
//! 1. Resolve the relay's instructions from the [`InstructionStore`].
//!    Relay not found is a silent drop; any other store error fails the item.
//! 2. Resolve the executor from the [`ActionRegistry`]. Unknown action type
//!    is a silent drop.
//! 3. Run the executor under the pool's cancellation token. A panic is
//!    caught and fails the item; the worker keeps running.
//! 4. Append an execution record (best effort, errors are only logged).
//! 5. Fire the item's completion. Silent drops count as success.

use std::num::NonZeroUsize;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use relay_core::{ActionRegistry, ExecutionRecord, InstructionStore, StoreError};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::intake::{self, IntakeReceiver, IntakeSender};
use crate::work::{Outcome, WorkItem};

// ---------------------------------------------------------------------------
// Disposition
// ---------------------------------------------------------------------------

/// Why an item was acknowledged without running an executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    /// The relay does not exist or is inactive.
    RelayNotFound,
    /// The relay names an action type nothing is registered under.
    UnknownActionType(String),
}

impl DropReason {
    fn as_str(&self) -> &'static str {
        match self {
            Self::RelayNotFound => "relay_not_found",
            Self::UnknownActionType(_) => "unknown_action_type",
        }
    }
}

/// Result of dispatching one item, before it is collapsed to an [`Outcome`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    Succeeded,
    Failed(String),
    Dropped(DropReason),
}

impl Disposition {
    pub fn outcome(&self) -> Outcome {
        match self {
            Self::Succeeded | Self::Dropped(_) => Outcome::Success,
            Self::Failed(_) => Outcome::Failure,
        }
    }

    /// Audit record for this disposition. A missing relay has nothing to
    /// attach a record to.
    fn record(&self, relay_id: &str) -> Option<ExecutionRecord> {
        match self {
            Self::Succeeded => Some(ExecutionRecord::success(relay_id)),
            Self::Failed(details) => Some(ExecutionRecord::failed(relay_id, details.as_str())),
            Self::Dropped(DropReason::UnknownActionType(action_type)) => Some(
                ExecutionRecord::failed(relay_id, format!("Unknown action type: {action_type}")),
            ),
            Self::Dropped(DropReason::RelayNotFound) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// PoolStats
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Counters {
    dispatched: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

/// Point-in-time snapshot of pool counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub dispatched: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub dropped: u64,
}

impl Counters {
    fn observe(&self, disposition: &Disposition) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
        let counter = match disposition {
            Disposition::Succeeded => &self.succeeded,
            Disposition::Failed(_) => &self.failed,
            Disposition::Dropped(_) => &self.dropped,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> PoolStats {
        PoolStats {
            dispatched: self.dispatched.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Execution record details for an item whose dispatch panicked.
pub const EXECUTOR_PANICKED: &str = "executor panicked";

/// Per-item dispatch logic shared by all workers.
struct Dispatcher {
    store: Arc<dyn InstructionStore>,
    registry: Arc<ActionRegistry>,
    counters: Counters,
}

impl Dispatcher {
    /// Run one item through lookup, execution and audit, then fire its
    /// completion. Every path reaches the completion.
    async fn process(&self, worker_id: usize, item: WorkItem, cancel: &CancellationToken) {
        let started = Instant::now();
        let WorkItem {
            id,
            relay_id,
            payload,
            completion,
        } = item;

        let disposition = match AssertUnwindSafe(self.dispatch(&relay_id, &payload, cancel))
            .catch_unwind()
            .await
        {
            Ok(disposition) => disposition,
            Err(_) => Disposition::Failed(EXECUTOR_PANICKED.to_string()),
        };

        if let Some(record) = disposition.record(&relay_id) {
            if let Err(e) = self.store.append_execution_record(&record).await {
                tracing::warn!(
                    worker_id,
                    relay_id = %relay_id,
                    error = %e,
                    "Failed to write execution record",
                );
            }
        }

        self.counters.observe(&disposition);
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &disposition {
            Disposition::Succeeded => {
                tracing::info!(
                    worker_id,
                    item_id = %id,
                    relay_id = %relay_id,
                    elapsed_ms,
                    "Relay executed",
                );
            }
            Disposition::Failed(error) => {
                tracing::error!(
                    worker_id,
                    item_id = %id,
                    relay_id = %relay_id,
                    elapsed_ms,
                    error = %error,
                    "Relay execution failed",
                );
            }
            Disposition::Dropped(reason) => {
                tracing::warn!(
                    worker_id,
                    item_id = %id,
                    relay_id = %relay_id,
                    drop_reason = reason.as_str(),
                    "Dropping event",
                );
            }
        }

        completion.complete(disposition.outcome());
    }

    async fn dispatch(&self, relay_id: &str, payload: &[u8], cancel: &CancellationToken) -> Disposition {
        let instruction = match self.store.lookup(relay_id).await {
            Ok(instruction) => instruction,
            Err(StoreError::NotFound(_)) => return Disposition::Dropped(DropReason::RelayNotFound),
            Err(e) => return Disposition::Failed(e.to_string()),
        };

        let executor = match self.registry.resolve(&instruction.action_type) {
            Ok(executor) => executor,
            Err(_) => {
                return Disposition::Dropped(DropReason::UnknownActionType(instruction.action_type));
            }
        };

        tracing::debug!(relay_id, action_type = %instruction.action_type, "Executing relay action");
        match executor.execute(&instruction.config, payload, cancel).await {
            Ok(()) => Disposition::Succeeded,
            Err(e) => Disposition::Failed(e.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// WorkerPool
// ---------------------------------------------------------------------------

/// Bounded pool of workers fed by an intake queue.
pub struct WorkerPool {
    workers: NonZeroUsize,
    dispatcher: Arc<Dispatcher>,
    sender: IntakeSender,
    receiver: IntakeReceiver,
    tracker: TaskTracker,
    cancel: Option<CancellationToken>,
}

impl WorkerPool {
    /// Create a pool. Workers are not spawned until [`start`](Self::start).
    pub fn new(
        workers: NonZeroUsize,
        store: Arc<dyn InstructionStore>,
        registry: Arc<ActionRegistry>,
        intake_capacity: NonZeroUsize,
    ) -> Self {
        let (sender, receiver) = intake::channel(intake_capacity);
        Self {
            workers,
            dispatcher: Arc::new(Dispatcher {
                store,
                registry,
                counters: Counters::default(),
            }),
            sender,
            receiver,
            tracker: TaskTracker::new(),
            cancel: None,
        }
    }

    /// Producer handle for the queue bridge.
    pub fn intake(&self) -> IntakeSender {
        self.sender.clone()
    }

    pub fn worker_count(&self) -> usize {
        self.workers.get()
    }

    pub fn stats(&self) -> PoolStats {
        self.dispatcher.counters.snapshot()
    }

    /// Spawn the workers. `cancel` stops them taking new items and is passed
    /// to every executor call. Calling `start` twice is a no-op.
    pub fn start(&mut self, cancel: CancellationToken) {
        if self.cancel.is_some() {
            tracing::warn!("Worker pool already started");
            return;
        }

        for worker_id in 0..self.workers.get() {
            let dispatcher = Arc::clone(&self.dispatcher);
            let receiver = self.receiver.clone();
            let cancel = cancel.clone();
            self.tracker.spawn(run_worker(worker_id, dispatcher, receiver, cancel));
        }
        self.cancel = Some(cancel);
        tracing::info!(workers = self.workers.get(), "Worker pool started");
    }

    /// Two-phase drain.
    ///
    /// Phase 1 cancels the token so idle workers stop taking items. Phase 2
    /// closes the intake and waits for every worker to finish the item it
    /// already holds. Items still queued are completed as failures so the
    /// broker redelivers them.
    pub async fn shutdown(self) -> PoolStats {
        if let Some(cancel) = &self.cancel {
            cancel.cancel();
        }

        self.receiver.close().await;
        self.tracker.close();
        self.tracker.wait().await;

        let leftover = self.receiver.drain().await;
        if !leftover.is_empty() {
            tracing::warn!(count = leftover.len(), "Returning undispatched items for redelivery");
        }
        for item in leftover {
            item.completion.complete(Outcome::Failure);
        }

        let stats = self.stats();
        tracing::info!(
            dispatched = stats.dispatched,
            succeeded = stats.succeeded,
            failed = stats.failed,
            dropped = stats.dropped,
            "Worker pool stopped",
        );
        stats
    }
}

/// Worker loop: wait for cancellation or the next item, and process each
/// item to completion before looking again.
async fn run_worker(
    worker_id: usize,
    dispatcher: Arc<Dispatcher>,
    receiver: IntakeReceiver,
    cancel: CancellationToken,
) {
    tracing::debug!(worker_id, "Worker started");
    loop {
        let item = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            item = receiver.recv() => match item {
                Some(item) => item,
                None => break,
            },
        };
        dispatcher.process(worker_id, item, &cancel).await;
    }
    tracing::debug!(worker_id, "Worker stopped");
}
