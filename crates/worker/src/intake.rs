//! Bounded intake queue between the broker bridge and the worker pool.
//!
//! Many producers (broker handlers) and many consumers (workers). A full
//! queue suspends [`IntakeSender::send`] until a worker frees a slot; that
//! suspension is the system's backpressure. [`IntakeReceiver::close`] fails
//! every blocked and future send while leaving buffered items drainable.

use std::num::NonZeroUsize;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use crate::work::WorkItem;

/// Returned by [`IntakeSender::send`] once the intake has been closed. Hands
/// the rejected item back to the caller.
#[derive(Debug, thiserror::Error)]
#[error("Intake queue is closed")]
pub struct IntakeClosed(pub WorkItem);

/// Create a bounded intake with room for `capacity` queued items.
pub fn channel(capacity: NonZeroUsize) -> (IntakeSender, IntakeReceiver) {
    let (tx, rx) = mpsc::channel(capacity.get());
    (
        IntakeSender { tx },
        IntakeReceiver {
            rx: Arc::new(Mutex::new(rx)),
        },
    )
}

/// Producer half. Cheap to clone.
#[derive(Debug, Clone)]
pub struct IntakeSender {
    tx: mpsc::Sender<WorkItem>,
}

impl IntakeSender {
    /// Enqueue an item, waiting for capacity if the queue is full.
    pub async fn send(&self, item: WorkItem) -> Result<(), IntakeClosed> {
        self.tx.send(item).await.map_err(|e| IntakeClosed(e.0))
    }

    /// Free slots at this instant.
    pub fn available(&self) -> usize {
        self.tx.capacity()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer half shared by every worker. Cheap to clone.
#[derive(Debug, Clone)]
pub struct IntakeReceiver {
    rx: Arc<Mutex<mpsc::Receiver<WorkItem>>>,
}

impl IntakeReceiver {
    /// Take the next item. `None` once the intake is closed and drained.
    ///
    /// Cancel safe: dropping the future never loses an item.
    pub async fn recv(&self) -> Option<WorkItem> {
        self.rx.lock().await.recv().await
    }

    /// Reject all blocked and future sends. Buffered items stay available.
    pub async fn close(&self) {
        self.rx.lock().await.close();
    }

    /// Remove every item still buffered without waiting for new ones.
    pub async fn drain(&self) -> Vec<WorkItem> {
        let mut rx = self.rx.lock().await;
        let mut items = Vec::new();
        while let Ok(item) = rx.try_recv() {
            items.push(item);
        }
        items
    }
}
