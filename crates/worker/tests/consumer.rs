//! Broker to pool flow through the bridge and consumer, using the
//! in-memory broker.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use common::*;
use relay_core::MemoryInstructionStore;
use relay_worker::broker::memory::{Ack, MemoryMessage, MemorySource};
use relay_worker::{Admission, ExecutionBridge, QueueConsumer};
use serde_json::json;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn each_message_is_acknowledged_exactly_once() {
    let store = Arc::new(MemoryInstructionStore::new());
    store.insert(instruction("R1", "test_action", json!({})));
    store.insert(instruction("R3", "failing", json!({})));
    let executor = Arc::new(Recording::default());
    let mut registry = relay_core::ActionRegistry::new();
    registry.register("test_action", executor.clone());
    registry.register("failing", Arc::new(Rejecting));
    let mut pool = relay_worker::WorkerPool::new(nz(2), store.clone(), Arc::new(registry), nz(4));
    let cancel = CancellationToken::new();
    pool.start(cancel.clone());

    let bridge = ExecutionBridge::new(pool.intake());
    let consumer = QueueConsumer::new(bridge.clone());
    let (publisher, source) = MemorySource::channel(8);

    let (ok, mut ok_acks) = MemoryMessage::new("events.r1", envelope("R1"));
    let (missing, mut missing_acks) = MemoryMessage::new("events.r2", envelope("R2"));
    let (failing, mut failing_acks) = MemoryMessage::new("events.r3", envelope("R3"));
    let (garbage, mut garbage_acks) = MemoryMessage::new("events.x", b"not json".to_vec());
    for message in [ok, missing, failing, garbage] {
        publisher.send(message).await.unwrap();
    }
    drop(publisher);

    let stats = consumer.run(source).await;
    assert_eq!(stats.received, 4);
    assert_eq!(stats.admitted, 3);
    assert_eq!(stats.malformed, 1);

    // Every admitted item is dispatched before the pool is shut down.
    assert_eq!(ok_acks.next().await, Some(Ack::Ack));
    assert_eq!(missing_acks.next().await, Some(Ack::Ack));
    assert_eq!(failing_acks.next().await, Some(Ack::Nak));
    assert_eq!(garbage_acks.next().await, Some(Ack::Nak));

    cancel.cancel();
    pool.shutdown().await;
    bridge.wait_for_acks().await;

    assert_eq!(ok_acks.next().await, None);
    assert_eq!(missing_acks.next().await, None);
    assert_eq!(failing_acks.next().await, None);
    assert_eq!(garbage_acks.next().await, None);

    assert_eq!(executor.calls.load(Ordering::SeqCst), 1);
    assert_eq!(executor.payloads.lock().unwrap()[0], br#"{"text":"hello"}"#.to_vec());
}

#[tokio::test]
async fn full_intake_blocks_the_bridge() {
    let store = Arc::new(MemoryInstructionStore::new());
    store.insert(instruction("R1", "test_action", json!({})));
    let executor = Arc::new(Recording::default());
    let mut pool = pool_with(store.clone(), executor.clone(), 1, 1);
    let bridge = ExecutionBridge::new(pool.intake());

    let (first, mut first_acks) = MemoryMessage::new("events.r1", envelope("R1"));
    assert_eq!(bridge.handle(first).await, Admission::Admitted);

    let (second, mut second_acks) = MemoryMessage::new("events.r1", envelope("R1"));
    let blocked = {
        let bridge = bridge.clone();
        tokio::spawn(async move { bridge.handle(second).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!blocked.is_finished());

    pool.start(CancellationToken::new());
    assert_eq!(blocked.await.unwrap(), Admission::Admitted);
    assert_eq!(first_acks.next().await, Some(Ack::Ack));
    assert_eq!(second_acks.next().await, Some(Ack::Ack));

    pool.shutdown().await;
    bridge.wait_for_acks().await;
    assert_eq!(executor.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn messages_queued_at_shutdown_are_nacked() {
    let store = Arc::new(MemoryInstructionStore::new());
    store.insert(instruction("R1", "test_action", json!({})));
    let executor = Arc::new(Gated::default());
    let mut pool = pool_with(store.clone(), executor.clone(), 1, 4);
    let cancel = CancellationToken::new();
    pool.start(cancel.clone());
    let bridge = ExecutionBridge::new(pool.intake());

    let (first, mut first_acks) = MemoryMessage::new("events.r1", envelope("R1"));
    bridge.handle(first).await;
    executor.started.notified().await;
    let (second, mut second_acks) = MemoryMessage::new("events.r1", envelope("R1"));
    bridge.handle(second).await;

    cancel.cancel();
    let shutdown = tokio::spawn(pool.shutdown());
    tokio::time::sleep(Duration::from_millis(20)).await;
    executor.gate.add_permits(1);
    shutdown.await.unwrap();
    bridge.wait_for_acks().await;

    assert_eq!(first_acks.next().await, Some(Ack::Ack));
    assert_eq!(second_acks.next().await, Some(Ack::Nak));
    assert_eq!(second_acks.next().await, None);
}
