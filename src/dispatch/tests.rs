use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::time::sleep;

use super::*;
use crate::domain::ShipmentStatus;
use crate::services::event_processor::{ProcessError, Result as ProcessResult};

/// Records the order in which events are processed, per tracking number.
/// The artificial delay widens any ordering race a broken dispatcher would
/// have.
struct RecordingService {
    processed: Mutex<Vec<(String, ShipmentStatus)>>,
    delay: Duration,
}

impl RecordingService {
    fn new(delay: Duration) -> Self {
        Self {
            processed: Mutex::new(Vec::new()),
            delay,
        }
    }

    fn by_tracking(&self) -> HashMap<String, Vec<ShipmentStatus>> {
        let mut grouped: HashMap<String, Vec<ShipmentStatus>> = HashMap::new();
        for (tracking, status) in self.processed.lock().expect("lock poisoned").iter() {
            grouped.entry(tracking.clone()).or_default().push(*status);
        }
        grouped
    }

    fn count(&self) -> usize {
        self.processed.lock().expect("lock poisoned").len()
    }
}

#[async_trait]
impl EventService for RecordingService {
    async fn process(&self, event: TrackingEvent) -> ProcessResult<()> {
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }
        self.processed
            .lock()
            .expect("lock poisoned")
            .push((event.tracking_number, event.status));
        Ok(())
    }
}

/// Always fails; used to check that failures never tear down a worker.
struct FailingService;

#[async_trait]
impl EventService for FailingService {
    async fn process(&self, event: TrackingEvent) -> ProcessResult<()> {
        Err(ProcessError::ShipmentNotFound {
            tracking_number: event.tracking_number,
        })
    }
}

fn event(tracking: &str, status: ShipmentStatus) -> TrackingEvent {
    TrackingEvent {
        tracking_number: tracking.to_string(),
        status,
        timestamp: Utc::now(),
        source: "test".to_string(),
        location: None,
    }
}

async fn wait_for(service: &RecordingService, expected: usize) {
    for _ in 0..200 {
        if service.count() >= expected {
            return;
        }
        sleep(Duration::from_millis(10)).await;
    }
    panic!(
        "timed out waiting for {expected} events, saw {}",
        service.count()
    );
}

#[test]
fn test_fnv1a_known_values() {
    // Reference vectors for 32-bit FNV-1a.
    assert_eq!(fnv1a(b""), 0x811c_9dc5);
    assert_eq!(fnv1a(b"a"), 0xe40c_292c);
    assert_eq!(fnv1a(b"foobar"), 0xbf9c_f968);
}

#[tokio::test]
async fn test_shard_index_is_stable() {
    let (_tx, rx) = watch::channel(false);
    let service = Arc::new(RecordingService::new(Duration::ZERO));
    let dispatcher = Dispatcher::start(8, 4, service.clone(), rx.clone());
    let other = Dispatcher::start(8, 4, service, rx);

    for tracking in ["99M-00000001", "99M-DEADBEEF", "99M-CAFEBABE"] {
        let idx = dispatcher.shard_index(tracking);
        assert_eq!(idx, dispatcher.shard_index(tracking));
        // Same mapping in a separately constructed dispatcher.
        assert_eq!(idx, other.shard_index(tracking));
        assert!(idx < 8);
    }
}

#[tokio::test]
async fn test_per_shipment_fifo_under_interleaving() {
    let service = Arc::new(RecordingService::new(Duration::from_millis(2)));
    let (_tx, rx) = watch::channel(false);
    let dispatcher = Dispatcher::start(4, 64, service.clone(), rx);

    let walk = [
        ShipmentStatus::PickedUp,
        ShipmentStatus::InWarehouse,
        ShipmentStatus::InTransit,
        ShipmentStatus::Delivered,
    ];

    // Interleave the walks of many shipments; each shipment's own events
    // must still come out in enqueue order.
    let trackings: Vec<String> = (0..10).map(|i| format!("99M-{i:08X}")).collect();
    for status in walk {
        for tracking in &trackings {
            dispatcher.enqueue(event(tracking, status)).await.unwrap();
        }
    }

    wait_for(&service, 40).await;

    let grouped = service.by_tracking();
    assert_eq!(grouped.len(), 10);
    for statuses in grouped.values() {
        assert_eq!(statuses.as_slice(), &walk);
    }
}

#[tokio::test]
async fn test_batch_preserves_input_order_per_shipment() {
    let service = Arc::new(RecordingService::new(Duration::ZERO));
    let (_tx, rx) = watch::channel(false);
    let dispatcher = Dispatcher::start(2, 16, service.clone(), rx);

    let batch = vec![
        event("99M-AAAAAAAA", ShipmentStatus::PickedUp),
        event("99M-BBBBBBBB", ShipmentStatus::PickedUp),
        event("99M-AAAAAAAA", ShipmentStatus::InWarehouse),
        event("99M-AAAAAAAA", ShipmentStatus::InTransit),
    ];
    dispatcher.enqueue_batch(batch).await.unwrap();

    wait_for(&service, 4).await;

    let grouped = service.by_tracking();
    assert_eq!(
        grouped["99M-AAAAAAAA"],
        vec![
            ShipmentStatus::PickedUp,
            ShipmentStatus::InWarehouse,
            ShipmentStatus::InTransit
        ]
    );
}

#[tokio::test]
async fn test_failures_do_not_stop_the_worker() {
    let (_tx, rx) = watch::channel(false);
    let dispatcher = Dispatcher::start(1, 1, Arc::new(FailingService), rx);

    // With a capacity-1 queue, each subsequent enqueue only completes if
    // the worker keeps draining after failures.
    for i in 0..5 {
        tokio::time::timeout(
            Duration::from_secs(5),
            dispatcher.enqueue(event(&format!("99M-0000000{i}"), ShipmentStatus::PickedUp)),
        )
        .await
        .expect("worker stopped draining after a failure")
        .unwrap();
    }
}

#[tokio::test]
async fn test_shutdown_stops_workers() {
    let service = Arc::new(RecordingService::new(Duration::ZERO));
    let (tx, rx) = watch::channel(false);
    let dispatcher = Dispatcher::start(4, 16, service, rx);

    tx.send(true).expect("workers listening");
    // join() only returns once every worker task has exited.
    tokio::time::timeout(Duration::from_secs(5), dispatcher.join())
        .await
        .expect("workers should stop after the shutdown signal");
}

#[tokio::test]
async fn test_enqueue_after_shutdown_fails() {
    let service = Arc::new(RecordingService::new(Duration::ZERO));
    let (tx, rx) = watch::channel(false);
    let dispatcher = Dispatcher::start(1, 4, service, rx);

    tx.send(true).expect("workers listening");
    dispatcher.join().await;

    let result = dispatcher
        .enqueue(event("99M-00000001", ShipmentStatus::PickedUp))
        .await;
    assert!(result.is_err());
}
