//! Sharded event dispatcher.
//!
//! A fixed array of worker slots, each owning one bounded queue. Events are
//! routed to a slot by a stable hash of the tracking number, so all events
//! for one shipment land on the same worker in arrival order. Each worker
//! drains its queue sequentially, which yields the core guarantee:
//!
//! For any two events with the same tracking number, the one enqueued
//! first is processed to completion before the second begins. Events for
//! different shipments proceed in parallel across workers.

use std::sync::Arc;
use std::time::Instant;

use opentelemetry::KeyValue;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::domain::TrackingEvent;
use crate::services::EventService;
use crate::utils::metrics;

/// Default number of worker slots.
pub const DEFAULT_WORKERS: usize = 8;
/// Default per-worker queue capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Enqueue failed because the workers have shut down.
#[derive(Debug, thiserror::Error)]
#[error("event queue closed")]
pub struct QueueClosed;

/// Routes tracking events to a fixed set of workers using a stable hash of
/// the tracking number.
pub struct Dispatcher {
    senders: Vec<mpsc::Sender<TrackingEvent>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Dispatcher {
    /// Spawn `workers` worker tasks, each with a bounded queue of
    /// `capacity` events. Zero values fall back to the defaults.
    ///
    /// Workers run until `shutdown` flips (or its sender is dropped); the
    /// in-flight event completes, queued events are abandoned.
    pub fn start(
        workers: usize,
        capacity: usize,
        service: Arc<dyn EventService>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let workers = if workers == 0 { DEFAULT_WORKERS } else { workers };
        let capacity = if capacity == 0 {
            DEFAULT_QUEUE_CAPACITY
        } else {
            capacity
        };

        let mut senders = Vec::with_capacity(workers);
        let mut handles = Vec::with_capacity(workers);
        for id in 0..workers {
            let (tx, rx) = mpsc::channel(capacity);
            senders.push(tx);
            handles.push(tokio::spawn(run_worker(
                id,
                rx,
                service.clone(),
                shutdown.clone(),
            )));
        }

        info!(workers, capacity, "event dispatcher started");

        Self {
            senders,
            handles: Mutex::new(handles),
        }
    }

    /// Enqueue one event on the worker responsible for its tracking
    /// number. Blocks the caller only while the target queue is full;
    /// producers observe that backpressure as added latency.
    pub async fn enqueue(&self, event: TrackingEvent) -> Result<(), QueueClosed> {
        let idx = self.shard_index(&event.tracking_number);
        let sender = &self.senders[idx];

        sender.send(event).await.map_err(|_| QueueClosed)?;

        let depth = sender.max_capacity() - sender.capacity();
        metrics::QUEUE_DEPTH.record(
            depth as u64,
            &[KeyValue::new("worker_id", idx.to_string())],
        );

        Ok(())
    }

    /// Enqueue a batch in input order. Equivalent to repeated single
    /// enqueues: per-shipment ordering within the batch is preserved and
    /// partial success is possible.
    pub async fn enqueue_batch(&self, events: Vec<TrackingEvent>) -> Result<(), QueueClosed> {
        for event in events {
            self.enqueue(event).await?;
        }
        Ok(())
    }

    /// Wait for all workers to exit. Call after flipping the shutdown
    /// signal.
    pub async fn join(&self) {
        let handles: Vec<_> = self.handles.lock().await.drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                error!(error = %e, "event worker panicked");
            }
        }
    }

    /// Map a tracking number deterministically to a worker index. The hash
    /// is stable across processes and restarts.
    fn shard_index(&self, tracking_number: &str) -> usize {
        fnv1a(tracking_number.as_bytes()) as usize % self.senders.len()
    }
}

/// 32-bit FNV-1a.
fn fnv1a(bytes: &[u8]) -> u32 {
    const OFFSET_BASIS: u32 = 0x811c_9dc5;
    const PRIME: u32 = 0x0100_0193;

    bytes
        .iter()
        .fold(OFFSET_BASIS, |hash, b| (hash ^ u32::from(*b)).wrapping_mul(PRIME))
}

async fn run_worker(
    id: usize,
    mut queue: mpsc::Receiver<TrackingEvent>,
    service: Arc<dyn EventService>,
    mut shutdown: watch::Receiver<bool>,
) {
    let worker_id = id.to_string();
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            next = queue.recv() => {
                let Some(event) = next else { break };

                metrics::QUEUE_DEPTH.record(
                    queue.len() as u64,
                    &[KeyValue::new("worker_id", worker_id.clone())],
                );

                let started = Instant::now();
                let result = service.process(event.clone()).await;
                let elapsed = started.elapsed().as_secs_f64();

                let status_label = match &result {
                    Ok(()) => event.status.as_str(),
                    Err(e) => {
                        error!(
                            tracking = %event.tracking_number,
                            worker = id,
                            error = %e,
                            "event processing failed"
                        );
                        metrics::EVENTS_ERRORS.add(1, &[KeyValue::new("reason", e.reason())]);
                        "error"
                    }
                };
                metrics::EVENT_DURATION.record(
                    elapsed,
                    &[KeyValue::new("status", status_label)],
                );
            }
        }
    }
    debug!(worker = id, "event worker stopped");
}

#[cfg(test)]
mod tests;
