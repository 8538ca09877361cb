//! Event processing: one tracking event's journey from dedup check to
//! audit insert.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use opentelemetry::KeyValue;
use tracing::{debug, info, warn};

use crate::domain::{AuditRecord, ShipmentStatus, TrackingEvent};
use crate::interfaces::{DedupStore, EventStore, ShipmentStore, StorageError};
use crate::utils::metrics;

/// Result type for event processing.
pub type Result<T> = std::result::Result<T, ProcessError>;

/// Terminal failures for a single event. No internal retry.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("shipment not found: {tracking_number}")]
    ShipmentNotFound { tracking_number: String },

    #[error("invalid status transition from {from} to {to}")]
    InvalidTransition {
        from: ShipmentStatus,
        to: ShipmentStatus,
    },

    #[error("status update failed: {0}")]
    UpdateFailed(#[source] StorageError),

    #[error("storage error: {0}")]
    Store(#[from] StorageError),
}

impl ProcessError {
    /// Short label used as the error-counter reason.
    pub fn reason(&self) -> &'static str {
        match self {
            ProcessError::ShipmentNotFound { .. } => "shipment_not_found",
            ProcessError::InvalidTransition { .. } => "invalid_transition",
            ProcessError::UpdateFailed(_) => "update_failed",
            ProcessError::Store(_) => "store_error",
        }
    }
}

/// Processes incoming tracking events. Implemented by `EventProcessor`;
/// the dispatcher only sees this trait.
#[async_trait]
pub trait EventService: Send + Sync {
    async fn process(&self, event: TrackingEvent) -> Result<()>;
}

/// Orchestrates one event: dedup check → load shipment → transition check
/// → mark dedup → atomic update → audit insert.
pub struct EventProcessor {
    shipments: Arc<dyn ShipmentStore>,
    events: Arc<dyn EventStore>,
    dedup: Arc<dyn DedupStore>,
}

impl EventProcessor {
    pub fn new(
        shipments: Arc<dyn ShipmentStore>,
        events: Arc<dyn EventStore>,
        dedup: Arc<dyn DedupStore>,
    ) -> Self {
        Self {
            shipments,
            events,
            dedup,
        }
    }
}

#[async_trait]
impl EventService for EventProcessor {
    #[tracing::instrument(
        name = "event.process",
        skip_all,
        fields(tracking = %event.tracking_number, status = %event.status)
    )]
    async fn process(&self, event: TrackingEvent) -> Result<()> {
        // 1. Idempotency check. A duplicate is silent success; a failing
        //    dedup store degrades to best-effort dedup.
        match self
            .dedup
            .seen(&event.tracking_number, event.status, event.timestamp)
            .await
        {
            Ok(true) => {
                debug!("duplicate event skipped");
                metrics::EVENTS_DEDUP.add(1, &[KeyValue::new("result", "hit")]);
                return Ok(());
            }
            Ok(false) => {
                metrics::EVENTS_DEDUP.add(1, &[KeyValue::new("result", "miss")]);
            }
            Err(e) => {
                warn!(error = %e, "dedup check failed, processing anyway");
            }
        }

        // 2. Load shipment. Events carry no client identity, so no
        //    ownership filter.
        let shipment = self
            .shipments
            .find_by_tracking(&event.tracking_number, None)
            .await
            .map_err(|e| match e {
                StorageError::ShipmentNotFound(tracking_number) => {
                    ProcessError::ShipmentNotFound { tracking_number }
                }
                other => ProcessError::Store(other),
            })?;

        // 3. Validate the state machine transition.
        if !shipment.status.can_transition(event.status) {
            return Err(ProcessError::InvalidTransition {
                from: shipment.status,
                to: event.status,
            });
        }

        // 4. Mark as processed before writing. Marking first means a crash
        //    between mark and persist loses the event (at-most-once);
        //    marking after would permit duplicate writes on retry.
        if let Err(e) = self
            .dedup
            .mark(&event.tracking_number, event.status, event.timestamp)
            .await
        {
            warn!(error = %e, "failed to set dedup key");
        }

        // 5. Atomically update shipment status + history.
        self.events
            .update_status_and_append_history(
                &event.tracking_number,
                event.status,
                event.timestamp,
                &event.source,
                event.location,
            )
            .await
            .map_err(|e| match e {
                StorageError::ShipmentNotFound(tracking_number) => {
                    ProcessError::ShipmentNotFound { tracking_number }
                }
                other => ProcessError::UpdateFailed(other),
            })?;

        // 6. Audit trail. The embedded history is the record of truth;
        //    audit failure is a warning, not a failure.
        let record = AuditRecord {
            tracking_number: event.tracking_number.clone(),
            status: event.status,
            timestamp: event.timestamp,
            source: event.source.clone(),
            location: event.location,
            processed_at: Utc::now(),
        };
        if let Err(e) = self.events.insert_audit(&record).await {
            warn!(error = %e, "failed to insert audit event");
        }

        info!(source = %event.source, "event processed");
        metrics::EVENTS_PROCESSED.add(
            1,
            &[
                KeyValue::new("status", event.status.as_str()),
                KeyValue::new("source", event.source),
            ],
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{DateTime, Utc};

    use crate::domain::Location;
    use crate::storage::memory::{MemoryDedupStore, MemoryStore};
    use crate::test_utils::sample_shipment;

    const TRACKING: &str = "99M-AABBCCDD";

    fn event(status: ShipmentStatus, timestamp: DateTime<Utc>) -> TrackingEvent {
        TrackingEvent {
            tracking_number: TRACKING.to_string(),
            status,
            timestamp,
            source: "driver_app".to_string(),
            location: None,
        }
    }

    fn processor(
        store: &Arc<MemoryStore>,
        dedup: &Arc<MemoryDedupStore>,
    ) -> EventProcessor {
        EventProcessor::new(store.clone(), store.clone(), dedup.clone())
    }

    #[tokio::test]
    async fn test_process_happy_path() {
        let store = Arc::new(MemoryStore::new());
        let dedup = Arc::new(MemoryDedupStore::new());
        store.insert_shipment(sample_shipment(TRACKING, ShipmentStatus::Created));

        let svc = processor(&store, &dedup);
        svc.process(event(ShipmentStatus::PickedUp, Utc::now()))
            .await
            .expect("processing should succeed");

        let shipment = store.shipment(TRACKING).unwrap();
        assert_eq!(shipment.status, ShipmentStatus::PickedUp);
        assert_eq!(shipment.status_history.len(), 2);
        assert_eq!(shipment.status_history[1].notes, "driver_app");
        assert_eq!(store.audits().len(), 1);
        assert_eq!(dedup.marked_count(), 1);
    }

    #[tokio::test]
    async fn test_process_duplicate_skipped() {
        let store = Arc::new(MemoryStore::new());
        let dedup = Arc::new(MemoryDedupStore::new());
        store.insert_shipment(sample_shipment(TRACKING, ShipmentStatus::Created));

        let ts = Utc::now();
        let svc = processor(&store, &dedup);
        svc.process(event(ShipmentStatus::PickedUp, ts)).await.unwrap();
        svc.process(event(ShipmentStatus::PickedUp, ts)).await.unwrap();

        // Exactly one history entry and one audit record despite two sends.
        let shipment = store.shipment(TRACKING).unwrap();
        assert_eq!(shipment.status_history.len(), 2);
        assert_eq!(store.audits().len(), 1);
    }

    #[tokio::test]
    async fn test_process_shipment_not_found() {
        let store = Arc::new(MemoryStore::new());
        let dedup = Arc::new(MemoryDedupStore::new());

        let svc = processor(&store, &dedup);
        let err = svc
            .process(event(ShipmentStatus::PickedUp, Utc::now()))
            .await
            .unwrap_err();

        assert!(matches!(err, ProcessError::ShipmentNotFound { .. }));
        assert_eq!(err.reason(), "shipment_not_found");
    }

    #[tokio::test]
    async fn test_process_invalid_transition() {
        let store = Arc::new(MemoryStore::new());
        let dedup = Arc::new(MemoryDedupStore::new());
        store.insert_shipment(sample_shipment(TRACKING, ShipmentStatus::Created));

        let svc = processor(&store, &dedup);
        let err = svc
            .process(event(ShipmentStatus::Delivered, Utc::now()))
            .await
            .unwrap_err();

        match err {
            ProcessError::InvalidTransition { from, to } => {
                assert_eq!(from, ShipmentStatus::Created);
                assert_eq!(to, ShipmentStatus::Delivered);
            }
            other => panic!("expected InvalidTransition, got {other:?}"),
        }

        // No side effects on rejection.
        let shipment = store.shipment(TRACKING).unwrap();
        assert_eq!(shipment.status, ShipmentStatus::Created);
        assert_eq!(shipment.status_history.len(), 1);
        assert!(store.audits().is_empty());
        assert_eq!(dedup.marked_count(), 0);
    }

    #[tokio::test]
    async fn test_process_with_location() {
        let store = Arc::new(MemoryStore::new());
        let dedup = Arc::new(MemoryDedupStore::new());
        store.insert_shipment(sample_shipment(TRACKING, ShipmentStatus::PickedUp));

        let svc = processor(&store, &dedup);
        let mut ev = event(ShipmentStatus::InWarehouse, Utc::now());
        ev.source = "warehouse_scanner".to_string();
        ev.location = Some(Location {
            lat: 19.4326,
            lng: -99.1332,
        });
        svc.process(ev).await.unwrap();

        let audits = store.audits();
        assert_eq!(audits.len(), 1);
        let location = audits[0].location.expect("location should be recorded");
        assert!((location.lat - 19.4326).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_process_dedup_error_processes_anyway() {
        let store = Arc::new(MemoryStore::new());
        let dedup = Arc::new(MemoryDedupStore::new());
        store.insert_shipment(sample_shipment(TRACKING, ShipmentStatus::Created));
        dedup.fail(true);

        let svc = processor(&store, &dedup);
        svc.process(event(ShipmentStatus::PickedUp, Utc::now()))
            .await
            .expect("dedup outage must not block processing");

        assert_eq!(store.shipment(TRACKING).unwrap().status, ShipmentStatus::PickedUp);
    }

    #[tokio::test]
    async fn test_process_audit_failure_is_non_fatal() {
        let store = Arc::new(MemoryStore::new());
        let dedup = Arc::new(MemoryDedupStore::new());
        store.insert_shipment(sample_shipment(TRACKING, ShipmentStatus::Created));
        store.fail_audits(true);

        let svc = processor(&store, &dedup);
        svc.process(event(ShipmentStatus::PickedUp, Utc::now()))
            .await
            .expect("audit failure must not fail the operation");

        let shipment = store.shipment(TRACKING).unwrap();
        assert_eq!(shipment.status, ShipmentStatus::PickedUp);
        assert!(store.audits().is_empty());
    }

    #[tokio::test]
    async fn test_process_update_failure_is_terminal() {
        let store = Arc::new(MemoryStore::new());
        let dedup = Arc::new(MemoryDedupStore::new());
        store.insert_shipment(sample_shipment(TRACKING, ShipmentStatus::Created));
        store.fail_updates(true);

        let svc = processor(&store, &dedup);
        let err = svc
            .process(event(ShipmentStatus::PickedUp, Utc::now()))
            .await
            .unwrap_err();

        assert!(matches!(err, ProcessError::UpdateFailed(_)));
        assert_eq!(err.reason(), "update_failed");
        assert!(store.audits().is_empty());
    }
}
