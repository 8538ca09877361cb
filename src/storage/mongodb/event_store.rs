//! MongoDB EventStore implementation: the atomic status+history mutation
//! and the audit trail.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::bson::{doc, Document};
use mongodb::{Collection, Database, IndexModel};

use super::{to_bson_dt, EVENTS_COLLECTION, SHIPMENTS_COLLECTION};
use crate::domain::{AuditRecord, Location, ShipmentStatus};
use crate::interfaces::{EventStore, Result, StorageError};

/// MongoDB implementation of EventStore.
pub struct MongoEventStore {
    shipments: Collection<Document>,
    events: Collection<Document>,
}

impl MongoEventStore {
    pub fn new(db: &Database) -> Self {
        Self {
            shipments: db.collection(SHIPMENTS_COLLECTION),
            events: db.collection(EVENTS_COLLECTION),
        }
    }

    /// Index the audit collection for per-shipment, newest-first reads.
    pub async fn ensure_indexes(&self) -> Result<()> {
        let index = IndexModel::builder()
            .keys(doc! { "tracking_number": 1, "processed_at": -1 })
            .build();
        self.events.create_index(index).await?;
        Ok(())
    }
}

#[async_trait]
impl EventStore for MongoEventStore {
    async fn update_status_and_append_history(
        &self,
        tracking_number: &str,
        status: ShipmentStatus,
        timestamp: DateTime<Utc>,
        source: &str,
        _location: Option<Location>,
    ) -> Result<()> {
        let history_entry = doc! {
            "status": status.as_str(),
            "timestamp": to_bson_dt(timestamp),
            "notes": source,
        };

        let filter = doc! { "tracking_number": tracking_number };
        let update = doc! {
            "$set": { "status": status.as_str() },
            "$push": { "status_history": history_entry },
        };

        // One update_one: MongoDB applies both mutations to the document
        // atomically, or neither.
        let result = self.shipments.update_one(filter, update).await?;
        if result.matched_count == 0 {
            return Err(StorageError::ShipmentNotFound(tracking_number.to_string()));
        }

        Ok(())
    }

    async fn insert_audit(&self, record: &AuditRecord) -> Result<()> {
        let mut document = doc! {
            "tracking_number": record.tracking_number.as_str(),
            "status": record.status.as_str(),
            "timestamp": to_bson_dt(record.timestamp),
            "source": record.source.as_str(),
            "processed_at": to_bson_dt(record.processed_at),
        };
        if let Some(location) = record.location {
            document.insert("location", doc! { "lat": location.lat, "lng": location.lng });
        }

        self.events.insert_one(document).await?;
        Ok(())
    }
}
