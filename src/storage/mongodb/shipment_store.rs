//! MongoDB ShipmentStore implementation.

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, Bson, Document};
use mongodb::options::{FindOptions, IndexOptions};
use mongodb::{Collection, Database, IndexModel};
use serde::{Deserialize, Serialize};

use super::{from_bson_dt, to_bson_dt, SHIPMENTS_COLLECTION};
use crate::domain::{
    Address, Package, Person, ServiceType, Shipment, ShipmentStatus, StatusHistoryEntry,
};
use crate::interfaces::{ListFilter, Result, ShipmentStore, StorageError};

/// Shipment document as persisted.
///
/// Separate from the domain type so that timestamps are stored as native
/// BSON datetimes while the JSON representation stays RFC3339.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ShipmentDoc {
    tracking_number: String,
    client_id: String,
    sender: Person,
    origin: Address,
    destination: Address,
    package: Package,
    service_type: ServiceType,
    status: ShipmentStatus,
    created_at: mongodb::bson::DateTime,
    estimated_delivery: mongodb::bson::DateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    idempotency_key: Option<String>,
    status_history: Vec<HistoryEntryDoc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct HistoryEntryDoc {
    status: ShipmentStatus,
    timestamp: mongodb::bson::DateTime,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    notes: String,
}

impl From<&Shipment> for ShipmentDoc {
    fn from(s: &Shipment) -> Self {
        Self {
            tracking_number: s.tracking_number.clone(),
            client_id: s.client_id.clone(),
            sender: s.sender.clone(),
            origin: s.origin.clone(),
            destination: s.destination.clone(),
            package: s.package.clone(),
            service_type: s.service_type,
            status: s.status,
            created_at: to_bson_dt(s.created_at),
            estimated_delivery: to_bson_dt(s.estimated_delivery),
            idempotency_key: s.idempotency_key.clone(),
            status_history: s
                .status_history
                .iter()
                .map(|e| HistoryEntryDoc {
                    status: e.status,
                    timestamp: to_bson_dt(e.timestamp),
                    notes: e.notes.clone(),
                })
                .collect(),
        }
    }
}

impl From<ShipmentDoc> for Shipment {
    fn from(d: ShipmentDoc) -> Self {
        Self {
            tracking_number: d.tracking_number,
            client_id: d.client_id,
            sender: d.sender,
            origin: d.origin,
            destination: d.destination,
            package: d.package,
            service_type: d.service_type,
            status: d.status,
            created_at: from_bson_dt(d.created_at),
            estimated_delivery: from_bson_dt(d.estimated_delivery),
            idempotency_key: d.idempotency_key,
            status_history: d
                .status_history
                .into_iter()
                .map(|e| StatusHistoryEntry {
                    status: e.status,
                    timestamp: from_bson_dt(e.timestamp),
                    notes: e.notes,
                })
                .collect(),
        }
    }
}

/// MongoDB implementation of ShipmentStore.
pub struct MongoShipmentStore {
    shipments: Collection<ShipmentDoc>,
}

impl MongoShipmentStore {
    pub fn new(db: &Database) -> Self {
        Self {
            shipments: db.collection(SHIPMENTS_COLLECTION),
        }
    }

    /// Create the indexes the read and write paths rely on.
    pub async fn ensure_indexes(&self) -> Result<()> {
        let unique_tracking = IndexModel::builder()
            .keys(doc! { "tracking_number": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.shipments.create_index(unique_tracking).await?;

        let idempotency = IndexModel::builder()
            .keys(doc! { "idempotency_key": 1 })
            .options(IndexOptions::builder().sparse(true).build())
            .build();
        self.shipments.create_index(idempotency).await?;

        // Compound indexes for list queries: newest-first per client, and
        // client+status filtering.
        let client_created = IndexModel::builder()
            .keys(doc! { "client_id": 1, "created_at": -1 })
            .build();
        self.shipments.create_index(client_created).await?;

        let client_status = IndexModel::builder()
            .keys(doc! { "client_id": 1, "status": 1 })
            .build();
        self.shipments.create_index(client_status).await?;

        Ok(())
    }
}

/// Build the dynamic list filter document.
fn build_list_filter(filter: &ListFilter) -> Document {
    let mut q = Document::new();

    if let Some(ref client_id) = filter.client_id {
        q.insert("client_id", client_id.as_str());
    }
    if let Some(status) = filter.status {
        q.insert("status", status.as_str());
    }
    if let Some(service_type) = filter.service_type {
        q.insert("service_type", service_type.as_str());
    }
    if filter.date_from.is_some() || filter.date_to.is_some() {
        let mut range = Document::new();
        if let Some(from) = filter.date_from {
            range.insert("$gte", to_bson_dt(from));
        }
        if let Some(to) = filter.date_to {
            range.insert("$lte", to_bson_dt(to));
        }
        q.insert("created_at", range);
    }
    if let Some(ref search) = filter.search {
        let search = search.as_str();
        q.insert(
            "$or",
            vec![
                Bson::Document(doc! { "tracking_number": { "$regex": search, "$options": "i" } }),
                Bson::Document(doc! { "sender.name": { "$regex": search, "$options": "i" } }),
            ],
        );
    }

    q
}

#[async_trait]
impl ShipmentStore for MongoShipmentStore {
    async fn create(&self, shipment: &Shipment) -> Result<()> {
        self.shipments.insert_one(ShipmentDoc::from(shipment)).await?;
        Ok(())
    }

    async fn find_by_tracking(
        &self,
        tracking_number: &str,
        client_filter: Option<&str>,
    ) -> Result<Shipment> {
        let mut filter = doc! { "tracking_number": tracking_number };
        if let Some(client_id) = client_filter {
            filter.insert("client_id", client_id);
        }

        let found = self.shipments.find_one(filter).await?;
        found
            .map(Shipment::from)
            .ok_or_else(|| StorageError::ShipmentNotFound(tracking_number.to_string()))
    }

    async fn find_by_idempotency_key(&self, key: &str) -> Result<Option<Shipment>> {
        let found = self
            .shipments
            .find_one(doc! { "idempotency_key": key })
            .await?;
        Ok(found.map(Shipment::from))
    }

    async fn list(&self, filter: &ListFilter) -> Result<(Vec<Shipment>, u64)> {
        let q = build_list_filter(filter);

        let total = self.shipments.count_documents(q.clone()).await?;

        let skip = filter.page.saturating_sub(1) * filter.limit;
        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .skip(skip)
            .limit(filter.limit as i64)
            .build();

        let mut cursor = self.shipments.find(q).with_options(options).await?;

        let mut shipments = Vec::new();
        while let Some(document) = cursor.try_next().await? {
            shipments.push(Shipment::from(document));
        }

        Ok((shipments, total))
    }
}
