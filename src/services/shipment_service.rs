//! Shipment use-cases: creation (with idempotent replay), single reads,
//! and paginated listing.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use opentelemetry::KeyValue;
use tracing::info;

use crate::domain::{
    Address, Package, Person, Role, ServiceType, Shipment, ShipmentStatus, StatusHistoryEntry,
};
use crate::interfaces::{ListFilter, Result, ShipmentStore};
use crate::utils::metrics;

/// Page size bounds for list queries.
const DEFAULT_LIMIT: u64 = 20;
const MAX_LIMIT: u64 = 100;

/// Everything needed to create a new shipment.
#[derive(Debug, Clone)]
pub struct CreateShipmentInput {
    pub sender: Person,
    pub origin: Address,
    pub destination: Address,
    pub package: Package,
    pub service_type: ServiceType,
    pub client_id: String,
    pub idempotency_key: Option<String>,
}

/// Result of a create call.
#[derive(Debug, Clone)]
pub struct ShipmentCreated {
    pub tracking_number: String,
    pub status: ShipmentStatus,
    pub created_at: DateTime<Utc>,
    pub estimated_delivery: DateTime<Utc>,
    /// True when the idempotency key matched an existing shipment and no
    /// new document was written.
    pub already_existed: bool,
}

/// Caller-facing list parameters, before clamping.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub status: Option<ShipmentStatus>,
    pub service_type: Option<ServiceType>,
    pub search: Option<String>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

/// One page of shipments plus pagination metadata.
#[derive(Debug, Clone)]
pub struct ShipmentPage {
    pub items: Vec<Shipment>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

/// Shipment use-case service. RBAC scoping happens here: `client`-role
/// callers only ever see their own shipments.
pub struct ShipmentService {
    shipments: Arc<dyn ShipmentStore>,
}

impl ShipmentService {
    pub fn new(shipments: Arc<dyn ShipmentStore>) -> Self {
        Self { shipments }
    }

    /// Create a new shipment in state `created`.
    ///
    /// When an idempotency key is provided and already seen, the previously
    /// created shipment is returned without side effects.
    pub async fn create(&self, input: CreateShipmentInput) -> Result<ShipmentCreated> {
        if let Some(ref key) = input.idempotency_key {
            if let Some(existing) = self.shipments.find_by_idempotency_key(key).await? {
                info!(
                    idempotency_key = %key,
                    tracking = %existing.tracking_number,
                    "idempotent replay"
                );
                return Ok(ShipmentCreated {
                    tracking_number: existing.tracking_number,
                    status: existing.status,
                    created_at: existing.created_at,
                    estimated_delivery: existing.estimated_delivery,
                    already_existed: true,
                });
            }
        }

        let now = Utc::now();
        let shipment = Shipment {
            tracking_number: generate_tracking_number(),
            client_id: input.client_id,
            sender: input.sender,
            origin: input.origin,
            destination: input.destination,
            package: input.package,
            service_type: input.service_type,
            status: ShipmentStatus::Created,
            created_at: now,
            estimated_delivery: estimated_delivery(input.service_type, now),
            idempotency_key: input.idempotency_key,
            status_history: vec![StatusHistoryEntry {
                status: ShipmentStatus::Created,
                timestamp: now,
                notes: String::new(),
            }],
        };

        self.shipments.create(&shipment).await?;

        info!(
            tracking = %shipment.tracking_number,
            client_id = %shipment.client_id,
            "shipment created"
        );
        metrics::SHIPMENTS_CREATED.add(
            1,
            &[KeyValue::new("service_type", shipment.service_type.as_str())],
        );

        Ok(ShipmentCreated {
            tracking_number: shipment.tracking_number,
            status: shipment.status,
            created_at: shipment.created_at,
            estimated_delivery: shipment.estimated_delivery,
            already_existed: false,
        })
    }

    /// Retrieve one shipment, scoped to the caller's role.
    ///
    /// A `client`-role caller asking for another client's shipment gets
    /// `ShipmentNotFound` — existence is never leaked.
    pub async fn get(
        &self,
        tracking_number: &str,
        role: Role,
        client_id: Option<&str>,
    ) -> Result<Shipment> {
        let filter = match role {
            Role::Client => client_id,
            Role::Admin => None,
        };
        self.shipments.find_by_tracking(tracking_number, filter).await
    }

    /// List shipments, newest first, with pagination clamped to sane
    /// bounds.
    pub async fn list(
        &self,
        query: ListQuery,
        role: Role,
        client_id: Option<&str>,
    ) -> Result<ShipmentPage> {
        let page = query.page.unwrap_or(1).max(1);
        let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

        let scope = match role {
            Role::Client => client_id.map(str::to_string),
            Role::Admin => None,
        };

        let filter = ListFilter {
            client_id: scope,
            status: query.status,
            service_type: query.service_type,
            search: query.search,
            date_from: query.date_from,
            date_to: query.date_to,
            page,
            limit,
        };

        let (items, total) = self.shipments.list(&filter).await?;
        let total_pages = total.div_ceil(limit);

        Ok(ShipmentPage {
            items,
            total,
            page,
            limit,
            total_pages,
        })
    }
}

/// Generate a tracking number in the format `99M-` + 8 uppercase hex
/// digits.
fn generate_tracking_number() -> String {
    format!("99M-{:08X}", rand::random::<u32>())
}

/// Estimated delivery: 18:00 UTC on the dispatch day for same-day service,
/// +1 day for next-day, +3 days otherwise.
fn estimated_delivery(service_type: ServiceType, from: DateTime<Utc>) -> DateTime<Utc> {
    let base = Utc
        .with_ymd_and_hms(from.year(), from.month(), from.day(), 18, 0, 0)
        .single()
        .unwrap_or(from);

    match service_type {
        ServiceType::SameDay => base,
        ServiceType::NextDay => base + Duration::days(1),
        ServiceType::Standard => base + Duration::days(3),
    }
}
