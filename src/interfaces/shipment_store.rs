//! Shipment persistence interface.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::Result;
use crate::domain::{ServiceType, Shipment, ShipmentStatus};

/// Query parameters for listing shipments.
///
/// `client_id` is the ownership scope: `None` means no filter (admin);
/// `Some` restricts results to that client.
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub client_id: Option<String>,
    pub status: Option<ShipmentStatus>,
    pub service_type: Option<ServiceType>,
    /// Partial, case-insensitive match on tracking_number or sender name.
    pub search: Option<String>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    /// 1-based page number.
    pub page: u64,
    /// Page size; the service layer clamps this to 1..=100.
    pub limit: u64,
}

/// Persistence operations for shipment documents.
#[async_trait]
pub trait ShipmentStore: Send + Sync {
    /// Insert a new shipment document.
    async fn create(&self, shipment: &Shipment) -> Result<()>;

    /// Retrieve a shipment by tracking number.
    ///
    /// When `client_filter` is `Some`, a shipment owned by a different
    /// client is reported as `ShipmentNotFound` — ownership mismatches
    /// never leak existence.
    async fn find_by_tracking(
        &self,
        tracking_number: &str,
        client_filter: Option<&str>,
    ) -> Result<Shipment>;

    /// Retrieve the shipment previously created with this idempotency key,
    /// if any.
    async fn find_by_idempotency_key(&self, key: &str) -> Result<Option<Shipment>>;

    /// Return one page of shipments matching the filter, newest first,
    /// along with the total match count.
    async fn list(&self, filter: &ListFilter) -> Result<(Vec<Shipment>, u64)>;
}
