//! Event persistence interface: atomic status mutation plus the audit trail.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::Result;
use crate::domain::{AuditRecord, Location, ShipmentStatus};

/// Persistence operations performed when a tracking event is applied.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Atomically set the shipment's status and append a history entry
    /// `{status, timestamp, notes: source}` in a single server-side
    /// operation. Either both mutations commit or neither.
    ///
    /// Returns `StorageError::ShipmentNotFound` when no document matches
    /// the tracking number.
    async fn update_status_and_append_history(
        &self,
        tracking_number: &str,
        status: ShipmentStatus,
        timestamp: DateTime<Utc>,
        source: &str,
        location: Option<Location>,
    ) -> Result<()>;

    /// Persist an audit record to the append-only audit collection.
    async fn insert_audit(&self, record: &AuditRecord) -> Result<()>;
}
