//! Tracking events and audit records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ShipmentStatus;

/// Geographic point attached to a tracking event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
}

/// A status update received from an external source (driver application,
/// warehouse scanner, API caller). Input value only; never persisted in
/// this form.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingEvent {
    pub tracking_number: String,
    /// Target status. `Created` is never valid here; the created entry is
    /// written by shipment creation, not by the event pipeline.
    pub status: ShipmentStatus,
    /// Sender-assigned event time.
    pub timestamp: DateTime<Utc>,
    pub source: String,
    pub location: Option<Location>,
}

/// Append-only secondary record of a successfully applied event.
///
/// The shipment's embedded history is authoritative; this collection serves
/// analytics and cross-shipment queries, and its write failures are
/// non-fatal.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditRecord {
    pub tracking_number: String,
    pub status: ShipmentStatus,
    pub timestamp: DateTime<Utc>,
    pub source: String,
    pub location: Option<Location>,
    /// Assigned by the event service when the event is applied.
    pub processed_at: DateTime<Utc>,
}
