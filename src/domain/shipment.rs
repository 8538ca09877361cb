//! Shipment aggregate and the status state machine.
//!
//! The state machine is the precondition to every write the event pipeline
//! performs: a tracking event is only applied when `can_transition` allows
//! the move from the shipment's current status to the event's target status.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a shipment.
///
/// `Delivered` and `Cancelled` are terminal: no outgoing transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShipmentStatus {
    Created,
    PickedUp,
    InWarehouse,
    InTransit,
    Delivered,
    Cancelled,
}

impl ShipmentStatus {
    /// Reports whether a transition from `self` to `next` is legal.
    ///
    /// Total over the whole status set; self-loops and anything not listed
    /// in the transition table are simply not transitionable.
    pub fn can_transition(self, next: ShipmentStatus) -> bool {
        use ShipmentStatus::*;
        matches!(
            (self, next),
            (Created, PickedUp)
                | (Created, Cancelled)
                | (PickedUp, InWarehouse)
                | (PickedUp, Cancelled)
                | (InWarehouse, InTransit)
                | (InWarehouse, Cancelled)
                | (InTransit, Delivered)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ShipmentStatus::Created => "created",
            ShipmentStatus::PickedUp => "picked_up",
            ShipmentStatus::InWarehouse => "in_warehouse",
            ShipmentStatus::InTransit => "in_transit",
            ShipmentStatus::Delivered => "delivered",
            ShipmentStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<ShipmentStatus> {
        match s {
            "created" => Some(ShipmentStatus::Created),
            "picked_up" => Some(ShipmentStatus::PickedUp),
            "in_warehouse" => Some(ShipmentStatus::InWarehouse),
            "in_transit" => Some(ShipmentStatus::InTransit),
            "delivered" => Some(ShipmentStatus::Delivered),
            "cancelled" => Some(ShipmentStatus::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delivery service tier, which drives the estimated delivery date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    SameDay,
    NextDay,
    Standard,
}

impl ServiceType {
    pub fn as_str(self) -> &'static str {
        match self {
            ServiceType::SameDay => "same_day",
            ServiceType::NextDay => "next_day",
            ServiceType::Standard => "standard",
        }
    }

    pub fn parse(s: &str) -> Option<ServiceType> {
        match s {
            "same_day" => Some(ServiceType::SameDay),
            "next_day" => Some(ServiceType::NextDay),
            "standard" => Some(ServiceType::Standard),
            _ => None,
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Geographic point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// Physical location with coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub address: String,
    pub city: String,
    pub zip_code: String,
    pub coordinates: Coordinates,
}

/// Sender contact details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub name: String,
    pub email: String,
    pub phone: String,
}

/// Physical size of a package.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub length_cm: f64,
    pub width_cm: f64,
    pub height_cm: f64,
}

/// What is being shipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Package {
    pub weight_kg: f64,
    pub dimensions: Dimensions,
    pub description: String,
    pub declared_value: f64,
    pub currency: String,
}

/// One applied status transition, embedded in the shipment document.
///
/// `timestamp` is the sender-assigned event time. Entries appear in
/// processing order, which under clock skew may differ from chronological
/// order; consumers that need wall-clock order must sort on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusHistoryEntry {
    pub status: ShipmentStatus,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,
}

/// The aggregate root. One document per tracking number.
///
/// `status` always equals the status of the last history entry; the first
/// entry is always `{created, created_at}`, seeded at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shipment {
    pub tracking_number: String,
    pub client_id: String,
    pub sender: Person,
    pub origin: Address,
    pub destination: Address,
    pub package: Package,
    pub service_type: ServiceType,
    pub status: ShipmentStatus,
    pub created_at: DateTime<Utc>,
    pub estimated_delivery: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
    pub status_history: Vec<StatusHistoryEntry>,
}
