//! Domain types: the shipment aggregate, its status state machine, tracking
//! events, audit records, and users.
//!
//! Everything here is pure data plus pure rules. No I/O.

pub mod event;
pub mod shipment;
pub mod user;

pub use event::{AuditRecord, Location, TrackingEvent};
pub use shipment::{
    Address, Coordinates, Dimensions, Package, Person, ServiceType, Shipment, ShipmentStatus,
    StatusHistoryEntry,
};
pub use user::{Role, User};
