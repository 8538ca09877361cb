//! Shiptrace — event-driven shipment tracking.
//!
//! External sources submit status updates for individual shipments; the
//! service validates, deduplicates, serialises per shipment, and persists
//! those updates while preserving a complete audit trail. Read clients
//! query a shipment's current status and full history over HTTP.
//!
//! The write path: HTTP ingress → dispatcher (hash-route, bounded enqueue)
//! → worker (sequential dequeue) → event processor → idempotency cache +
//! document store.

pub mod config;
pub mod dispatch;
pub mod domain;
pub mod handlers;
pub mod interfaces;
pub mod services;
pub mod storage;
pub mod utils;

#[cfg(test)]
pub mod test_utils;

pub use config::Config;
pub use dispatch::Dispatcher;
pub use services::{AuthService, EventProcessor, EventService, ShipmentService};
