//! Core services: event processing, shipment use-cases, authentication.

pub mod auth_service;
pub mod event_processor;
pub mod shipment_service;

pub use auth_service::{AuthError, AuthService, Claims};
pub use event_processor::{EventProcessor, EventService, ProcessError};
pub use shipment_service::{
    CreateShipmentInput, ListQuery, ShipmentCreated, ShipmentPage, ShipmentService,
};
