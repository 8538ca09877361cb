//! Shared fixtures for unit tests.

use chrono::Utc;

use crate::domain::{
    Address, Coordinates, Dimensions, Package, Person, ServiceType, Shipment, ShipmentStatus,
    StatusHistoryEntry,
};

/// A fully populated shipment in the given status, with a single seeded
/// history entry.
pub fn sample_shipment(tracking_number: &str, status: ShipmentStatus) -> Shipment {
    let now = Utc::now();
    Shipment {
        tracking_number: tracking_number.to_string(),
        client_id: "client_1".to_string(),
        sender: Person {
            name: "Ana Torres".to_string(),
            email: "ana@example.com".to_string(),
            phone: "+52 55 1111 2222".to_string(),
        },
        origin: Address {
            address: "Av. Reforma 100".to_string(),
            city: "CDMX".to_string(),
            zip_code: "06600".to_string(),
            coordinates: Coordinates {
                lat: 19.4326,
                lng: -99.1332,
            },
        },
        destination: Address {
            address: "Calle 5 de Mayo 22".to_string(),
            city: "Puebla".to_string(),
            zip_code: "72000".to_string(),
            coordinates: Coordinates {
                lat: 19.0414,
                lng: -98.2063,
            },
        },
        package: Package {
            weight_kg: 1.5,
            dimensions: Dimensions {
                length_cm: 30.0,
                width_cm: 20.0,
                height_cm: 10.0,
            },
            description: "Books".to_string(),
            declared_value: 450.0,
            currency: "MXN".to_string(),
        },
        service_type: ServiceType::Standard,
        status,
        created_at: now,
        estimated_delivery: now,
        idempotency_key: None,
        status_history: vec![StatusHistoryEntry {
            status,
            timestamp: now,
            notes: String::new(),
        }],
    }
}
