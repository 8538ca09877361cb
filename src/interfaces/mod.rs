//! Store interfaces.
//!
//! The services in this crate talk to persistence exclusively through these
//! traits. Implementations live under `crate::storage`:
//! - `storage::mongodb`: document store for shipments, audit records, users
//! - `storage::redis`: idempotency (dedup) cache
//! - `storage::memory`: in-memory implementations for tests

pub mod dedup_store;
pub mod event_store;
pub mod shipment_store;
pub mod user_store;

pub use dedup_store::DedupStore;
pub use event_store::EventStore;
pub use shipment_store::{ListFilter, ShipmentStore};
pub use user_store::UserStore;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("shipment not found: {0}")]
    ShipmentNotFound(String),

    #[error("user not found")]
    UserNotFound,

    #[error("user already exists")]
    UserExists,

    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}
