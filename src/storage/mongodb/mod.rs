//! MongoDB storage implementations.
//!
//! Two collections:
//! - `shipments` — one document per tracking number, history embedded
//! - `status_events` — append-only audit trail
//!
//! plus `auth_users` for accounts.

use chrono::{DateTime, Utc};
use mongodb::bson;
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::{Client, Database};
use tracing::debug;

use crate::interfaces::Result;

mod event_store;
mod shipment_store;
mod user_store;

pub use event_store::MongoEventStore;
pub use shipment_store::MongoShipmentStore;
pub use user_store::MongoUserStore;

pub(crate) const SHIPMENTS_COLLECTION: &str = "shipments";
pub(crate) const EVENTS_COLLECTION: &str = "status_events";
pub(crate) const USERS_COLLECTION: &str = "auth_users";

/// Establish a MongoDB client, verify connectivity with a ping, and return
/// the selected database.
pub async fn connect(uri: &str, database: &str) -> Result<Database> {
    let client = Client::with_uri_str(uri).await?;
    let db = client.database(database);
    db.run_command(bson::doc! { "ping": 1 }).await?;
    debug!(uri = %uri, database = %database, "MongoDB ping ok");
    Ok(db)
}

/// Convert a chrono timestamp into a BSON datetime (millisecond precision,
/// which is all BSON stores).
pub(crate) fn to_bson_dt(dt: DateTime<Utc>) -> bson::DateTime {
    bson::DateTime::from_millis(dt.timestamp_millis())
}

/// Convert a BSON datetime back into chrono.
pub(crate) fn from_bson_dt(dt: bson::DateTime) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(dt.timestamp_millis()).unwrap_or_default()
}

/// Reports whether an error is a unique-index violation (E11000).
pub(crate) fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        *err.kind,
        ErrorKind::Write(WriteFailure::WriteError(ref write_err)) if write_err.code == 11000
    )
}
