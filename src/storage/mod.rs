//! Storage implementations and connection factories.

use std::sync::Arc;

use backon::Retryable;
use tracing::{info, warn};

use crate::config::Config;
use crate::interfaces::{DedupStore, EventStore, ShipmentStore, UserStore};
use crate::utils::retry::connection_backoff;

pub mod memory;
pub mod mongodb;
pub mod redis;

pub use mongodb::{MongoEventStore, MongoShipmentStore, MongoUserStore};
pub use redis::RedisDedupStore;

/// All store handles the server needs, plus the raw clients used by the
/// readiness probe.
pub struct Stores {
    pub shipments: Arc<dyn ShipmentStore>,
    pub events: Arc<dyn EventStore>,
    pub dedup: Arc<dyn DedupStore>,
    pub users: Arc<dyn UserStore>,
    pub mongo: ::mongodb::Database,
    pub redis: ::redis::aio::ConnectionManager,
}

/// Connect to MongoDB and Redis and build all store adapters.
///
/// Connections are retried with exponential backoff; if a backend is still
/// unreachable after the retries are exhausted the error propagates and
/// startup is fatal. Indexes are created on the way up.
pub async fn init_storage(
    config: &Config,
) -> Result<Stores, Box<dyn std::error::Error + Send + Sync>> {
    let mongo_uri = config.mongo_uri.clone();
    let mongo_db = config.mongo_db.clone();
    let db = (|| {
        let uri = mongo_uri.clone();
        let name = mongo_db.clone();
        async move { mongodb::connect(&uri, &name).await }
    })
    .retry(connection_backoff())
    .notify(|err, dur| {
        warn!(error = %err, delay = ?dur, "MongoDB connection failed, retrying");
    })
    .await?;

    info!(db = %config.mongo_db, "connected to MongoDB");

    let shipments = MongoShipmentStore::new(&db);
    shipments.ensure_indexes().await?;
    let events = MongoEventStore::new(&db);
    events.ensure_indexes().await?;
    let users = MongoUserStore::new(&db);
    users.ensure_indexes().await?;

    let redis_addr = config.redis_addr.clone();
    let redis_db = config.redis_db;
    let conn = (|| {
        let addr = redis_addr.clone();
        async move { redis::connect(&addr, redis_db).await }
    })
    .retry(connection_backoff())
    .notify(|err, dur| {
        warn!(error = %err, delay = ?dur, "Redis connection failed, retrying");
    })
    .await?;

    info!(addr = %config.redis_addr, "connected to Redis");

    let dedup = RedisDedupStore::new(conn.clone());

    Ok(Stores {
        shipments: Arc::new(shipments),
        events: Arc::new(events),
        dedup: Arc::new(dedup),
        users: Arc::new(users),
        mongo: db,
        redis: conn,
    })
}
