//! Redis storage implementations.
//!
//! The only Redis-backed concern is event deduplication: a flat keyspace
//! of `dedup:*` keys with a per-key TTL.

use redis::aio::ConnectionManager;
use redis::Client;
use tracing::debug;

use crate::interfaces::Result;

mod dedup_store;

pub use dedup_store::RedisDedupStore;

/// Initialise a Redis connection manager and validate connectivity with a
/// ping.
pub async fn connect(addr: &str, db: i64) -> Result<ConnectionManager> {
    let client = Client::open(format!("redis://{}/{}", addr, db))?;
    let mut conn = ConnectionManager::new(client).await?;

    let _: String = redis::cmd("PING").query_async(&mut conn).await?;
    debug!(addr = %addr, db = db, "Redis ping ok");

    Ok(conn)
}
