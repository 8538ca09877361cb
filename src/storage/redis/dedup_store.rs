//! Redis-backed idempotency store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::domain::ShipmentStatus;
use crate::interfaces::{DedupStore, Result};

/// Dedup keys expire after one hour.
const DEDUP_TTL_SECS: u64 = 3600;

/// Redis implementation of DedupStore.
///
/// Key format: `dedup:<tracking_number>:<status>:<epoch_seconds>`. The
/// second-precision timestamp means two distinct events with the same
/// tracking number and status that round to the same second are treated
/// as one — a deliberate clamp against repeated sensor fires.
pub struct RedisDedupStore {
    conn: ConnectionManager,
}

impl RedisDedupStore {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    fn key(tracking_number: &str, status: ShipmentStatus, timestamp: DateTime<Utc>) -> String {
        format!(
            "dedup:{}:{}:{}",
            tracking_number,
            status,
            timestamp.timestamp()
        )
    }
}

#[async_trait]
impl DedupStore for RedisDedupStore {
    async fn seen(
        &self,
        tracking_number: &str,
        status: ShipmentStatus,
        timestamp: DateTime<Utc>,
    ) -> Result<bool> {
        let mut conn = self.conn.clone();
        let exists: bool = conn
            .exists(Self::key(tracking_number, status, timestamp))
            .await?;
        Ok(exists)
    }

    async fn mark(
        &self,
        tracking_number: &str,
        status: ShipmentStatus,
        timestamp: DateTime<Utc>,
    ) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .set_ex(
                Self::key(tracking_number, status, timestamp),
                "1",
                DEDUP_TTL_SECS,
            )
            .await?;
        Ok(())
    }
}
