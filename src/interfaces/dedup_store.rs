//! Idempotency store interface.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::Result;
use crate::domain::ShipmentStatus;

/// Two-stage idempotency check backed by an external cache.
///
/// Keys are derived from `(tracking_number, status, second-precision
/// timestamp)` so every producer and the cache agree on what "the same
/// event" means. Entries expire after one hour.
///
/// Both operations degrade gracefully: a failing `seen` must not block
/// processing (the caller falls back to best-effort dedup) and a failing
/// `mark` must not fail the overall operation.
#[async_trait]
pub trait DedupStore: Send + Sync {
    /// Reports whether this exact event has already been processed.
    async fn seen(
        &self,
        tracking_number: &str,
        status: ShipmentStatus,
        timestamp: DateTime<Utc>,
    ) -> Result<bool>;

    /// Records that this event has been processed. Expires after the
    /// dedup TTL.
    async fn mark(
        &self,
        tracking_number: &str,
        status: ShipmentStatus,
        timestamp: DateTime<Utc>,
    ) -> Result<()>;
}
