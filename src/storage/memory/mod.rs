//! In-memory store implementations.
//!
//! Used by unit tests throughout the crate. Failure injection flags let
//! tests exercise the degraded paths (dedup outage, audit write failure,
//! status update failure) without a real backend.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{AuditRecord, Location, Shipment, ShipmentStatus, StatusHistoryEntry, User};
use crate::interfaces::{
    DedupStore, EventStore, ListFilter, Result, ShipmentStore, StorageError, UserStore,
};

/// In-memory shipment + audit store.
#[derive(Default)]
pub struct MemoryStore {
    shipments: RwLock<HashMap<String, Shipment>>,
    audits: RwLock<Vec<AuditRecord>>,
    fail_updates: AtomicBool,
    fail_audits: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a shipment directly, bypassing the create path.
    pub fn insert_shipment(&self, shipment: Shipment) {
        self.shipments
            .write()
            .expect("lock poisoned")
            .insert(shipment.tracking_number.clone(), shipment);
    }

    /// Snapshot of a shipment by tracking number.
    pub fn shipment(&self, tracking_number: &str) -> Option<Shipment> {
        self.shipments
            .read()
            .expect("lock poisoned")
            .get(tracking_number)
            .cloned()
    }

    /// All audit records inserted so far.
    pub fn audits(&self) -> Vec<AuditRecord> {
        self.audits.read().expect("lock poisoned").clone()
    }

    /// Make `update_status_and_append_history` fail with a transient error.
    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    /// Make `insert_audit` fail with a transient error.
    pub fn fail_audits(&self, fail: bool) {
        self.fail_audits.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ShipmentStore for MemoryStore {
    async fn create(&self, shipment: &Shipment) -> Result<()> {
        self.shipments
            .write()
            .expect("lock poisoned")
            .insert(shipment.tracking_number.clone(), shipment.clone());
        Ok(())
    }

    async fn find_by_tracking(
        &self,
        tracking_number: &str,
        client_filter: Option<&str>,
    ) -> Result<Shipment> {
        let shipments = self.shipments.read().expect("lock poisoned");
        shipments
            .get(tracking_number)
            .filter(|s| client_filter.is_none_or(|c| s.client_id == c))
            .cloned()
            .ok_or_else(|| StorageError::ShipmentNotFound(tracking_number.to_string()))
    }

    async fn find_by_idempotency_key(&self, key: &str) -> Result<Option<Shipment>> {
        let shipments = self.shipments.read().expect("lock poisoned");
        Ok(shipments
            .values()
            .find(|s| s.idempotency_key.as_deref() == Some(key))
            .cloned())
    }

    async fn list(&self, filter: &ListFilter) -> Result<(Vec<Shipment>, u64)> {
        let shipments = self.shipments.read().expect("lock poisoned");

        let mut matches: Vec<Shipment> = shipments
            .values()
            .filter(|s| {
                filter
                    .client_id
                    .as_deref()
                    .is_none_or(|c| s.client_id == c)
            })
            .filter(|s| filter.status.is_none_or(|st| s.status == st))
            .filter(|s| filter.service_type.is_none_or(|t| s.service_type == t))
            .filter(|s| {
                filter.search.as_deref().is_none_or(|needle| {
                    let needle = needle.to_lowercase();
                    s.tracking_number.to_lowercase().contains(&needle)
                        || s.sender.name.to_lowercase().contains(&needle)
                })
            })
            .filter(|s| filter.date_from.is_none_or(|from| s.created_at >= from))
            .filter(|s| filter.date_to.is_none_or(|to| s.created_at <= to))
            .cloned()
            .collect();

        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = matches.len() as u64;
        let skip = filter.page.saturating_sub(1) * filter.limit;
        let page: Vec<Shipment> = matches
            .into_iter()
            .skip(skip as usize)
            .take(filter.limit as usize)
            .collect();

        Ok((page, total))
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn update_status_and_append_history(
        &self,
        tracking_number: &str,
        status: ShipmentStatus,
        timestamp: DateTime<Utc>,
        source: &str,
        _location: Option<Location>,
    ) -> Result<()> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("update failed".to_string()));
        }

        let mut shipments = self.shipments.write().expect("lock poisoned");
        let shipment = shipments
            .get_mut(tracking_number)
            .ok_or_else(|| StorageError::ShipmentNotFound(tracking_number.to_string()))?;

        shipment.status = status;
        shipment.status_history.push(StatusHistoryEntry {
            status,
            timestamp,
            notes: source.to_string(),
        });

        Ok(())
    }

    async fn insert_audit(&self, record: &AuditRecord) -> Result<()> {
        if self.fail_audits.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("audit insert failed".to_string()));
        }

        self.audits
            .write()
            .expect("lock poisoned")
            .push(record.clone());
        Ok(())
    }
}

/// In-memory dedup store.
#[derive(Default)]
pub struct MemoryDedupStore {
    keys: RwLock<HashSet<String>>,
    fail: AtomicBool,
}

impl MemoryDedupStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make both `seen` and `mark` fail with a transient error.
    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn marked_count(&self) -> usize {
        self.keys.read().expect("lock poisoned").len()
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
impl DedupStore for MemoryDedupStore {
    async fn seen(
        &self,
        tracking_number: &str,
        status: ShipmentStatus,
        timestamp: DateTime<Utc>,
    ) -> Result<bool> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("dedup store down".to_string()));
        }
        let keys = self.keys.read().expect("lock poisoned");
        Ok(keys.contains(&Self::key(tracking_number, status, timestamp)))
    }

    async fn mark(
        &self,
        tracking_number: &str,
        status: ShipmentStatus,
        timestamp: DateTime<Utc>,
    ) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("dedup store down".to_string()));
        }
        self.keys
            .write()
            .expect("lock poisoned")
            .insert(Self::key(tracking_number, status, timestamp));
        Ok(())
    }
}

/// In-memory user store.
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<Vec<User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, user: &User) -> Result<()> {
        let mut users = self.users.write().expect("lock poisoned");
        if users
            .iter()
            .any(|u| u.username == user.username || u.email == user.email)
        {
            return Err(StorageError::UserExists);
        }
        users.push(user.clone());
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> Result<User> {
        let users = self.users.read().expect("lock poisoned");
        users
            .iter()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(StorageError::UserNotFound)
    }
}
