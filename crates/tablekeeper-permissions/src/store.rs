//! Permission record storage
//!
//! The store is the transactional boundary for grants, revokes and bulk
//! imports. `replace_all` swaps the whole record set under one write lock so
//! concurrent resolver reads observe either the fully-old or fully-new set,
//! never a partial import.

use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::{Arc, RwLock};

use crate::error::{Error, Result};
use crate::permission::models::{PermissionRecord, RecordKey};

/// Repository trait for permission records
pub trait PermissionStore: Send + Sync {
    /// Load all non-revoked records for a subject on one connection
    ///
    /// Expiry is evaluated by the resolver at check time, not here; an
    /// expired record is still returned and filtered by the caller.
    fn load_active_records(
        &self,
        subject_id: &str,
        connection_id: &str,
    ) -> Result<Vec<PermissionRecord>>;

    /// Load all non-revoked records for one connection, any subject
    fn load_connection_records(&self, connection_id: &str) -> Result<Vec<PermissionRecord>>;

    /// Insert a record, replacing any active record with the same key
    ///
    /// Enforces the one-active-record-per-key uniqueness rule.
    fn insert(&self, record: PermissionRecord) -> Result<()>;

    /// Soft-delete the record with the given key
    ///
    /// Returns `true` if a record was revoked. The resolver treats a revoked
    /// row and a deleted row identically, so revocation never hard-deletes.
    fn revoke(&self, key: &RecordKey) -> Result<bool>;

    /// Move the expiry of the record with the given key
    fn extend_expiry(&self, key: &RecordKey, expires_at: DateTime<Utc>) -> Result<bool>;

    /// Atomically replace the whole record set (bulk import, template apply)
    fn replace_all(&self, records: Vec<PermissionRecord>) -> Result<()>;

    /// Drop records that have aged past their expiry at `now`
    ///
    /// Housekeeping only; resolution filters expired records regardless.
    fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize>;
}

/// Enforce the one-active-record-per-key rule on an imported set
///
/// Later records win, matching `insert`'s replace semantics. Revoked records
/// pass through untouched; the rule binds active records only.
fn dedup_by_key(records: Vec<PermissionRecord>) -> Vec<PermissionRecord> {
    let mut result: Vec<PermissionRecord> = Vec::with_capacity(records.len());
    for record in records {
        if !record.revoked {
            let key = record.key();
            result.retain(|r| r.revoked || r.key() != key);
        }
        result.push(record);
    }
    result
}

/// In-memory permission store
#[derive(Clone)]
pub struct InMemoryPermissionStore {
    records: Arc<RwLock<Vec<PermissionRecord>>>,
}

impl InMemoryPermissionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Create a store seeded with validated records
    pub fn with_records(records: Vec<PermissionRecord>) -> Result<Self> {
        let store = Self::new();
        store.replace_all(records)?;
        Ok(store)
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Vec<PermissionRecord>>> {
        self.records
            .read()
            .map_err(|e| Error::Internal(format!("Failed to read records: {}", e)))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Vec<PermissionRecord>>> {
        self.records
            .write()
            .map_err(|e| Error::Internal(format!("Failed to write records: {}", e)))
    }
}

impl Default for InMemoryPermissionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PermissionStore for InMemoryPermissionStore {
    fn load_active_records(
        &self,
        subject_id: &str,
        connection_id: &str,
    ) -> Result<Vec<PermissionRecord>> {
        let records = self.read()?;
        Ok(records
            .iter()
            .filter(|r| {
                !r.revoked && r.subject_id == subject_id && r.connection_id == connection_id
            })
            .cloned()
            .collect())
    }

    fn load_connection_records(&self, connection_id: &str) -> Result<Vec<PermissionRecord>> {
        let records = self.read()?;
        Ok(records
            .iter()
            .filter(|r| !r.revoked && r.connection_id == connection_id)
            .cloned()
            .collect())
    }

    fn insert(&self, record: PermissionRecord) -> Result<()> {
        record.validate()?;
        let key = record.key();
        let mut records = self.write()?;
        records.retain(|r| r.revoked || r.key() != key);
        records.push(record);
        Ok(())
    }

    fn revoke(&self, key: &RecordKey) -> Result<bool> {
        let mut records = self.write()?;
        let mut revoked = false;
        for record in records.iter_mut() {
            if !record.revoked && record.key() == *key {
                record.revoked = true;
                revoked = true;
            }
        }
        Ok(revoked)
    }

    fn extend_expiry(&self, key: &RecordKey, expires_at: DateTime<Utc>) -> Result<bool> {
        let mut records = self.write()?;
        let mut updated = false;
        for record in records.iter_mut() {
            if !record.revoked && record.key() == *key {
                record.expires_at = Some(expires_at);
                updated = true;
            }
        }
        Ok(updated)
    }

    fn replace_all(&self, records: Vec<PermissionRecord>) -> Result<()> {
        for record in &records {
            record.validate()?;
        }
        let records = dedup_by_key(records);
        let mut stored = self.write()?;
        *stored = records;
        Ok(())
    }

    fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut records = self.write()?;
        let before = records.len();
        records.retain(|r| !r.is_expired(now));
        Ok(before - records.len())
    }
}

/// File-backed permission store
///
/// JSON persistence for the import/export collaborators. Every operation
/// loads, mutates and rewrites the file; a missing file reads as an empty
/// record set.
pub struct FilePermissionStore {
    path: std::path::PathBuf,
}

impl FilePermissionStore {
    /// Create a store backed by the given file
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn load(&self) -> Result<Vec<PermissionRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        let records = serde_json::from_str(&content)?;
        Ok(records)
    }

    fn save(&self, records: &[PermissionRecord]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(records)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

impl PermissionStore for FilePermissionStore {
    fn load_active_records(
        &self,
        subject_id: &str,
        connection_id: &str,
    ) -> Result<Vec<PermissionRecord>> {
        Ok(self
            .load()?
            .into_iter()
            .filter(|r| {
                !r.revoked && r.subject_id == subject_id && r.connection_id == connection_id
            })
            .collect())
    }

    fn load_connection_records(&self, connection_id: &str) -> Result<Vec<PermissionRecord>> {
        Ok(self
            .load()?
            .into_iter()
            .filter(|r| !r.revoked && r.connection_id == connection_id)
            .collect())
    }

    fn insert(&self, record: PermissionRecord) -> Result<()> {
        record.validate()?;
        let key = record.key();
        let mut records = self.load()?;
        records.retain(|r| r.revoked || r.key() != key);
        records.push(record);
        self.save(&records)
    }

    fn revoke(&self, key: &RecordKey) -> Result<bool> {
        let mut records = self.load()?;
        let mut revoked = false;
        for record in records.iter_mut() {
            if !record.revoked && record.key() == *key {
                record.revoked = true;
                revoked = true;
            }
        }
        if revoked {
            self.save(&records)?;
        }
        Ok(revoked)
    }

    fn extend_expiry(&self, key: &RecordKey, expires_at: DateTime<Utc>) -> Result<bool> {
        let mut records = self.load()?;
        let mut updated = false;
        for record in records.iter_mut() {
            if !record.revoked && record.key() == *key {
                record.expires_at = Some(expires_at);
                updated = true;
            }
        }
        if updated {
            self.save(&records)?;
        }
        Ok(updated)
    }

    fn replace_all(&self, records: Vec<PermissionRecord>) -> Result<()> {
        for record in &records {
            record.validate()?;
        }
        self.save(&dedup_by_key(records))
    }

    fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut records = self.load()?;
        let before = records.len();
        records.retain(|r| !r.is_expired(now));
        let purged = before - records.len();
        if purged > 0 {
            self.save(&records)?;
        }
        Ok(purged)
    }
}
