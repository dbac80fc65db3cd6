//! Audit sink implementation

use std::sync::{Arc, RwLock};

use super::models::AuditLogEntry;
use crate::permission::models::{Operation, PermissionCheckResult, TargetLocator};

/// Fire-and-forget sink for permission check outcomes
///
/// Enforcement-layer callers record here; the resolver itself never does.
#[derive(Clone)]
pub struct AuditLogger {
    entries: Arc<RwLock<Vec<AuditLogEntry>>>,
}

impl AuditLogger {
    /// Create a new audit logger
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Record a permission check verdict
    pub fn record_check(
        &self,
        subject_id: &str,
        connection_id: &str,
        operation: Operation,
        target: &TargetLocator,
        result: &PermissionCheckResult,
    ) -> Result<(), String> {
        let entry = AuditLogEntry::new(
            subject_id,
            connection_id,
            operation,
            target.clone(),
            result.granted,
            result.reason.clone(),
        );

        let mut entries = self
            .entries
            .write()
            .map_err(|e| format!("Failed to acquire write lock: {}", e))?;
        entries.push(entry);

        Ok(())
    }

    /// Get all entries
    pub fn entries(&self) -> Result<Vec<AuditLogEntry>, String> {
        let entries = self
            .entries
            .read()
            .map_err(|e| format!("Failed to acquire read lock: {}", e))?;
        Ok(entries.clone())
    }

    /// Get the number of entries
    pub fn len(&self) -> Result<usize, String> {
        let entries = self
            .entries
            .read()
            .map_err(|e| format!("Failed to acquire read lock: {}", e))?;
        Ok(entries.len())
    }

    /// Check if the logger is empty
    pub fn is_empty(&self) -> Result<bool, String> {
        let entries = self
            .entries
            .read()
            .map_err(|e| format!("Failed to acquire read lock: {}", e))?;
        Ok(entries.is_empty())
    }

    /// Clear all entries
    pub fn clear(&self) -> Result<(), String> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| format!("Failed to acquire write lock: {}", e))?;
        entries.clear();
        Ok(())
    }
}

impl Default for AuditLogger {
    fn default() -> Self {
        Self::new()
    }
}
