//! Audit log data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::permission::models::{Operation, TargetLocator};

/// Entry recorded for one permission check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    /// Unique identifier for this log entry
    pub id: String,
    /// Timestamp of the check
    pub timestamp: DateTime<Utc>,
    /// Subject that was checked
    pub subject_id: String,
    /// Connection the check was made against
    pub connection_id: String,
    /// Operation that was requested
    pub operation: Operation,
    /// Target the check was made for
    pub target: TargetLocator,
    /// Verdict of the check
    pub granted: bool,
    /// Resolver reason string
    pub reason: String,
}

impl AuditLogEntry {
    /// Create a new audit log entry
    pub fn new(
        subject_id: impl Into<String>,
        connection_id: impl Into<String>,
        operation: Operation,
        target: TargetLocator,
        granted: bool,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            subject_id: subject_id.into(),
            connection_id: connection_id.into(),
            operation,
            target,
            granted,
            reason: reason.into(),
        }
    }
}
