//! Audit log querying and filtering

use chrono::{DateTime, Utc};

use super::models::AuditLogEntry;
use crate::permission::models::Operation;

/// Filter criteria for audit log queries
#[derive(Debug, Clone, Default)]
pub struct QueryFilter {
    /// Filter by subject (optional)
    pub subject_id: Option<String>,
    /// Filter by connection (optional)
    pub connection_id: Option<String>,
    /// Filter by operation (optional)
    pub operation: Option<Operation>,
    /// Filter by verdict (optional)
    pub granted: Option<bool>,
    /// Filter by start date (optional)
    pub start_date: Option<DateTime<Utc>>,
    /// Filter by end date (optional)
    pub end_date: Option<DateTime<Utc>>,
}

impl QueryFilter {
    /// Create a new empty filter
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter by subject
    pub fn with_subject(mut self, subject_id: String) -> Self {
        self.subject_id = Some(subject_id);
        self
    }

    /// Filter by connection
    pub fn with_connection(mut self, connection_id: String) -> Self {
        self.connection_id = Some(connection_id);
        self
    }

    /// Filter by operation
    pub fn with_operation(mut self, operation: Operation) -> Self {
        self.operation = Some(operation);
        self
    }

    /// Filter by verdict
    pub fn with_granted(mut self, granted: bool) -> Self {
        self.granted = Some(granted);
        self
    }

    /// Filter by start date
    pub fn with_start_date(mut self, date: DateTime<Utc>) -> Self {
        self.start_date = Some(date);
        self
    }

    /// Filter by end date
    pub fn with_end_date(mut self, date: DateTime<Utc>) -> Self {
        self.end_date = Some(date);
        self
    }

    fn matches(&self, entry: &AuditLogEntry) -> bool {
        if let Some(ref subject_id) = self.subject_id {
            if entry.subject_id != *subject_id {
                return false;
            }
        }

        if let Some(ref connection_id) = self.connection_id {
            if entry.connection_id != *connection_id {
                return false;
            }
        }

        if let Some(operation) = self.operation {
            if entry.operation != operation {
                return false;
            }
        }

        if let Some(granted) = self.granted {
            if entry.granted != granted {
                return false;
            }
        }

        if let Some(start_date) = self.start_date {
            if entry.timestamp < start_date {
                return false;
            }
        }

        if let Some(end_date) = self.end_date {
            if entry.timestamp > end_date {
                return false;
            }
        }

        true
    }

    /// Apply this filter to a slice of entries
    pub fn apply(&self, entries: &[AuditLogEntry]) -> Vec<AuditLogEntry> {
        entries
            .iter()
            .filter(|e| self.matches(e))
            .cloned()
            .collect()
    }

    /// Apply this filter with pagination
    pub fn apply_paginated(
        &self,
        entries: &[AuditLogEntry],
        pagination: &Pagination,
    ) -> Vec<AuditLogEntry> {
        entries
            .iter()
            .filter(|e| self.matches(e))
            .skip(pagination.offset)
            .take(pagination.limit)
            .cloned()
            .collect()
    }
}

/// Pagination parameters
#[derive(Debug, Clone)]
pub struct Pagination {
    /// Number of results per page
    pub limit: usize,
    /// Number of results to skip
    pub offset: usize,
}

impl Pagination {
    /// Create a new pagination with limit and offset
    pub fn new(limit: usize, offset: usize) -> Self {
        Self { limit, offset }
    }

    /// Create pagination for the first page
    pub fn first_page(limit: usize) -> Self {
        Self { limit, offset: 0 }
    }

    /// Get the next page pagination
    pub fn next_page(&self) -> Self {
        Self {
            limit: self.limit,
            offset: self.offset + self.limit,
        }
    }
}
