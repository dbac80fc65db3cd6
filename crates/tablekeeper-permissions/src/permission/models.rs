//! Permission data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Hierarchy level a permission record applies to, broadest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Every schema, table and column behind one connection
    Connection,
    /// One schema and everything in it
    Schema,
    /// One table and all its columns
    Table,
    /// A single column
    Column,
}

impl Scope {
    /// Numeric specificity, `Connection` being 0 and `Column` being 3
    pub fn specificity(&self) -> u8 {
        match self {
            Scope::Connection => 0,
            Scope::Schema => 1,
            Scope::Table => 2,
            Scope::Column => 3,
        }
    }

    /// Scopes from `self` out to `Connection`, most specific first
    pub fn widening(&self) -> impl Iterator<Item = Scope> {
        let start = self.specificity();
        (0..=start).rev().map(|n| match n {
            0 => Scope::Connection,
            1 => Scope::Schema,
            2 => Scope::Table,
            _ => Scope::Column,
        })
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scope::Connection => write!(f, "connection"),
            Scope::Schema => write!(f, "schema"),
            Scope::Table => write!(f, "table"),
            Scope::Column => write!(f, "column"),
        }
    }
}

/// Kind of access being requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Read,
    Write,
    Delete,
    Admin,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Read => write!(f, "read"),
            Operation::Write => write!(f, "write"),
            Operation::Delete => write!(f, "delete"),
            Operation::Admin => write!(f, "admin"),
        }
    }
}

/// Authenticated principal, resolved by the session layer
///
/// Carries the admin flag so the resolver, the SQL filter and the
/// enforcement layer all consult the same source of truth for the
/// administrator bypass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    /// Opaque reference to the user account
    pub id: String,
    /// Whether the principal carries the ADMIN role
    pub admin: bool,
}

impl Subject {
    /// Create a regular (non-admin) subject
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            admin: false,
        }
    }

    /// Create an administrator subject
    pub fn admin(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            admin: true,
        }
    }

    /// Whether the administrator bypass applies to this subject
    pub fn is_admin(&self) -> bool {
        self.admin
    }
}

/// The (schema, table, column) triple identifying what is being accessed
///
/// Trailing components may be omitted for broader checks: a connection-wide
/// check carries none of them, a column check carries all three. A table
/// reference without a schema qualifier is legal (unqualified SQL); a column
/// without a table is not.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetLocator {
    pub schema: Option<String>,
    pub table: Option<String>,
    pub column: Option<String>,
}

impl TargetLocator {
    /// Connection-wide target, no locator components
    pub fn connection() -> Self {
        Self::default()
    }

    /// Schema-level target
    pub fn schema(schema: impl Into<String>) -> Self {
        Self {
            schema: Some(schema.into()),
            table: None,
            column: None,
        }
    }

    /// Table-level target; pass `None` for an unqualified table reference
    pub fn table(schema: Option<String>, table: impl Into<String>) -> Self {
        Self {
            schema,
            table: Some(table.into()),
            column: None,
        }
    }

    /// Column-level target
    pub fn column(schema: Option<String>, table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            schema,
            table: Some(table.into()),
            column: Some(column.into()),
        }
    }

    /// Most specific scope this target reaches
    pub fn depth(&self) -> Scope {
        if self.column.is_some() {
            Scope::Column
        } else if self.table.is_some() {
            Scope::Table
        } else if self.schema.is_some() {
            Scope::Schema
        } else {
            Scope::Connection
        }
    }

    /// Reject locators a caller should never construct
    ///
    /// A column check without a table is a caller bug, not a denial.
    pub fn validate(&self) -> Result<()> {
        if self.column.is_some() && self.table.is_none() {
            return Err(Error::MalformedLocator(
                "column target requires a table name".to_string(),
            ));
        }
        Ok(())
    }
}

impl std::fmt::Display for TargetLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<&str> = [
            self.schema.as_deref(),
            self.table.as_deref(),
            self.column.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect();
        if parts.is_empty() {
            write!(f, "(connection)")
        } else {
            write!(f, "{}", parts.join("."))
        }
    }
}

/// One row of authorization data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionRecord {
    /// Principal the record applies to
    pub subject_id: String,
    /// External database connection the record applies to
    pub connection_id: String,
    /// Hierarchy level the record covers
    pub scope: Scope,
    /// Operation the record covers
    pub operation: Operation,
    /// Populated progressively as scope narrows
    pub schema_name: Option<String>,
    pub table_name: Option<String>,
    pub column_name: Option<String>,
    /// `true` is an allow, `false` an explicit deny
    pub granted: bool,
    /// Provenance, not used during resolution
    pub granted_by: Option<String>,
    pub granted_at: DateTime<Utc>,
    /// Past expiry makes the record equivalent to no record
    pub expires_at: Option<DateTime<Utc>>,
    /// Soft-delete flag; a revoked record never participates in resolution
    #[serde(default)]
    pub revoked: bool,
}

impl PermissionRecord {
    /// Connection-scope record
    pub fn connection_scope(
        subject_id: impl Into<String>,
        connection_id: impl Into<String>,
        operation: Operation,
        granted: bool,
    ) -> Self {
        Self {
            subject_id: subject_id.into(),
            connection_id: connection_id.into(),
            scope: Scope::Connection,
            operation,
            schema_name: None,
            table_name: None,
            column_name: None,
            granted,
            granted_by: None,
            granted_at: Utc::now(),
            expires_at: None,
            revoked: false,
        }
    }

    /// Schema-scope record
    pub fn schema_scope(
        subject_id: impl Into<String>,
        connection_id: impl Into<String>,
        operation: Operation,
        granted: bool,
        schema: impl Into<String>,
    ) -> Self {
        let mut record = Self::connection_scope(subject_id, connection_id, operation, granted);
        record.scope = Scope::Schema;
        record.schema_name = Some(schema.into());
        record
    }

    /// Table-scope record
    pub fn table_scope(
        subject_id: impl Into<String>,
        connection_id: impl Into<String>,
        operation: Operation,
        granted: bool,
        schema: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        let mut record = Self::schema_scope(subject_id, connection_id, operation, granted, schema);
        record.scope = Scope::Table;
        record.table_name = Some(table.into());
        record
    }

    /// Column-scope record
    pub fn column_scope(
        subject_id: impl Into<String>,
        connection_id: impl Into<String>,
        operation: Operation,
        granted: bool,
        schema: impl Into<String>,
        table: impl Into<String>,
        column: impl Into<String>,
    ) -> Self {
        let mut record =
            Self::table_scope(subject_id, connection_id, operation, granted, schema, table);
        record.scope = Scope::Column;
        record.column_name = Some(column.into());
        record
    }

    /// Attach provenance
    pub fn with_granted_by(mut self, granted_by: impl Into<String>) -> Self {
        self.granted_by = Some(granted_by.into());
        self
    }

    /// Attach an expiry timestamp
    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Check the scope/locator consistency invariant
    ///
    /// `Connection` carries no locator fields, `Schema` only the schema,
    /// `Table` schema+table, `Column` all three.
    pub fn validate(&self) -> Result<()> {
        let expected = match self.scope {
            Scope::Connection => (false, false, false),
            Scope::Schema => (true, false, false),
            Scope::Table => (true, true, false),
            Scope::Column => (true, true, true),
        };
        let actual = (
            self.schema_name.is_some(),
            self.table_name.is_some(),
            self.column_name.is_some(),
        );
        if actual != expected {
            return Err(Error::InvalidRecord(format!(
                "locator fields do not match {} scope",
                self.scope
            )));
        }
        Ok(())
    }

    /// Whether the record has aged past its expiry at `now`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(expiry) if expiry < now)
    }

    /// Whether the record participates in resolution at `now`
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && !self.is_expired(now)
    }

    /// Whether this record's locator is a consistent superset of `target`
    ///
    /// Compared at the record's own scope: a schema-scope record matches any
    /// target inside that schema, a table-scope record any target inside that
    /// table. A record never matches a target broader than its own scope. A
    /// target without a schema qualifier leaves the record's schema
    /// unconstrained.
    pub fn matches_target(&self, target: &TargetLocator) -> bool {
        let schema_ok = |record_schema: &Option<String>| match (&target.schema, record_schema) {
            (Some(t), Some(r)) => t == r,
            (None, _) => true,
            (Some(_), None) => false,
        };
        match self.scope {
            Scope::Connection => true,
            Scope::Schema => match (&target.schema, &self.schema_name) {
                (Some(t), Some(r)) => t == r,
                _ => false,
            },
            Scope::Table => {
                target.table.is_some()
                    && target.table == self.table_name
                    && schema_ok(&self.schema_name)
            }
            Scope::Column => {
                target.column.is_some()
                    && target.column == self.column_name
                    && target.table == self.table_name
                    && schema_ok(&self.schema_name)
            }
        }
    }

    /// Store uniqueness key: at most one active record may share it
    pub fn key(&self) -> RecordKey {
        RecordKey {
            subject_id: self.subject_id.clone(),
            connection_id: self.connection_id.clone(),
            scope: self.scope,
            operation: self.operation,
            schema_name: self.schema_name.clone(),
            table_name: self.table_name.clone(),
            column_name: self.column_name.clone(),
        }
    }
}

/// Identity of a permission record within the store
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordKey {
    pub subject_id: String,
    pub connection_id: String,
    pub scope: Scope,
    pub operation: Operation,
    pub schema_name: Option<String>,
    pub table_name: Option<String>,
    pub column_name: Option<String>,
}

/// Ephemeral resolver output, never persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionCheckResult {
    pub granted: bool,
    pub reason: String,
}

impl PermissionCheckResult {
    /// Granted verdict with a reason for audit and debugging
    pub fn granted(reason: impl Into<String>) -> Self {
        Self {
            granted: true,
            reason: reason.into(),
        }
    }

    /// Denied verdict with a reason for audit and debugging
    pub fn denied(reason: impl Into<String>) -> Self {
        Self {
            granted: false,
            reason: reason.into(),
        }
    }
}

/// Verdict of the SQL text filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlValidationResult {
    pub allowed: bool,
    pub reason: String,
}

impl SqlValidationResult {
    pub fn allowed(reason: impl Into<String>) -> Self {
        Self {
            allowed: true,
            reason: reason.into(),
        }
    }

    pub fn denied(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: reason.into(),
        }
    }
}
