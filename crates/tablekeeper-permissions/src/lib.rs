//! Permission core for Tablekeeper
//!
//! Decides, for any (subject, connection, schema, table, column, operation)
//! tuple, whether access is granted: a four-level scope hierarchy with
//! explicit allow/deny records, expiry handling, an administrator bypass, and
//! a regex-based SQL text filter that reaches the same verdict for free-form
//! statements.

pub mod audit;
pub mod error;
pub mod permission;
pub mod sql;
pub mod store;

pub use audit::{AuditLogEntry, AuditLogger, Pagination, QueryFilter};
pub use error::{Error, Result};
pub use permission::{
    Operation, PermissionCheckResult, PermissionEnforcer, PermissionRecord, PermissionResolver,
    ProtectedRequest, RecordKey, Scope, SqlValidationResult, Subject, TargetLocator,
};
pub use sql::{SqlPermissionFilter, TableRef};
pub use store::{FilePermissionStore, InMemoryPermissionStore, PermissionStore};
