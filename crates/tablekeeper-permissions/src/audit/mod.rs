//! Audit logging for permission checks

pub mod logger;
pub mod models;
pub mod query;

pub use logger::AuditLogger;
pub use models::AuditLogEntry;
pub use query::{Pagination, QueryFilter};
