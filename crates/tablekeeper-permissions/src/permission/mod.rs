//! Permission resolution and enforcement

pub mod enforce;
pub mod models;
pub mod resolver;

pub use enforce::{PermissionEnforcer, ProtectedRequest};
pub use models::{
    Operation, PermissionCheckResult, PermissionRecord, RecordKey, Scope, SqlValidationResult,
    Subject, TargetLocator,
};
pub use resolver::PermissionResolver;
