//! Declarative and programmatic permission enforcement
//!
//! The declarative path wraps a protected operation closure behind a typed
//! request that knows its own locator and required operation. The
//! programmatic path offers `require_permission` / `has_permission` /
//! `filter_by_permission` for call sites where the target is only known at
//! runtime.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::audit::AuditLogger;
use crate::error::{Error, Result};
use crate::permission::models::{Operation, PermissionCheckResult, Subject, TargetLocator};
use crate::permission::resolver::PermissionResolver;

/// A typed request that can name its own authorization target
///
/// Protected operations implement this instead of relying on parameter
/// introspection; the enforcer extracts (connection, operation, locator)
/// through the trait before the operation body runs.
pub trait ProtectedRequest {
    /// Connection the request targets
    fn connection_id(&self) -> &str;
    /// Operation the request needs
    fn required_operation(&self) -> Operation;
    /// Locator the request touches
    fn target_locator(&self) -> TargetLocator;
}

/// Enforcement front-end over the resolver
pub struct PermissionEnforcer {
    resolver: Arc<PermissionResolver>,
    audit_logger: Option<Arc<AuditLogger>>,
}

impl PermissionEnforcer {
    /// Create an enforcer without an audit sink
    pub fn new(resolver: Arc<PermissionResolver>) -> Self {
        Self {
            resolver,
            audit_logger: None,
        }
    }

    /// Create an enforcer that records every check to an audit sink
    pub fn with_audit(resolver: Arc<PermissionResolver>, audit_logger: Arc<AuditLogger>) -> Self {
        Self {
            resolver,
            audit_logger: Some(audit_logger),
        }
    }

    /// Run a check and record it with the audit sink when one is attached
    ///
    /// Audit recording is fire-and-forget; a sink failure never turns a
    /// verdict into an error.
    fn check_and_record(
        &self,
        subject: &Subject,
        connection_id: &str,
        operation: Operation,
        target: &TargetLocator,
    ) -> Result<PermissionCheckResult> {
        let result = self
            .resolver
            .check_permission(subject, connection_id, operation, target)?;

        if let Some(logger) = &self.audit_logger {
            if let Err(e) =
                logger.record_check(&subject.id, connection_id, operation, target, &result)
            {
                debug!(error = %e, "failed to record audit entry");
            }
        }

        Ok(result)
    }

    /// Check a permission, returning `Err(PermissionDenied)` on denial
    pub fn require_permission(
        &self,
        subject: &Subject,
        connection_id: &str,
        operation: Operation,
        target: &TargetLocator,
    ) -> Result<()> {
        let result = self.check_and_record(subject, connection_id, operation, target)?;
        if result.granted {
            Ok(())
        } else {
            warn!(
                subject = %subject.id,
                connection = connection_id,
                %operation,
                %target,
                reason = %result.reason,
                "permission denied"
            );
            Err(Error::PermissionDenied {
                reason: result.reason,
            })
        }
    }

    /// Check a permission without failing
    ///
    /// A check that errors (malformed locator, store failure) reads as not
    /// granted.
    pub fn has_permission(
        &self,
        subject: &Subject,
        connection_id: &str,
        operation: Operation,
        target: &TargetLocator,
    ) -> bool {
        match self.check_and_record(subject, connection_id, operation, target) {
            Ok(result) => result.granted,
            Err(e) => {
                debug!(error = %e, "permission check failed, treating as denied");
                false
            }
        }
    }

    /// Table-level convenience check
    pub fn has_table_permission(
        &self,
        subject: &Subject,
        connection_id: &str,
        operation: Operation,
        schema: &str,
        table: &str,
    ) -> bool {
        let target = TargetLocator::table(Some(schema.to_string()), table);
        self.has_permission(subject, connection_id, operation, &target)
    }

    /// Drop items the subject cannot access
    ///
    /// Fails closed per item: an item whose check errors is excluded, not
    /// propagated as a fatal error for the whole collection. Exclusions are
    /// logged at debug level.
    pub fn filter_by_permission<T, F>(
        &self,
        subject: &Subject,
        connection_id: &str,
        items: Vec<T>,
        to_target: F,
    ) -> Vec<T>
    where
        F: Fn(&T) -> (Operation, TargetLocator),
    {
        items
            .into_iter()
            .filter(|item| {
                let (operation, target) = to_target(item);
                match self.check_and_record(subject, connection_id, operation, &target) {
                    Ok(result) => result.granted,
                    Err(e) => {
                        debug!(
                            subject = %subject.id,
                            %target,
                            error = %e,
                            "excluding item after failed permission check"
                        );
                        false
                    }
                }
            })
            .collect()
    }

    /// Guard a protected operation behind its request's declared target
    ///
    /// The closure runs only after the check passes; a denial aborts the call
    /// with `PermissionDenied` and the closure never executes.
    pub fn execute_protected<R, F, T>(&self, subject: &Subject, request: &R, operation: F) -> Result<T>
    where
        R: ProtectedRequest,
        F: FnOnce() -> Result<T>,
    {
        self.require_permission(
            subject,
            request.connection_id(),
            request.required_operation(),
            &request.target_locator(),
        )?;
        operation()
    }

    /// Access to the underlying resolver
    pub fn resolver(&self) -> Arc<PermissionResolver> {
        Arc::clone(&self.resolver)
    }
}
