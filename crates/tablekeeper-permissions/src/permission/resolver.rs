//! Permission resolution

use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use crate::error::Result;
use crate::permission::models::{
    Operation, PermissionCheckResult, Scope, Subject, TargetLocator,
};
use crate::store::PermissionStore;

/// Resolves effective permissions by walking the scope hierarchy
///
/// A pure function of (subject, connection, locator, operation, record set,
/// current time): each check loads the current record set and evaluates in
/// memory, so concurrent checks are independent and need no locking here.
pub struct PermissionResolver {
    store: Arc<dyn PermissionStore>,
}

impl PermissionResolver {
    /// Create a resolver over a record store
    pub fn new(store: Arc<dyn PermissionStore>) -> Self {
        Self { store }
    }

    /// Compute the effective grant for a target and operation
    ///
    /// Walks matching records from the most specific scope the target reaches
    /// out to `Connection`. The first scope level with any match decides: an
    /// explicit deny at that level wins over any allow at the same level, and
    /// no match at any level is a denial (fail-closed).
    ///
    /// Administrators are granted unconditionally, before any record is
    /// loaded. A malformed locator is a caller bug and fails fast instead of
    /// denying.
    pub fn check_permission(
        &self,
        subject: &Subject,
        connection_id: &str,
        operation: Operation,
        target: &TargetLocator,
    ) -> Result<PermissionCheckResult> {
        target.validate()?;

        if subject.is_admin() {
            return Ok(PermissionCheckResult::granted("administrator bypass"));
        }

        let now = Utc::now();
        let records = self.store.load_active_records(&subject.id, connection_id)?;

        for scope in target.depth().widening() {
            let matches: Vec<_> = records
                .iter()
                .filter(|r| {
                    r.scope == scope
                        && r.operation == operation
                        && r.is_active(now)
                        && r.matches_target(target)
                })
                .collect();

            if matches.is_empty() {
                continue;
            }

            debug!(
                subject = %subject.id,
                connection = connection_id,
                %scope,
                matched = matches.len(),
                "resolved permission at scope level"
            );

            if matches.iter().any(|r| !r.granted) {
                return Ok(PermissionCheckResult::denied(format!(
                    "explicit deny at {} scope for {} on {}",
                    scope, operation, target
                )));
            }

            return Ok(PermissionCheckResult::granted(format!(
                "granted at {} scope for {} on {}",
                scope, operation, target
            )));
        }

        Ok(PermissionCheckResult::denied(format!(
            "no permission record matches {} on {}",
            operation, target
        )))
    }

    /// Scope levels a target of the given depth is resolved against
    ///
    /// Exposed for diagnostics; `check_permission` iterates the same order.
    pub fn resolution_order(target: &TargetLocator) -> Vec<Scope> {
        target.depth().widening().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission::models::PermissionRecord;
    use crate::store::InMemoryPermissionStore;
    use chrono::Duration;

    fn resolver_with(records: Vec<PermissionRecord>) -> PermissionResolver {
        let store = InMemoryPermissionStore::with_records(records).unwrap();
        PermissionResolver::new(Arc::new(store))
    }

    fn table_target(schema: &str, table: &str) -> TargetLocator {
        TargetLocator::table(Some(schema.to_string()), table)
    }

    #[test]
    fn test_fail_closed_default() {
        let resolver = resolver_with(vec![]);
        let result = resolver
            .check_permission(
                &Subject::new("u1"),
                "db1",
                Operation::Read,
                &table_target("public", "users"),
            )
            .unwrap();
        assert!(!result.granted);
    }

    #[test]
    fn test_admin_bypass_ignores_records() {
        let deny_all =
            PermissionRecord::connection_scope("root", "db1", Operation::Read, false);
        let resolver = resolver_with(vec![deny_all]);

        let result = resolver
            .check_permission(
                &Subject::admin("root"),
                "db1",
                Operation::Read,
                &table_target("public", "users"),
            )
            .unwrap();
        assert!(result.granted);
        assert_eq!(result.reason, "administrator bypass");
    }

    #[test]
    fn test_connection_grant_covers_narrow_targets() {
        let resolver = resolver_with(vec![PermissionRecord::connection_scope(
            "u1",
            "db1",
            Operation::Read,
            true,
        )]);

        for target in [
            TargetLocator::connection(),
            TargetLocator::schema("public"),
            table_target("public", "users"),
            TargetLocator::column(Some("public".to_string()), "users", "name"),
        ] {
            let result = resolver
                .check_permission(&Subject::new("u1"), "db1", Operation::Read, &target)
                .unwrap();
            assert!(result.granted, "expected grant for {}", target);
        }
    }

    #[test]
    fn test_specificity_precedence_table_deny_under_schema_allow() {
        let resolver = resolver_with(vec![
            PermissionRecord::schema_scope("u1", "db1", Operation::Read, true, "public"),
            PermissionRecord::table_scope("u1", "db1", Operation::Read, false, "public", "salaries"),
        ]);
        let subject = Subject::new("u1");

        let denied = resolver
            .check_permission(&subject, "db1", Operation::Read, &table_target("public", "salaries"))
            .unwrap();
        assert!(!denied.granted);

        // Sibling table with no table-level record falls through to the schema allow
        let granted = resolver
            .check_permission(&subject, "db1", Operation::Read, &table_target("public", "users"))
            .unwrap();
        assert!(granted.granted);
    }

    #[test]
    fn test_table_grant_covers_all_columns() {
        let resolver = resolver_with(vec![PermissionRecord::table_scope(
            "u1",
            "db1",
            Operation::Read,
            true,
            "public",
            "users",
        )]);

        let result = resolver
            .check_permission(
                &Subject::new("u1"),
                "db1",
                Operation::Read,
                &TargetLocator::column(Some("public".to_string()), "users", "email"),
            )
            .unwrap();
        assert!(result.granted);
    }

    #[test]
    fn test_column_deny_overrides_table_allow() {
        let resolver = resolver_with(vec![
            PermissionRecord::table_scope("u1", "db1", Operation::Read, true, "public", "users"),
            PermissionRecord::column_scope(
                "u1",
                "db1",
                Operation::Read,
                false,
                "public",
                "users",
                "ssn",
            ),
        ]);
        let subject = Subject::new("u1");

        let denied = resolver
            .check_permission(
                &subject,
                "db1",
                Operation::Read,
                &TargetLocator::column(Some("public".to_string()), "users", "ssn"),
            )
            .unwrap();
        assert!(!denied.granted);

        let granted = resolver
            .check_permission(
                &subject,
                "db1",
                Operation::Read,
                &TargetLocator::column(Some("public".to_string()), "users", "email"),
            )
            .unwrap();
        assert!(granted.granted);
    }

    #[test]
    fn test_deny_wins_within_same_level() {
        // An unqualified target matches both table-scope records; the level
        // has an allow and a deny, and the deny decides.
        let resolver = resolver_with(vec![
            PermissionRecord::table_scope("u1", "db1", Operation::Write, true, "public", "orders"),
            PermissionRecord::table_scope("u1", "db1", Operation::Write, false, "internal", "orders")
                .with_granted_by("security-review"),
        ]);

        let result = resolver
            .check_permission(
                &Subject::new("u1"),
                "db1",
                Operation::Write,
                &TargetLocator::table(None, "orders"),
            )
            .unwrap();
        assert!(!result.granted);
    }

    #[test]
    fn test_expired_allow_is_absent() {
        let now = Utc::now();
        let resolver = resolver_with(vec![
            PermissionRecord::column_scope(
                "u1",
                "db1",
                Operation::Read,
                true,
                "public",
                "users",
                "email",
            )
            .with_expiry(now - Duration::minutes(5)),
            PermissionRecord::table_scope("u1", "db1", Operation::Read, false, "public", "users"),
        ]);

        // The expired column allow is treated as absent, so resolution falls
        // through to the table-level deny.
        let result = resolver
            .check_permission(
                &Subject::new("u1"),
                "db1",
                Operation::Read,
                &TargetLocator::column(Some("public".to_string()), "users", "email"),
            )
            .unwrap();
        assert!(!result.granted);
    }

    #[test]
    fn test_expired_allow_with_no_fallback_denies() {
        let resolver = resolver_with(vec![PermissionRecord::table_scope(
            "u1",
            "db1",
            Operation::Read,
            true,
            "public",
            "users",
        )
        .with_expiry(Utc::now() - Duration::hours(1))]);

        let result = resolver
            .check_permission(
                &Subject::new("u1"),
                "db1",
                Operation::Read,
                &table_target("public", "users"),
            )
            .unwrap();
        assert!(!result.granted);
    }

    #[test]
    fn test_operation_match_is_exact() {
        let resolver = resolver_with(vec![PermissionRecord::table_scope(
            "u1",
            "db1",
            Operation::Read,
            true,
            "public",
            "users",
        )]);

        let result = resolver
            .check_permission(
                &Subject::new("u1"),
                "db1",
                Operation::Write,
                &table_target("public", "users"),
            )
            .unwrap();
        assert!(!result.granted);
    }

    #[test]
    fn test_malformed_locator_fails_fast() {
        let resolver = resolver_with(vec![]);
        let malformed = TargetLocator {
            schema: Some("public".to_string()),
            table: None,
            column: Some("name".to_string()),
        };

        let err = resolver
            .check_permission(&Subject::new("u1"), "db1", Operation::Read, &malformed)
            .unwrap_err();
        assert!(matches!(err, crate::error::Error::MalformedLocator(_)));
    }

    #[test]
    fn test_records_scoped_to_connection() {
        let resolver = resolver_with(vec![PermissionRecord::connection_scope(
            "u1",
            "other-db",
            Operation::Read,
            true,
        )]);

        let result = resolver
            .check_permission(
                &Subject::new("u1"),
                "db1",
                Operation::Read,
                &TargetLocator::connection(),
            )
            .unwrap();
        assert!(!result.granted);
    }

    #[test]
    fn test_resolution_order() {
        let order = PermissionResolver::resolution_order(&table_target("public", "users"));
        assert_eq!(order, vec![Scope::Table, Scope::Schema, Scope::Connection]);
    }
}
