//! SQL text permission filtering
//!
//! Free-form SQL (ad-hoc WHERE clauses, saved queries) bypasses the
//! structured locator path, so this filter derives the verdict the resolver
//! would give if the statement's targets were known structurally. It is a
//! defense-in-depth layer for the free-form path only, never the sole gate
//! for a structured operation.

use std::sync::Arc;

use tracing::debug;

use crate::error::{Error, Result};
use crate::permission::models::{SqlValidationResult, Subject, TargetLocator};
use crate::permission::resolver::PermissionResolver;
use crate::sql::extract::{self, TableRef};

/// Validates raw SQL statements against the permission records
pub struct SqlPermissionFilter {
    resolver: Arc<PermissionResolver>,
}

impl SqlPermissionFilter {
    /// Create a filter over a resolver
    pub fn new(resolver: Arc<PermissionResolver>) -> Self {
        Self { resolver }
    }

    /// Decide whether a subject may execute a raw SQL statement
    ///
    /// Classifies the required operation from the leading verb, extracts
    /// referenced tables and columns, and evaluates each reference through
    /// the resolver. A statement whose references cannot be extracted is
    /// denied rather than let through unchecked (fail-closed). Column checks
    /// are refinements: a column with no column-scope record falls through to
    /// the covering table grant, while an explicit column-scope deny still
    /// blocks it.
    pub fn validate_sql_query(
        &self,
        sql: &str,
        subject: &Subject,
        connection_id: &str,
    ) -> Result<SqlValidationResult> {
        if subject.is_admin() {
            return Ok(SqlValidationResult::allowed("administrator bypass"));
        }

        let statement = sql.trim();
        if statement.is_empty() {
            return Ok(SqlValidationResult::denied("empty SQL statement"));
        }

        let operation = extract::classify_operation(statement);

        let tables = match self.extract_tables_checked(statement) {
            Ok(tables) => tables,
            Err(Error::SqlParseAmbiguous(reason)) => {
                debug!(%reason, "denying ambiguous SQL statement");
                return Ok(SqlValidationResult::denied(format!(
                    "could not determine referenced tables: {}",
                    reason
                )));
            }
            Err(e) => return Err(e),
        };

        for table in &tables {
            let target = TargetLocator::table(table.schema.clone(), &table.table);
            let result = self
                .resolver
                .check_permission(subject, connection_id, operation, &target)?;
            if !result.granted {
                return Ok(SqlValidationResult::denied(format!(
                    "{} access denied for table {}: {}",
                    operation, target, result.reason
                )));
            }
        }

        // The regex extractor cannot attribute a column to one join arm, so
        // each column is checked against every referenced table. A column
        // with no column-scope record falls through to the table grant
        // already verified above; only an explicit column-scope deny can
        // fail here, whichever table it hangs off.
        for column in extract::extract_columns(statement) {
            for table in &tables {
                let target = TargetLocator::column(table.schema.clone(), &table.table, &column);
                let result = self
                    .resolver
                    .check_permission(subject, connection_id, operation, &target)?;
                if !result.granted {
                    return Ok(SqlValidationResult::denied(format!(
                        "{} access denied for column {}: {}",
                        operation, target, result.reason
                    )));
                }
            }
        }

        Ok(SqlValidationResult::allowed(format!(
            "{} access granted for {} table reference(s)",
            operation,
            tables.len()
        )))
    }

    /// Extract tables, failing when a statement yields none
    fn extract_tables_checked(&self, sql: &str) -> Result<Vec<TableRef>> {
        let tables = extract::extract_tables(sql);
        if tables.is_empty() {
            return Err(Error::SqlParseAmbiguous(
                "no table reference found in statement".to_string(),
            ));
        }
        Ok(tables)
    }
}
