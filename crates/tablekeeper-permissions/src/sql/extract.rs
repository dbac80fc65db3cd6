//! Regex-based extraction of operations, tables and columns from SQL text
//!
//! This is deliberately a pattern-matching extractor, not a SQL parser. It is
//! isolated behind this module so it can be swapped for a real tokenizer
//! without touching the resolver or enforcement layers. Where the patterns
//! are lossy they err toward over-extraction: an extra captured identifier
//! means an extra permission check, never a skipped one.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::permission::models::Operation;

/// A table referenced by a SQL statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    /// Schema qualifier, when the reference is qualified
    pub schema: Option<String>,
    /// Table name
    pub table: String,
}

static LEADING_VERB: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*([A-Za-z]+)").expect("leading verb pattern"));

static TABLE_REFS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:insert\s+into|delete\s+from|update|from|join)\s+(?:([A-Za-z_][A-Za-z0-9_]*)\s*\.\s*)?([A-Za-z_][A-Za-z0-9_]*)",
    )
    .expect("table reference pattern")
});

static SELECT_LIST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^\s*select\s+(?:distinct\s+)?(.*?)\s+from\b").expect("select list pattern")
});

static INSERT_COLUMNS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^\s*insert\s+into\s+[A-Za-z_][A-Za-z0-9_]*(?:\s*\.\s*[A-Za-z_][A-Za-z0-9_]*)?\s*\(([^)]*)\)")
        .expect("insert column list pattern")
});

static SET_CLAUSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)\bset\s+(.*?)(?:\bwhere\b|$)").expect("set clause pattern")
});

static SET_ASSIGNMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:[A-Za-z_][A-Za-z0-9_]*\s*\.\s*)?([A-Za-z_][A-Za-z0-9_]*)\s*=")
        .expect("set assignment pattern")
});

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:([A-Za-z_][A-Za-z0-9_]*)\s*\.\s*)?([A-Za-z_][A-Za-z0-9_]*)")
        .expect("identifier pattern")
});

static TRAILING_ALIAS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s+as\s+[A-Za-z_][A-Za-z0-9_]*\s*$").expect("alias pattern"));

/// Words a naive split captures that are never column names
const RESERVED_WORDS: &[&str] = &[
    "all", "and", "as", "asc", "avg", "between", "by", "case", "cast", "coalesce", "count",
    "desc", "distinct", "else", "end", "exists", "false", "from", "group", "having", "in", "is",
    "like", "limit", "lower", "max", "min", "not", "null", "nullif", "offset", "or", "order",
    "select", "sum", "then", "true", "upper", "when", "where",
];

fn is_reserved(word: &str) -> bool {
    RESERVED_WORDS.contains(&word.to_ascii_lowercase().as_str())
}

/// Map a statement's leading verb to the operation it requires
///
/// Unrecognized verbs map to `Read`, the most restrictive reasonable default
/// (fail-toward-safety, not fail-open).
pub fn classify_operation(sql: &str) -> Operation {
    let verb = LEADING_VERB
        .captures(sql)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_ascii_uppercase())
        .unwrap_or_default();

    match verb.as_str() {
        "SELECT" => Operation::Read,
        "INSERT" | "UPDATE" => Operation::Write,
        "DELETE" | "DROP" | "TRUNCATE" => Operation::Delete,
        "CREATE" | "ALTER" => Operation::Admin,
        _ => Operation::Read,
    }
}

/// Extract the tables a statement references
///
/// Scans `FROM`/`JOIN`/`UPDATE`/`INSERT INTO`/`DELETE FROM` clauses,
/// capturing an optional schema qualifier. Duplicates are dropped, first
/// occurrence order is kept.
pub fn extract_tables(sql: &str) -> Vec<TableRef> {
    let mut tables = Vec::new();
    for captures in TABLE_REFS.captures_iter(sql) {
        let table = match captures.get(2) {
            Some(m) if !is_reserved(m.as_str()) => m.as_str().to_string(),
            _ => continue,
        };
        let table_ref = TableRef {
            schema: captures.get(1).map(|m| m.as_str().to_string()),
            table,
        };
        if !tables.contains(&table_ref) {
            tables.push(table_ref);
        }
    }
    tables
}

/// Extract the columns a statement references, by verb
///
/// SELECT: the column list between `SELECT` and the first `FROM` (a bare `*`
/// yields nothing). INSERT: the parenthesized column list. UPDATE: the
/// left-hand sides of `SET` assignments. Alias prefixes are stripped and
/// reserved words dropped. WHERE clauses are not scanned.
pub fn extract_columns(sql: &str) -> Vec<String> {
    let verb = LEADING_VERB
        .captures(sql)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_ascii_uppercase())
        .unwrap_or_default();

    let mut columns = Vec::new();
    let mut push = |column: String| {
        if !columns.contains(&column) {
            columns.push(column);
        }
    };

    match verb.as_str() {
        "SELECT" => {
            let Some(list) = SELECT_LIST.captures(sql).and_then(|c| c.get(1)) else {
                return Vec::new();
            };
            let list = list.as_str().trim();
            if list == "*" {
                return Vec::new();
            }
            for part in list.split(',') {
                let part = TRAILING_ALIAS.replace(part.trim(), "");
                for captures in IDENTIFIER.captures_iter(&part) {
                    if let Some(ident) = captures.get(2) {
                        if !is_reserved(ident.as_str()) {
                            push(ident.as_str().to_string());
                        }
                    }
                }
            }
        }
        "INSERT" => {
            if let Some(list) = INSERT_COLUMNS.captures(sql).and_then(|c| c.get(1)) {
                for part in list.as_str().split(',') {
                    let part = part.trim();
                    if !part.is_empty() && !is_reserved(part) {
                        push(part.to_string());
                    }
                }
            }
        }
        "UPDATE" => {
            if let Some(clause) = SET_CLAUSE.captures(sql).and_then(|c| c.get(1)) {
                for captures in SET_ASSIGNMENT.captures_iter(clause.as_str()) {
                    if let Some(ident) = captures.get(1) {
                        if !is_reserved(ident.as_str()) {
                            push(ident.as_str().to_string());
                        }
                    }
                }
            }
        }
        _ => {}
    }

    columns
}
