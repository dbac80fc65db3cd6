//! End-to-end tests for the grant, persist, reload workflow
//!
//! A granted record written through the file store survives a restart and
//! resolves identically afterwards, and the persisted format stays a plain
//! JSON array of records.

use std::sync::Arc;

use tablekeeper_permissions::{
    Error, FilePermissionStore, InMemoryPermissionStore, Operation, PermissionEnforcer,
    PermissionRecord, PermissionResolver, PermissionStore, Subject, TargetLocator,
};

fn enforcer_over(store: Arc<dyn PermissionStore>) -> PermissionEnforcer {
    PermissionEnforcer::new(Arc::new(PermissionResolver::new(store)))
}

#[test]
fn test_grant_survives_store_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("permissions.json");

    // First "session": grant and verify
    {
        let store = Arc::new(FilePermissionStore::new(&path));
        store
            .insert(PermissionRecord::table_scope(
                "alice",
                "warehouse",
                Operation::Write,
                true,
                "public",
                "employees",
            ))
            .unwrap();

        let enforcer = enforcer_over(store);
        assert!(enforcer.has_table_permission(
            &Subject::new("alice"),
            "warehouse",
            Operation::Write,
            "public",
            "employees",
        ));
    }

    // Second "session": a fresh store over the same file resolves the same
    let store = Arc::new(FilePermissionStore::new(&path));
    let enforcer = enforcer_over(store);
    assert!(enforcer.has_table_permission(
        &Subject::new("alice"),
        "warehouse",
        Operation::Write,
        "public",
        "employees",
    ));
    assert!(!enforcer.has_table_permission(
        &Subject::new("alice"),
        "warehouse",
        Operation::Write,
        "public",
        "salaries",
    ));
}

#[test]
fn test_persisted_format_is_json_record_array() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("permissions.json");

    let store = FilePermissionStore::new(&path);
    store
        .insert(
            PermissionRecord::column_scope(
                "alice",
                "warehouse",
                Operation::Read,
                true,
                "public",
                "employees",
                "salary",
            )
            .with_granted_by("admin"),
        )
        .unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();

    let records = parsed.as_array().expect("top level must be an array");
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record["subject_id"], "alice");
    assert_eq!(record["scope"], "column");
    assert_eq!(record["operation"], "read");
    assert_eq!(record["column_name"], "salary");
    assert_eq!(record["granted_by"], "admin");
    assert_eq!(record["revoked"], false);
}

#[test]
fn test_revoked_record_denies_after_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("permissions.json");

    let record = PermissionRecord::table_scope(
        "alice",
        "warehouse",
        Operation::Read,
        true,
        "public",
        "employees",
    );
    let key = record.key();

    let store = FilePermissionStore::new(&path);
    store.insert(record).unwrap();
    assert!(store.revoke(&key).unwrap());

    let enforcer = enforcer_over(Arc::new(FilePermissionStore::new(&path)));
    let err = enforcer
        .require_permission(
            &Subject::new("alice"),
            "warehouse",
            Operation::Read,
            &TargetLocator::table(Some("public".into()), "employees"),
        )
        .unwrap_err();
    assert!(matches!(err, Error::PermissionDenied { .. }));
}

#[test]
fn test_export_import_between_backends() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("permissions.json");

    let file_store = FilePermissionStore::new(&path);
    file_store
        .replace_all(vec![
            PermissionRecord::schema_scope("alice", "warehouse", Operation::Read, true, "public"),
            PermissionRecord::table_scope(
                "alice",
                "warehouse",
                Operation::Read,
                false,
                "public",
                "salaries",
            ),
        ])
        .unwrap();

    // Import the exported set into a live in-memory store
    let exported = file_store.load_connection_records("warehouse").unwrap();
    let live = Arc::new(InMemoryPermissionStore::new());
    live.replace_all(exported).unwrap();

    let enforcer = enforcer_over(live);
    let alice = Subject::new("alice");
    assert!(enforcer.has_table_permission(&alice, "warehouse", Operation::Read, "public", "employees"));
    assert!(!enforcer.has_table_permission(&alice, "warehouse", Operation::Read, "public", "salaries"));
}
