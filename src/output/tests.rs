//! Tests for output module

use super::*;
use crate::error::Error;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::path::Path;
use tempfile::tempdir;

fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap()
}

// ============================================================================
// Cell Rendering Tests
// ============================================================================

#[test]
fn test_render_cell() {
    assert_eq!(render_cell(&json!("text")), "text");
    assert_eq!(render_cell(&json!(12)), "12");
    assert_eq!(render_cell(&json!(1.5)), "1.5");
    assert_eq!(render_cell(&json!(true)), "true");
    assert_eq!(render_cell(&json!(null)), "");
    assert_eq!(render_cell(&json!(["a", 1])), r#"["a",1]"#);
    assert_eq!(render_cell(&json!({"k": "v"})), r#"{"k":"v"}"#);
}

// ============================================================================
// Table Definition / Manifest Tests
// ============================================================================

#[test]
fn test_table_definition_builder() {
    let table = TableDefinition::new("campaigns", ["id"]).with_columns(["id", "name"]);

    assert_eq!(table.file_name(), "campaigns.csv");
    assert_eq!(table.primary_key, vec!["id"]);
    assert_eq!(table.columns, vec!["id", "name"]);
}

#[test]
fn test_manifest_path_for() {
    assert_eq!(
        manifest_path_for(Path::new("/out/customers.csv")),
        Path::new("/out/customers.csv.manifest")
    );
}

#[test]
fn test_write_file_manifest_omits_columns() {
    let dir = tempdir().unwrap();
    let csv_path = dir.path().join("customers.csv");
    std::fs::write(&csv_path, "id,email\n1,a@b.c\n").unwrap();

    let result = write_file_manifest(&csv_path, &["id".to_string()], true).unwrap();

    assert_eq!(result.name, "customers");
    assert_eq!(result.rows_written, None);
    assert!(result.columns.is_empty());

    let raw: serde_json::Value = serde_json::from_str(&read(&result.manifest_path)).unwrap();
    assert_eq!(raw, json!({"primary_key": ["id"], "incremental": true}));
}

// ============================================================================
// Result Writer Tests
// ============================================================================

#[test]
fn test_writer_fixed_header() {
    let dir = tempdir().unwrap();
    let table = TableDefinition::new("campaigns", ["id"]).with_columns(["id", "name", "tags"]);

    let mut writer = ResultWriter::open(dir.path(), table, WriterOptions::new().fixed()).unwrap();
    writer
        .write_all(
            &[
                json!({"id": 1, "name": "Welcome", "tags": ["a"], "unknown": 5}),
                json!({"id": 2}),
            ],
            false,
        )
        .unwrap();
    let result = writer.close().unwrap();

    assert_eq!(result.columns, vec!["id", "name", "tags"]);
    assert_eq!(result.rows_written, Some(2));
    assert_eq!(read(&result.path), "1,Welcome,\"[\"\"a\"\"]\"\n2,,\n");

    let manifest = TableManifest::read_from(&result.manifest_path).unwrap();
    assert_eq!(manifest.columns, Some(vec!["id".into(), "name".into(), "tags".into()]));
    assert_eq!(manifest.primary_key, vec!["id"]);
    assert!(!manifest.incremental);
}

#[test]
fn test_writer_fixed_header_requires_columns() {
    let dir = tempdir().unwrap();
    let err = ResultWriter::open(
        dir.path(),
        TableDefinition::new("broken", ["id"]),
        WriterOptions::new().fixed(),
    )
    .unwrap_err();

    assert!(matches!(err, Error::Output { .. }));
}

#[test]
fn test_writer_discovers_header_from_first_batch() {
    let dir = tempdir().unwrap();
    let table = TableDefinition::new("segments", ["id"]);

    let mut writer = ResultWriter::open(dir.path(), table, WriterOptions::new()).unwrap();
    writer
        .write_all(
            &[
                json!({"name": "VIP", "id": 1}),
                json!({"id": 2, "description": "all"}),
            ],
            true,
        )
        .unwrap();

    assert_eq!(
        writer.header().unwrap(),
        &["id".to_string(), "description".to_string(), "name".to_string()]
    );

    // header is frozen after the first batch
    writer.write(&json!({"id": 3, "late": true})).unwrap();
    assert!(writer.dropped_fields().contains("late"));

    let result = writer.close().unwrap();
    assert_eq!(result.columns, vec!["id", "description", "name"]);
    assert_eq!(read(&result.path), "1,,VIP\n2,all,\n3,,\n");
}

#[test]
fn test_writer_flattens_nested_objects() {
    let dir = tempdir().unwrap();
    let table = TableDefinition::new("activity_page", ["id"]);

    let mut writer = ResultWriter::open(dir.path(), table, WriterOptions::new()).unwrap();
    writer
        .write(&json!({"id": "a1", "data": {"url": "https://x", "tags": [1, 2]}}))
        .unwrap();
    let result = writer.close().unwrap();

    assert_eq!(result.columns, vec!["id", "data_tags", "data_url"]);
    assert_eq!(read(&result.path), "a1,\"[1,2]\",https://x\n");
}

#[test]
fn test_writer_collapses_data_when_not_flattening() {
    let dir = tempdir().unwrap();
    let table = TableDefinition::new("activities_all", ["id"])
        .with_columns(crate::client::SINGLE_ACTIVITY_COLUMNS);

    let mut writer = ResultWriter::open(dir.path(), table, WriterOptions::new()).unwrap();
    writer
        .write_all(
            &[json!({"id": "a1", "type": "page", "data": {"url": "x"}})],
            false,
        )
        .unwrap();
    let result = writer.close().unwrap();

    assert_eq!(read(&result.path), "a1,,page,,\"{\"\"url\"\":\"\"x\"\"}\",,\n");
}

#[test]
fn test_writer_custom_separator_and_incremental() {
    let dir = tempdir().unwrap();
    let table = TableDefinition::new("t", ["id"]);

    let mut writer = ResultWriter::open(
        dir.path(),
        table,
        WriterOptions::new().with_separator("__").with_incremental(true),
    )
    .unwrap();
    writer.write(&json!({"id": 1, "a": {"b": 2}})).unwrap();
    let result = writer.close().unwrap();

    assert_eq!(result.columns, vec!["id", "a__b"]);
    assert!(result.incremental);
    assert!(TableManifest::read_from(&result.manifest_path).unwrap().incremental);
}

#[test]
fn test_writer_without_rows_still_produces_table() {
    let dir = tempdir().unwrap();
    let writer = ResultWriter::open(
        dir.path(),
        TableDefinition::new("empty", ["id"]),
        WriterOptions::new(),
    )
    .unwrap();
    let result = writer.close().unwrap();

    assert!(result.path.exists());
    assert_eq!(read(&result.path), "");
    assert_eq!(result.rows_written, Some(0));
    assert!(result.manifest_path.exists());
}

#[test]
fn test_writer_finalizes_on_drop() {
    let dir = tempdir().unwrap();
    {
        let mut writer = ResultWriter::open(
            dir.path(),
            TableDefinition::new("dropped", ["id"]),
            WriterOptions::new(),
        )
        .unwrap();
        writer.write(&json!({"id": 1})).unwrap();
    }

    assert_eq!(read(&dir.path().join("dropped.csv")), "1\n");
    let manifest = TableManifest::read_from(&dir.path().join("dropped.csv.manifest")).unwrap();
    assert_eq!(manifest.columns, Some(vec!["id".to_string()]));
}

#[test]
fn test_collect_results_closes_every_writer() {
    let dir = tempdir().unwrap();
    let writers = ["a", "b"]
        .into_iter()
        .map(|name| {
            ResultWriter::open(
                dir.path(),
                TableDefinition::new(name, ["id"]),
                WriterOptions::new(),
            )
            .unwrap()
        })
        .collect::<Vec<_>>();

    let results = ResultWriter::collect_results(writers).unwrap();

    let names: Vec<&str> = results.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b"]);
    assert!(dir.path().join("b.csv.manifest").exists());
}
