//! CSV table writer
//!
//! Rows are written without a header line; the final column list goes to the
//! table's manifest when the writer is closed.

use super::table::{manifest_path_for, TableDefinition, TableManifest, TableResult};
use crate::error::{Error, Result};
use crate::schema::{flatten_with, order_header, FlattenOptions, SCALAR_FIELD};
use crate::types::JsonObject;
use serde_json::Value;
use std::collections::{BTreeSet, HashSet};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Configuration for a table writer
#[derive(Debug, Clone)]
pub struct WriterOptions {
    /// Only the declared columns are allowed; no discovery
    pub fix_headers: bool,
    /// Flatten nested objects into `parent_child` columns
    pub flatten_objects: bool,
    /// Mark the table for incremental loading
    pub incremental: bool,
    /// Separator used when flattening
    pub separator: String,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            fix_headers: false,
            flatten_objects: true,
            incremental: false,
            separator: crate::schema::DEFAULT_SEPARATOR.to_string(),
        }
    }
}

impl WriterOptions {
    /// Create options with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Require the declared header
    #[must_use]
    pub fn fixed(mut self) -> Self {
        self.fix_headers = true;
        self
    }

    /// Enable or disable flattening
    #[must_use]
    pub fn with_flatten(mut self, enabled: bool) -> Self {
        self.flatten_objects = enabled;
        self
    }

    /// Set the incremental flag
    #[must_use]
    pub fn with_incremental(mut self, incremental: bool) -> Self {
        self.incremental = incremental;
        self
    }

    /// Use a custom flattening separator
    #[must_use]
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }
}

/// Render one JSON value as a CSV cell
///
/// Strings are written raw, null as an empty cell, containers as compact JSON.
pub fn render_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Writer for one CSV table
pub struct ResultWriter {
    table: TableDefinition,
    options: WriterOptions,
    flatten: FlattenOptions,
    path: PathBuf,
    manifest_path: PathBuf,
    csv: Option<csv::Writer<File>>,
    /// Frozen header; `None` until discovered from the first batch
    header: Option<Vec<String>>,
    known: HashSet<String>,
    rows_written: u64,
    dropped_fields: BTreeSet<String>,
    closed: bool,
}

impl ResultWriter {
    /// Create `<out_dir>/<name>.csv` and prepare to append rows
    pub fn open(out_dir: &Path, table: TableDefinition, options: WriterOptions) -> Result<Self> {
        if options.fix_headers && table.columns.is_empty() {
            return Err(Error::output(format!(
                "Table '{}' has fixed headers but no columns",
                table.name
            )));
        }

        std::fs::create_dir_all(out_dir)?;
        let path = out_dir.join(table.file_name());
        let manifest_path = manifest_path_for(&path);

        let csv = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&path)?;

        let header = if table.columns.is_empty() {
            None
        } else {
            Some(table.columns.clone())
        };
        let known = header.iter().flatten().cloned().collect();
        let flatten = FlattenOptions::default().with_separator(options.separator.clone());

        debug!(table = %table.name, path = %path.display(), "Opened table writer");

        Ok(Self {
            table,
            options,
            flatten,
            path,
            manifest_path,
            csv: Some(csv),
            header,
            known,
            rows_written: 0,
            dropped_fields: BTreeSet::new(),
            closed: false,
        })
    }

    /// Table name
    pub fn name(&self) -> &str {
        &self.table.name
    }

    /// Header in effect, once known
    pub fn header(&self) -> Option<&[String]> {
        self.header.as_deref()
    }

    /// Rows written so far
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Fields that were not part of the header and got dropped
    pub fn dropped_fields(&self) -> &BTreeSet<String> {
        &self.dropped_fields
    }

    /// Write one record
    pub fn write(&mut self, record: &Value) -> Result<()> {
        self.write_all(std::slice::from_ref(record), true)
    }

    /// Write a batch of records
    ///
    /// Records are flattened when both the writer and `flatten_first` allow
    /// it; otherwise nested values land in a single JSON cell. Without a
    /// header yet, this batch decides it.
    pub fn write_all(&mut self, records: &[Value], flatten_first: bool) -> Result<()> {
        if self.closed {
            return Err(Error::output(format!(
                "Table '{}' is already closed",
                self.table.name
            )));
        }

        let flatten = self.options.flatten_objects && flatten_first;
        let rows: Vec<JsonObject> = records.iter().map(|r| self.to_row(r, flatten)).collect();

        if self.header.is_none() {
            let fields = rows.iter().flat_map(|row| row.keys().cloned());
            let header = order_header(fields, &self.table.primary_key);
            debug!(table = %self.table.name, columns = header.len(), "Discovered header");
            self.known = header.iter().cloned().collect();
            self.header = Some(header);
        }

        for row in &rows {
            self.write_row(row)?;
        }

        Ok(())
    }

    /// Flush rows and write the manifest
    pub fn close(mut self) -> Result<TableResult> {
        self.finish()
    }

    /// Close a set of writers, in order
    pub fn collect_results<I>(writers: I) -> Result<Vec<TableResult>>
    where
        I: IntoIterator<Item = ResultWriter>,
    {
        writers.into_iter().map(ResultWriter::close).collect()
    }

    fn to_row(&self, record: &Value, flatten: bool) -> JsonObject {
        match record {
            _ if flatten => flatten_with(record, &self.flatten),
            Value::Object(map) => map.clone(),
            other => {
                let mut row = JsonObject::new();
                row.insert(SCALAR_FIELD.to_string(), other.clone());
                row
            }
        }
    }

    fn write_row(&mut self, row: &JsonObject) -> Result<()> {
        for key in row.keys() {
            if !self.known.contains(key) && self.dropped_fields.insert(key.clone()) {
                debug!(table = %self.table.name, field = %key, "Dropping field not in header");
            }
        }

        let cells: Vec<String> = self
            .header
            .iter()
            .flatten()
            .map(|column| row.get(column).map(render_cell).unwrap_or_default())
            .collect();

        let csv = self
            .csv
            .as_mut()
            .ok_or_else(|| Error::output(format!("Table '{}' is already closed", self.table.name)))?;
        csv.write_record(&cells)?;
        self.rows_written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<TableResult> {
        self.closed = true;

        if let Some(mut csv) = self.csv.take() {
            csv.flush()?;
        }

        let columns = self.header.clone().unwrap_or_default();
        TableManifest {
            primary_key: self.table.primary_key.clone(),
            columns: Some(columns.clone()),
            incremental: self.options.incremental,
        }
        .write_to(&self.manifest_path)?;

        if !self.dropped_fields.is_empty() {
            warn!(
                table = %self.table.name,
                dropped = self.dropped_fields.len(),
                "Fields outside the table header were dropped"
            );
        }

        info!(
            table = %self.table.name,
            rows = self.rows_written,
            columns = columns.len(),
            "Table written"
        );

        Ok(TableResult {
            name: self.table.name.clone(),
            path: self.path.clone(),
            manifest_path: self.manifest_path.clone(),
            primary_key: self.table.primary_key.clone(),
            columns,
            rows_written: Some(self.rows_written),
            incremental: self.options.incremental,
        })
    }
}

impl Drop for ResultWriter {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(e) = self.finish() {
                error!(table = %self.table.name, error = %e, "Failed to finalize table");
            }
        }
    }
}

impl std::fmt::Debug for ResultWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultWriter")
            .field("table", &self.table.name)
            .field("path", &self.path)
            .field("rows_written", &self.rows_written)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}
