//! Table descriptors and manifests

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Shape of one output table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDefinition {
    /// Table name, also the file stem
    pub name: String,
    /// Unique key columns
    pub primary_key: Vec<String>,
    /// Declared columns; empty means discovered from data
    pub columns: Vec<String>,
}

impl TableDefinition {
    /// Create a table with no declared columns
    pub fn new<I, S>(name: impl Into<String>, primary_key: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            primary_key: primary_key.into_iter().map(Into::into).collect(),
            columns: Vec::new(),
        }
    }

    /// Declare the column set
    #[must_use]
    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// File name of the table's CSV
    pub fn file_name(&self) -> String {
        format!("{}.csv", self.name)
    }
}

/// Contents of a `.manifest` file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableManifest {
    pub primary_key: Vec<String>,
    /// Absent for files whose first line is their own header
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<String>>,
    pub incremental: bool,
}

impl TableManifest {
    /// Write the manifest as JSON
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(|e| {
            Error::output(format!("Failed to create manifest {}: {e}", path.display()))
        })?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    /// Read a manifest back
    pub fn read_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// A table produced by a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableResult {
    pub name: String,
    pub path: PathBuf,
    pub manifest_path: PathBuf,
    pub primary_key: Vec<String>,
    /// Final header; empty for externally produced files
    pub columns: Vec<String>,
    /// Rows written, when the file was written by this crate
    pub rows_written: Option<u64>,
    pub incremental: bool,
}

/// Manifest location for a data file
pub fn manifest_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".manifest");
    PathBuf::from(name)
}

/// Write a manifest for a CSV produced elsewhere (e.g. an export download)
///
/// The file carries its own header line, so no columns are listed.
pub fn write_file_manifest(
    path: &Path,
    primary_key: &[String],
    incremental: bool,
) -> Result<TableResult> {
    let manifest_path = manifest_path_for(path);
    TableManifest {
        primary_key: primary_key.to_vec(),
        columns: None,
        incremental,
    }
    .write_to(&manifest_path)?;

    let name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(TableResult {
        name,
        path: path.to_path_buf(),
        manifest_path,
        primary_key: primary_key.to_vec(),
        columns: Vec::new(),
        rows_written: None,
        incremental,
    })
}
