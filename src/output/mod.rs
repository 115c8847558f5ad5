//! Output module
//!
//! Writes extracted records as CSV tables.
//!
//! # Overview
//!
//! This module provides:
//! - A CSV writer with a frozen header per table
//! - Manifest files (`<name>.csv.manifest`) carrying columns and primary key
//! - Table descriptors for the tables written in a run

mod table;
mod writer;

pub use table::{
    manifest_path_for, write_file_manifest, TableDefinition, TableManifest, TableResult,
};
pub use writer::{render_cell, ResultWriter, WriterOptions};

#[cfg(test)]
mod tests;
