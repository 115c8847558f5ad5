//! Writer strategies for typed record streams
//!
//! Activities and messages arrive as pages tagged with a type. A sink either
//! funnels every type into one shared table or keeps one table per type whose
//! header is computed from persisted state and the type's first page.

use crate::client::SINGLE_ACTIVITY_COLUMNS;
use crate::error::Result;
use crate::output::{ResultWriter, TableDefinition, TableResult, WriterOptions};
use crate::schema::HeaderAccumulator;
use crate::state::ExtractorState;
use crate::types::{sanitize_table_name, ResourceKind};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the shared activity table
pub const SINGLE_ACTIVITY_TABLE: &str = "activities_all";

/// Which part of the state a per-type sink reads and grows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderScope {
    /// `activity_headers[type]`
    Activity,
    /// `message_headers`, shared by every message type
    Message,
}

impl HeaderScope {
    /// Output table for a type
    pub fn table_name(self, kind: &str) -> String {
        let prefix = match self {
            Self::Activity => "activity",
            Self::Message => "message",
        };
        format!("{prefix}_{}", sanitize_table_name(kind))
    }

    /// Resource whose primary key the tables use
    pub fn resource(self) -> ResourceKind {
        match self {
            Self::Activity => ResourceKind::Activities,
            Self::Message => ResourceKind::Messages,
        }
    }

    fn prior_header<'a>(
        self,
        state: &'a ExtractorState,
        kind: &str,
    ) -> Box<dyn Iterator<Item = String> + 'a> {
        match self {
            Self::Activity => Box::new(state.activity_header(kind).into_iter().flatten().cloned()),
            Self::Message => Box::new(state.message_headers.iter().cloned()),
        }
    }

    fn record_header(self, state: &mut ExtractorState, kind: &str, fields: Vec<String>) {
        match self {
            Self::Activity => state.extend_activity_header(kind, fields),
            Self::Message => state.extend_message_header(fields),
        }
    }
}

/// Where typed pages are written
#[derive(Debug)]
pub enum RecordSink {
    /// Every type in one table with a fixed envelope; `data` stays one JSON cell
    SingleTable { writer: ResultWriter },
    /// One table per type, header frozen at the type's first non-empty page
    PerType {
        out_dir: PathBuf,
        scope: HeaderScope,
        options: WriterOptions,
        writers: BTreeMap<String, ResultWriter>,
    },
}

impl RecordSink {
    /// Open the shared activity table
    pub fn single_table(out_dir: &Path, incremental: bool) -> Result<Self> {
        let table = TableDefinition::new(
            SINGLE_ACTIVITY_TABLE,
            ResourceKind::Activities.primary_key().iter().copied(),
        )
        .with_columns(SINGLE_ACTIVITY_COLUMNS);

        let options = WriterOptions::new()
            .fixed()
            .with_flatten(false)
            .with_incremental(incremental);

        Ok(Self::SingleTable {
            writer: ResultWriter::open(out_dir, table, options)?,
        })
    }

    /// Prepare one table per type; writers open lazily
    pub fn per_type(out_dir: &Path, scope: HeaderScope, incremental: bool) -> Self {
        Self::PerType {
            out_dir: out_dir.to_path_buf(),
            scope,
            options: WriterOptions::new().fixed().with_incremental(incremental),
            writers: BTreeMap::new(),
        }
    }

    /// Write one page of records of type `kind`
    ///
    /// For per-type tables the first non-empty page decides the header:
    /// prior state header plus every field on that page. The state is grown
    /// by the same fields.
    pub fn accept(
        &mut self,
        kind: &str,
        records: &[Value],
        state: &mut ExtractorState,
    ) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        match self {
            Self::SingleTable { writer } => writer.write_all(records, false),
            Self::PerType {
                out_dir,
                scope,
                options,
                writers,
            } => {
                if !writers.contains_key(kind) {
                    let writer = open_type_writer(out_dir, *scope, options, kind, records, state)?;
                    writers.insert(kind.to_string(), writer);
                }

                match writers.get_mut(kind) {
                    Some(writer) => writer.write_all(records, true),
                    None => Ok(()),
                }
            }
        }
    }

    /// Close the table of `kind`, if it is its own table
    pub fn finish_kind(&mut self, kind: &str) -> Result<Option<TableResult>> {
        match self {
            Self::SingleTable { .. } => Ok(None),
            Self::PerType { writers, .. } => {
                writers.remove(kind).map(ResultWriter::close).transpose()
            }
        }
    }

    /// Close everything still open
    pub fn finalize(self) -> Result<Vec<TableResult>> {
        match self {
            Self::SingleTable { writer } => Ok(vec![writer.close()?]),
            Self::PerType { writers, .. } => ResultWriter::collect_results(writers.into_values()),
        }
    }
}

fn open_type_writer(
    out_dir: &Path,
    scope: HeaderScope,
    options: &WriterOptions,
    kind: &str,
    first_page: &[Value],
    state: &mut ExtractorState,
) -> Result<ResultWriter> {
    let primary_key = scope.resource().primary_key();

    let mut observed = HeaderAccumulator::new(primary_key.iter().copied());
    observed.observe_all(first_page);
    let observed = observed.into_fields();

    let mut header = HeaderAccumulator::new(primary_key.iter().copied());
    header.extend_from(scope.prior_header(state, kind));
    header.extend_from(observed.iter().cloned());
    let columns = header.header();

    scope.record_header(state, kind, observed.into_iter().collect());

    debug!(kind, columns = columns.len(), "Computed table header");

    let table = TableDefinition::new(scope.table_name(kind), primary_key.iter().copied())
        .with_columns(columns);
    ResultWriter::open(out_dir, table, options.clone())
}
