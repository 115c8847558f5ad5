//! Engine types
//!
//! Run context, outcome, and statistics of an extraction run.

use crate::output::TableResult;
use crate::state::ExtractorState;

/// Mutable state of one run, passed explicitly through every step
#[derive(Debug, Default)]
pub struct RunContext {
    /// In-memory copy of the persisted state
    pub state: ExtractorState,
    /// Tables finalized so far
    pub tables: Vec<TableResult>,
    /// Counters
    pub stats: RunStats,
}

impl RunContext {
    /// Start a run from the previous state
    pub fn new(state: ExtractorState) -> Self {
        Self {
            state,
            tables: Vec::new(),
            stats: RunStats::default(),
        }
    }

    /// Register a finalized table
    pub fn add_table(&mut self, table: TableResult) {
        self.stats.add_table();
        self.tables.push(table);
    }

    /// Register several finalized tables
    pub fn add_tables(&mut self, tables: impl IntoIterator<Item = TableResult>) {
        for table in tables {
            self.add_table(table);
        }
    }

    /// Finish the run
    pub fn into_outcome(self) -> RunOutcome {
        RunOutcome {
            state: self.state,
            tables: self.tables,
            stats: self.stats,
        }
    }
}

/// Result of a successful run
#[derive(Debug)]
pub struct RunOutcome {
    /// State to persist for the next run
    pub state: ExtractorState,
    /// Tables written
    pub tables: Vec<TableResult>,
    /// Counters
    pub stats: RunStats,
}

impl RunOutcome {
    /// Find a written table by name
    pub fn table(&self, name: &str) -> Option<&TableResult> {
        self.tables.iter().find(|t| t.name == name)
    }
}

/// Statistics from an extraction run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Records handed to writers
    pub records_written: usize,
    /// Pages fetched from listings
    pub pages_fetched: usize,
    /// Tables finalized
    pub tables_written: usize,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl RunStats {
    /// Add records
    pub fn add_records(&mut self, count: usize) {
        self.records_written += count;
    }

    /// Add a page
    pub fn add_page(&mut self) {
        self.pages_fetched += 1;
    }

    /// Add a table
    pub fn add_table(&mut self) {
        self.tables_written += 1;
    }

    /// Set duration
    pub fn set_duration(&mut self, ms: u64) {
        self.duration_ms = ms;
    }
}
