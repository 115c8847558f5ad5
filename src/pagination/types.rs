//! Pagination state
//!
//! Position of a page stream within a listing.

/// Tracks pagination state during iteration
#[derive(Debug, Clone, Default)]
pub struct PaginationState {
    /// Pages fetched so far
    pub pages: u32,
    /// Current cursor value
    pub cursor: Option<String>,
    /// Total records fetched so far
    pub total_fetched: u64,
    /// Is pagination complete?
    pub done: bool,
}

impl PaginationState {
    /// Create a new pagination state
    pub fn new() -> Self {
        Self::default()
    }

    /// Create state that resumes from a known cursor
    pub fn with_cursor(cursor: Option<String>) -> Self {
        Self {
            cursor,
            ..Default::default()
        }
    }

    /// Mark pagination as complete
    pub fn mark_done(&mut self) {
        self.done = true;
    }

    /// Set cursor
    pub fn set_cursor(&mut self, cursor: String) {
        self.cursor = Some(cursor);
    }

    /// Count a fetched page and its records
    pub fn add_page(&mut self, records: u64) {
        self.pages += 1;
        self.total_fetched += records;
    }
}
