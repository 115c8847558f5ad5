//! Cursor pagination
//!
//! The vendor returns an opaque `next` marker on every listing response;
//! the marker is sent back as `start` to get the following page. A missing
//! or falsy marker ends the listing.

use super::types::PaginationState;
use serde_json::Value;
use std::collections::HashMap;

/// Default `limit` sent with every listing request
pub const DEFAULT_PAGE_LIMIT: u32 = 10_000;

/// Cursor-based pagination
///
/// Common pattern: `?start=<cursor>&limit=10000`, answered with
/// `{"<records>": [...], "next": "<cursor>"}`.
#[derive(Debug, Clone)]
pub struct CursorPaginator {
    /// Query parameter carrying the cursor
    pub cursor_param: String,
    /// Response field holding the next cursor
    pub cursor_field: String,
    /// Query parameter carrying the page size
    pub limit_param: String,
    /// Page size
    pub limit: u32,
}

impl Default for CursorPaginator {
    fn default() -> Self {
        Self {
            cursor_param: "start".to_string(),
            cursor_field: "next".to_string(),
            limit_param: "limit".to_string(),
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl CursorPaginator {
    /// Create a paginator reading `cursor_field` with the given page size
    pub fn new(cursor_field: impl Into<String>, limit: u32) -> Self {
        Self {
            cursor_field: cursor_field.into(),
            limit,
            ..Default::default()
        }
    }

    /// Read the next cursor out of a response body
    pub fn extract_cursor(&self, body: &Value) -> Option<String> {
        let value = body.get(&self.cursor_field)?;
        if !is_truthy(value) {
            return None;
        }
        match value {
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Query parameters for the request at the current position
    pub fn query_params(&self, state: &PaginationState) -> HashMap<String, String> {
        let mut params = HashMap::new();
        params.insert(self.limit_param.clone(), self.limit.to_string());
        if let Some(cursor) = &state.cursor {
            params.insert(self.cursor_param.clone(), cursor.clone());
        }
        params
    }

    /// Record a fetched page and move to the next cursor
    ///
    /// Returns the cursor for the following page, or `None` once the listing
    /// is exhausted, in which case `state` is marked done.
    pub fn advance(
        &self,
        body: &Value,
        records_count: usize,
        state: &mut PaginationState,
    ) -> Option<String> {
        state.add_page(records_count as u64);

        match self.extract_cursor(body) {
            Some(cursor) => {
                state.set_cursor(cursor.clone());
                Some(cursor)
            }
            None => {
                state.mark_done();
                None
            }
        }
    }
}

/// Truthiness of a JSON value as the vendor's pagination treats it
///
/// `null`, `false`, `0`, `""`, `[]` and `{}` are all "no more pages".
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
