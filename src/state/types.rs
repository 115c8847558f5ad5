//! Persisted extractor state
//!
//! Serialized to JSON and carried between runs.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// State document shared across runs
///
/// Headers only ever grow. Unknown keys in an older file are ignored and
/// missing keys default to empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractorState {
    /// Known columns per activity type
    #[serde(default)]
    pub activity_headers: BTreeMap<String, BTreeSet<String>>,

    /// Known columns across every message type
    #[serde(default)]
    pub message_headers: BTreeSet<String>,

    /// Latest continuation token per message type
    #[serde(default)]
    pub message_last_token: BTreeMap<String, String>,
}

impl ExtractorState {
    /// Create a new empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if nothing has been recorded yet
    pub fn is_empty(&self) -> bool {
        self.activity_headers.is_empty()
            && self.message_headers.is_empty()
            && self.message_last_token.is_empty()
    }

    /// Known header for an activity type
    pub fn activity_header(&self, activity_type: &str) -> Option<&BTreeSet<String>> {
        self.activity_headers.get(activity_type)
    }

    /// Grow the header of an activity type
    pub fn extend_activity_header<I>(&mut self, activity_type: &str, fields: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.activity_headers
            .entry(activity_type.to_string())
            .or_default()
            .extend(fields);
    }

    /// Grow the shared message header
    pub fn extend_message_header<I>(&mut self, fields: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.message_headers.extend(fields);
    }

    /// Resume token for a message type
    pub fn message_token(&self, message_type: &str) -> Option<&str> {
        self.message_last_token
            .get(message_type)
            .map(String::as_str)
            .filter(|token| !token.is_empty())
    }

    /// Record the resume token for a message type
    pub fn set_message_token(&mut self, message_type: &str, token: impl Into<String>) {
        self.message_last_token
            .insert(message_type.to_string(), token.into());
    }
}
