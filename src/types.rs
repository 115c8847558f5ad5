//! Common types used throughout the extractor
//!
//! This module contains shared type definitions, type aliases,
//! and utility types used across multiple modules.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// JSON object type
pub type JsonObject = serde_json::Map<String, JsonValue>;

/// Generic key-value map with string keys and values
pub type StringMap = HashMap<String, String>;

// ============================================================================
// Resource Kind
// ============================================================================

/// Logical resource exposed by the vendor API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Customers,
    Activities,
    Campaigns,
    Segments,
    Messages,
}

impl ResourceKind {
    /// Name used in endpoints and log lines
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Customers => "customers",
            Self::Activities => "activities",
            Self::Campaigns => "campaigns",
            Self::Segments => "segments",
            Self::Messages => "messages",
        }
    }

    /// Declared unique key for output tables of this resource
    pub fn primary_key(&self) -> &'static [&'static str] {
        match self {
            Self::Messages => &["deduplicate_id"],
            _ => &["id"],
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Activity Mode
// ============================================================================

/// How activities are laid out in output tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityMode {
    /// All activity types share one table with an opaque `data` column
    SingleTable,
    /// One table per activity type, `data` flattened into columns
    #[default]
    ParsedData,
}

impl fmt::Display for ActivityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SingleTable => f.write_str("SINGLE_TABLE"),
            Self::ParsedData => f.write_str("PARSED_DATA"),
        }
    }
}

// ============================================================================
// API Version
// ============================================================================

/// Vendor API flavour, which also decides the auth scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiVersion {
    /// Beta API, basic auth with site id + API secret
    #[default]
    V1,
    /// App API, bearer auth with the app API key only
    App,
}

impl ApiVersion {
    /// Default base URL for this API flavour
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::V1 => "https://beta-api.customer.io/v1/api/",
            Self::App => "https://api.customer.io/v1/",
        }
    }
}

// ============================================================================
// Backoff Type
// ============================================================================

/// Type of backoff for retries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffType {
    /// Constant delay between retries
    Constant,
    /// Linear increase in delay
    Linear,
    /// Exponential increase in delay
    #[default]
    Exponential,
}

// ============================================================================
// Utilities
// ============================================================================

/// Turn an arbitrary label into something safe for a file/table name
pub fn sanitize_table_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
