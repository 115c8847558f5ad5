//! Record flattening

use crate::types::JsonObject;
use serde_json::Value;
use tracing::debug;

/// Separator placed between nested key segments
pub const DEFAULT_SEPARATOR: &str = "_";

/// Column holding a record that is not a JSON object
pub const SCALAR_FIELD: &str = "value";

/// Flattening options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlattenOptions {
    /// Separator between key segments
    pub separator: String,
    /// Objects nested deeper than this stay a single value
    pub max_depth: usize,
}

impl Default for FlattenOptions {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR.to_string(),
            max_depth: 10,
        }
    }
}

impl FlattenOptions {
    /// Use a custom separator
    #[must_use]
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Set maximum nesting depth
    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }
}

/// Flatten a record with the default options
pub fn flatten(record: &Value) -> JsonObject {
    flatten_with(record, &FlattenOptions::default())
}

/// Flatten a record into leaf paths
///
/// `{"data": {"url": "x"}}` becomes `{"data_url": "x"}`. Arrays are kept as
/// values, empty objects produce nothing, and a non-object record ends up
/// under [`SCALAR_FIELD`]. When two paths flatten to the same key the one
/// visited last wins.
pub fn flatten_with(record: &Value, options: &FlattenOptions) -> JsonObject {
    let mut out = JsonObject::new();

    match record {
        Value::Object(map) => {
            for (key, value) in map {
                flatten_into(&mut out, key.clone(), value, 1, options);
            }
        }
        other => {
            out.insert(SCALAR_FIELD.to_string(), other.clone());
        }
    }

    out
}

fn flatten_into(
    out: &mut JsonObject,
    path: String,
    value: &Value,
    depth: usize,
    options: &FlattenOptions,
) {
    match value {
        Value::Object(map) if depth < options.max_depth => {
            for (key, child) in map {
                let child_path = format!("{path}{}{key}", options.separator);
                flatten_into(out, child_path, child, depth + 1, options);
            }
        }
        _ => {
            if let Some(previous) = out.insert(path.clone(), value.clone()) {
                debug!(
                    field = %path,
                    %previous,
                    "Flattened field collides, keeping the later value"
                );
            }
        }
    }
}
