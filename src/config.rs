//! Extractor configuration
//!
//! Loaded from a JSON or YAML file, either bare or wrapped as
//! `{"parameters": {...}}`, and validated before any network call.

use crate::client::is_supported_activity_type;
use crate::error::{Error, Result};
use crate::pagination::is_truthy;
use crate::types::{ActivityMode, ApiVersion, JsonObject};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use tracing::warn;

// ============================================================================
// Top-Level Config
// ============================================================================

/// Complete extractor configuration
#[derive(Clone, Default, Deserialize)]
pub struct ExtractorConfig {
    /// API secret (beta API) or app API key
    #[serde(rename = "#api_secret", alias = "api_secret", default)]
    pub api_secret: Option<String>,

    /// Site id, required by the beta API
    #[serde(default, deserialize_with = "string_or_number")]
    pub site_id: Option<String>,

    /// API flavour
    #[serde(default)]
    pub api_version: ApiVersion,

    /// Override for the API base URL
    #[serde(default)]
    pub base_url: Option<String>,

    /// Mark output tables for incremental loading
    #[serde(default)]
    pub incremental_output: bool,

    /// Extract campaigns
    #[serde(default, deserialize_with = "presence_flag")]
    pub campaigns: bool,

    /// Extract segments
    #[serde(default, deserialize_with = "presence_flag")]
    pub segments: bool,

    /// Customer export settings
    #[serde(default, deserialize_with = "blocks")]
    pub customers: Vec<CustomersConfig>,

    /// Activity extraction settings
    #[serde(default, deserialize_with = "blocks")]
    pub activities: Vec<ActivitiesConfig>,

    /// Message extraction settings
    #[serde(default, deserialize_with = "blocks")]
    pub messages: Vec<MessagesConfig>,

    /// Verbose logging
    #[serde(default)]
    pub debug: bool,
}

// ============================================================================
// Resource Blocks
// ============================================================================

/// Customer export settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomersConfig {
    /// Export filter, as a JSON object or a JSON-encoded string
    #[serde(default)]
    pub filters: Option<Value>,

    /// Attributes to include in the export
    #[serde(default)]
    pub attributes: Option<Vec<String>>,
}

impl CustomersConfig {
    /// Parsed export filter; `None` exports everything
    pub fn filters(&self) -> Result<Option<Value>> {
        match &self.filters {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(raw)) if raw.trim().is_empty() => Ok(None),
            Some(Value::String(raw)) => {
                let parsed: Value = serde_json::from_str(raw).map_err(|e| {
                    Error::invalid_value("customers.filters", format!("not valid JSON: {e}"))
                })?;
                if parsed.is_object() {
                    Ok(Some(parsed))
                } else {
                    Err(Error::invalid_value(
                        "customers.filters",
                        "must be a JSON object",
                    ))
                }
            }
            Some(value @ Value::Object(_)) => Ok(Some(value.clone())),
            Some(_) => Err(Error::invalid_value(
                "customers.filters",
                "must be a JSON object",
            )),
        }
    }

    /// Additional fields sent with the export request
    pub fn extra_params(&self) -> JsonObject {
        let mut params = JsonObject::new();
        if let Some(attributes) = self.attributes.as_ref().filter(|a| !a.is_empty()) {
            params.insert("attributes".to_string(), Value::from(attributes.clone()));
        }
        params
    }
}

/// Activity extraction settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivitiesConfig {
    /// Activity types, processed in order
    #[serde(default)]
    pub types: Vec<String>,

    /// Table layout
    #[serde(default)]
    pub mode: Option<ActivityMode>,

    /// Include activities of deleted customers
    #[serde(default)]
    pub deleted: bool,
}

impl ActivitiesConfig {
    /// Table layout; validated to be present
    pub fn mode(&self) -> ActivityMode {
        self.mode.unwrap_or_default()
    }

    /// Configured types with repeats removed, first occurrence wins
    pub fn distinct_types(&self) -> Vec<&str> {
        dedup_types(&self.types)
    }
}

/// Message extraction settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessagesConfig {
    /// Message types, processed in order
    #[serde(default)]
    pub types: Vec<String>,

    /// Resume from the token saved by the previous run
    #[serde(default)]
    pub incremental: bool,
}

impl MessagesConfig {
    /// Configured types with repeats removed, first occurrence wins
    pub fn distinct_types(&self) -> Vec<&str> {
        dedup_types(&self.types)
    }
}

fn dedup_types(types: &[String]) -> Vec<&str> {
    let mut seen = HashSet::new();
    types
        .iter()
        .map(String::as_str)
        .filter(|t| seen.insert(*t))
        .collect()
}

// ============================================================================
// Loading
// ============================================================================

impl ExtractorConfig {
    /// Load configuration from a file (`.yaml`/`.yml` as YAML, anything else as JSON)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

        if is_yaml {
            Self::from_yaml_str(&content)
        } else {
            Self::from_json_str(&content)
        }
    }

    /// Parse configuration from JSON
    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Parse configuration from YAML
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let value: Value = serde_yaml::from_str(yaml)?;
        Self::from_value(value)
    }

    /// Build from an already parsed document, unwrapping `parameters`
    pub fn from_value(value: Value) -> Result<Self> {
        let value = match value {
            Value::Object(mut map) if map.get("parameters").is_some_and(Value::is_object) => {
                map.remove("parameters").unwrap_or_default()
            }
            other => other,
        };

        serde_json::from_value(value)
            .map_err(|e| Error::config(format!("Failed to parse configuration: {e}")))
    }

    // ------------------------------------------------------------------------
    // Validation
    // ------------------------------------------------------------------------

    /// Check required fields and option values
    pub fn validate(&self) -> Result<()> {
        if self.api_secret().is_none() {
            return Err(Error::missing_field("#api_secret"));
        }

        if self.api_version == ApiVersion::V1 && self.site_id().is_none() {
            return Err(Error::missing_field("site_id"));
        }

        if let Some(base_url) = &self.base_url {
            url::Url::parse(base_url)
                .map_err(|e| Error::invalid_value("base_url", e.to_string()))?;
        }

        if let Some(customers) = self.customers() {
            customers.filters()?;
        }

        if let Some(activities) = self.activities() {
            if activities.types.is_empty() {
                return Err(Error::missing_field("activities.types"));
            }
            if activities.mode.is_none() {
                return Err(Error::missing_field("activities.mode"));
            }

            let unsupported: Vec<String> = activities
                .types
                .iter()
                .filter(|t| !is_supported_activity_type(t))
                .cloned()
                .collect();
            if !unsupported.is_empty() {
                return Err(Error::UnsupportedActivityType { types: unsupported });
            }

            let distinct = activities.distinct_types().len();
            if distinct < activities.types.len() {
                warn!(
                    configured = activities.types.len(),
                    distinct, "Repeated activity types are extracted once"
                );
            }
        }

        if let Some(messages) = self.messages() {
            if messages.types.is_empty() {
                return Err(Error::missing_field("messages.types"));
            }

            let distinct = messages.distinct_types().len();
            if distinct < messages.types.len() {
                warn!(
                    configured = messages.types.len(),
                    distinct, "Repeated message types are extracted once"
                );
            }
        }

        for (key, count) in [
            ("customers", self.customers.len()),
            ("activities", self.activities.len()),
            ("messages", self.messages.len()),
        ] {
            if count > 1 {
                warn!(key, count, "Only the first configuration block is used");
            }
        }

        Ok(())
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    /// API secret, if set and non-empty
    pub fn api_secret(&self) -> Option<&str> {
        self.api_secret.as_deref().filter(|s| !s.is_empty())
    }

    /// Site id, if set and non-empty
    pub fn site_id(&self) -> Option<&str> {
        self.site_id.as_deref().filter(|s| !s.is_empty())
    }

    /// Customer export block, when configured
    pub fn customers(&self) -> Option<&CustomersConfig> {
        self.customers.first()
    }

    /// Activities block, when configured
    pub fn activities(&self) -> Option<&ActivitiesConfig> {
        self.activities.first()
    }

    /// Messages block, when configured
    pub fn messages(&self) -> Option<&MessagesConfig> {
        self.messages.first()
    }

    /// Check whether any resource is selected
    pub fn has_resources(&self) -> bool {
        self.campaigns
            || self.segments
            || !self.customers.is_empty()
            || !self.activities.is_empty()
            || !self.messages.is_empty()
    }
}

impl fmt::Debug for ExtractorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractorConfig")
            .field("api_secret", &self.api_secret.as_ref().map(|_| "***"))
            .field("site_id", &self.site_id)
            .field("api_version", &self.api_version)
            .field("base_url", &self.base_url)
            .field("incremental_output", &self.incremental_output)
            .field("campaigns", &self.campaigns)
            .field("segments", &self.segments)
            .field("customers", &self.customers)
            .field("activities", &self.activities)
            .field("messages", &self.messages)
            .field("debug", &self.debug)
            .finish()
    }
}

// ============================================================================
// Deserializers
// ============================================================================

/// Any truthy value (true, non-empty list/object/string, non-zero) selects a resource
fn presence_flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(is_truthy(&value))
}

/// A list of blocks, a single block, or `true` for one default block
fn blocks<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    match Value::deserialize(deserializer)? {
        Value::Null | Value::Bool(false) => Ok(Vec::new()),
        Value::Bool(true) => Ok(vec![T::default()]),
        Value::Array(items) => items
            .into_iter()
            .map(|item| serde_json::from_value(item).map_err(serde::de::Error::custom))
            .collect(),
        value @ Value::Object(_) => serde_json::from_value(value)
            .map(|block| vec![block])
            .map_err(serde::de::Error::custom),
        other => Err(serde::de::Error::custom(format!(
            "expected a list of blocks, got {other}"
        ))),
    }
}

/// Site ids are sometimes entered as numbers
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(serde::de::Error::custom(format!(
            "expected a string, got {other}"
        ))),
    }
}
