//! Export job and vendor constant types

use crate::types::JsonValue;
use chrono::{DateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::time::Duration;

/// Field used by the match-all export filter
pub const DEFAULT_EXPORT_FILTER_FIELD: &str = "id";

/// Fixed column set of the campaigns table
pub const CAMPAIGN_COLUMNS: [&str; 19] = [
    "id",
    "deduplicate_id",
    "name",
    "type",
    "created",
    "updated",
    "active",
    "state",
    "actions",
    "first_started",
    "created_by",
    "tags",
    "frequency",
    "date_attribute",
    "timezone",
    "use_customer_timezone",
    "start_hour",
    "start_minutes",
    "customer_id",
];

/// Envelope columns of the shared activity table
pub const SINGLE_ACTIVITY_COLUMNS: [&str; 7] = [
    "id",
    "customer_id",
    "type",
    "timestamp",
    "data",
    "delivery_id",
    "delivery_type",
];

/// Activity types accepted by the activities endpoint
pub static SUPPORTED_ACTIVITY_TYPES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "page",
        "event",
        "attribute_change",
        "failed_attribute_change",
        "stripe_event",
        "drafted_email",
        "failed_email",
        "dropped_email",
        "sent_email",
        "spammed_email",
        "bounced_email",
        "delivered_email",
        "triggered_email",
        "opened_email",
        "clicked_email",
        "converted_email",
        "unsubscribed_email",
        "attempted_email",
        "undeliverable_email",
        "device_change",
        "attempted_action",
        "drafted_action",
        "sent_action",
        "delivered_action",
        "bounced_action",
        "failed_action",
        "converted_action",
        "undeliverable_action",
        "opened_action",
        "secondary:dropped_email",
        "secondary:spammed_email",
        "secondary:bounced_email",
        "secondary:delivered_email",
        "secondary:opened_email",
        "secondary:clicked_email",
        "secondary:failed_email",
    ]
    .into_iter()
    .collect()
});

/// Check an activity type against the supported set
pub fn is_supported_activity_type(activity_type: &str) -> bool {
    SUPPORTED_ACTIVITY_TYPES.contains(activity_type)
}

/// Polling budget for export jobs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Delay before each poll
    pub interval: Duration,
    /// Number of polls before giving up
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_attempts: 20,
        }
    }
}

impl PollConfig {
    /// Create a poll config
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }
}

/// Lifecycle of an export job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportStatus {
    /// Submitted, result not yet available
    Pending,
    /// Result available at a pre-signed URL
    Ready { url: String },
    /// Poll budget exhausted
    Failed { errors: String },
}

impl ExportStatus {
    /// Check if the job reached a terminal state
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Download URL when ready
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Ready { url } => Some(url),
            _ => None,
        }
    }
}

/// A vendor-side export job
#[derive(Debug, Clone, PartialEq)]
pub struct ExportJob {
    /// Job id used in the download endpoint
    pub id: String,
    /// Free-text description returned by the vendor
    pub description: Option<String>,
    /// Current status
    pub status: ExportStatus,
    /// Creation time, when the vendor reports one
    pub created_at: Option<DateTime<Utc>>,
}

impl ExportJob {
    /// Create a pending job
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: None,
            status: ExportStatus::Pending,
            created_at: None,
        }
    }

    /// Parse the `export` object of a submit response
    ///
    /// The vendor sends numeric ids; they are kept as strings.
    pub fn from_value(export: &JsonValue) -> Option<Self> {
        let id = match export.get("id")? {
            JsonValue::String(id) if !id.is_empty() => id.clone(),
            JsonValue::Number(id) => id.to_string(),
            _ => return None,
        };

        let description = export
            .get("description")
            .and_then(JsonValue::as_str)
            .map(String::from);

        let created_at = export
            .get("created_at")
            .and_then(JsonValue::as_i64)
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single());

        Some(Self {
            id,
            description,
            status: ExportStatus::Pending,
            created_at,
        })
    }

    /// Record the download URL
    pub fn mark_ready(&mut self, url: impl Into<String>) {
        self.status = ExportStatus::Ready { url: url.into() };
    }

    /// Record a terminal failure
    pub fn mark_failed(&mut self, errors: impl Into<String>) {
        self.status = ExportStatus::Failed {
            errors: errors.into(),
        };
    }
}
