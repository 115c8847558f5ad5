//! Customer.io API client
//!
//! Vendor operations on top of the retrying [`HttpClient`](crate::http::HttpClient):
//! - Export jobs (submit, poll, download)
//! - Cursor-paged listings (activities, messages)
//! - Single-response listings (campaigns, segments)

mod api;
mod types;

pub use api::CustomerIoClient;
pub use types::{
    is_supported_activity_type, ExportJob, ExportStatus, PollConfig, CAMPAIGN_COLUMNS,
    DEFAULT_EXPORT_FILTER_FIELD, SINGLE_ACTIVITY_COLUMNS, SUPPORTED_ACTIVITY_TYPES,
};

use crate::error::{Error, Result};
use crate::pagination::is_truthy;
use serde_json::Value;

/// Fail when a response body carries a non-empty vendor `errors` field
///
/// The vendor reports some failures in a 200 response, so this runs on every
/// listing and submit body regardless of HTTP status.
pub fn validate_response(url: &str, body: &Value) -> Result<()> {
    match body.get("errors") {
        Some(errors) if is_truthy(errors) => Err(Error::api_response(url, errors.to_string())),
        _ => Ok(()),
    }
}
