//! Customer.io API operations

use super::types::{ExportJob, PollConfig, DEFAULT_EXPORT_FILTER_FIELD};
use super::validate_response;
use crate::auth::AuthConfig;
use crate::error::{Error, Result};
use crate::http::{HttpClient, HttpClientConfig, RequestConfig};
use crate::pagination::{
    is_truthy, paginate, CursorPaginator, PageStream, PagedRequest, DEFAULT_PAGE_LIMIT,
};
use crate::types::{ApiVersion, JsonObject};
use futures::StreamExt;
use reqwest::Method;
use serde_json::{json, Value};
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use url::Url;

/// Client for the Customer.io REST API
#[derive(Debug)]
pub struct CustomerIoClient {
    http: HttpClient,
    poll: PollConfig,
    page_limit: u32,
}

impl CustomerIoClient {
    /// Wrap an already configured HTTP client
    pub fn new(http: HttpClient) -> Self {
        Self {
            http,
            poll: PollConfig::default(),
            page_limit: DEFAULT_PAGE_LIMIT,
        }
    }

    /// Build a client from credentials
    ///
    /// `base_url` overrides the default URL of `version`.
    pub fn from_credentials(
        version: ApiVersion,
        site_id: Option<&str>,
        api_secret: &str,
        base_url: Option<&str>,
    ) -> Result<Self> {
        let base_url = base_url.unwrap_or_else(|| version.default_base_url());
        let parsed = Url::parse(base_url)?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::invalid_value(
                "base_url",
                format!("unsupported scheme '{}'", parsed.scheme()),
            ));
        }

        let config = HttpClientConfig::builder().base_url(base_url).build();
        let auth = AuthConfig::for_api(version, site_id, api_secret);

        Ok(Self::new(HttpClient::with_auth(config, auth)?))
    }

    /// Override the export polling budget
    #[must_use]
    pub fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// Override the page size of cursor listings
    #[must_use]
    pub fn with_page_limit(mut self, limit: u32) -> Self {
        self.page_limit = limit;
        self
    }

    /// Underlying HTTP client
    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    /// Polling budget in use
    pub fn poll_config(&self) -> PollConfig {
        self.poll
    }

    // ------------------------------------------------------------------------
    // Exports
    // ------------------------------------------------------------------------

    /// Submit an export job for `resource` (e.g. `customers`)
    ///
    /// Without `filters` every object with an `id` is exported. Only a 429 is
    /// retried: the request was refused, so no job exists yet. Other failures
    /// and timeouts are returned at once, since the job may already exist.
    pub async fn submit_export(
        &self,
        filters: Option<Value>,
        resource: &str,
        extra_params: &JsonObject,
    ) -> Result<ExportJob> {
        let filters = filters.unwrap_or_else(|| {
            json!({"attribute": {"field": DEFAULT_EXPORT_FILTER_FIELD, "operator": "exists"}})
        });

        let mut payload = JsonObject::new();
        payload.insert("filters".to_string(), filters);
        for (key, value) in extra_params {
            payload.insert(key.clone(), value.clone());
        }

        let endpoint = format!("exports/{resource}");
        let url = self.http.build_url(&endpoint);
        let body: Value = self
            .http
            .request_json(
                Method::POST,
                &endpoint,
                RequestConfig::new()
                    .json(Value::Object(payload))
                    .retry_statuses([429])
                    .without_timeout_retry(),
            )
            .await?;
        validate_response(&url, &body)?;

        let job = body
            .get("export")
            .and_then(ExportJob::from_value)
            .ok_or_else(|| Error::record_extraction("export", "no export job in response"))?;

        info!(job_id = %job.id, resource, "Submitted export job");
        Ok(job)
    }

    /// Poll an export job until its download URL is available
    ///
    /// Waits the poll interval before every request. Vendor `errors` seen on
    /// the way are kept and reported if the budget runs out.
    pub async fn poll_export_until_ready(&self, job_id: &str) -> Result<String> {
        let endpoint = format!("exports/{job_id}/download");
        let mut last_errors: Option<String> = None;

        for attempt in 1..=self.poll.max_attempts {
            tokio::time::sleep(self.poll.interval).await;

            let body: Value = self.http.get_json(&endpoint).await?;

            if let Some(errors) = body.get("errors").filter(|e| is_truthy(e)) {
                warn!(job_id, attempt, errors = %errors, "Export poll reported errors");
                last_errors = Some(errors.to_string());
            }

            if let Some(url) = body
                .get("url")
                .and_then(Value::as_str)
                .filter(|url| !url.is_empty())
            {
                debug!(job_id, attempt, "Export ready");
                return Ok(url.to_string());
            }

            debug!(
                job_id,
                attempt,
                max_attempts = self.poll.max_attempts,
                "Export not ready yet"
            );
        }

        Err(Error::ExportTimeout {
            job_id: job_id.to_string(),
            attempts: self.poll.max_attempts,
            errors: last_errors.unwrap_or_else(|| "none".to_string()),
        })
    }

    /// Stream an export result to `destination`
    ///
    /// Pre-signed URLs reject credentials, so the request is sent without
    /// auth. The body is written as-is. Returns the number of bytes written.
    pub async fn download_export_result(
        &self,
        download_url: &str,
        destination: &Path,
    ) -> Result<u64> {
        let response = self
            .http
            .get_with_config(download_url, RequestConfig::new().without_auth())
            .await?;

        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = tokio::fs::File::create(destination).await?;
        let mut written = 0u64;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        info!(
            path = %destination.display(),
            bytes = written,
            "Downloaded export result"
        );
        Ok(written)
    }

    /// Submit, poll and download an export in one go
    pub async fn export_to_file(
        &self,
        filters: Option<Value>,
        resource: &str,
        extra_params: &JsonObject,
        destination: &Path,
    ) -> Result<ExportJob> {
        let mut job = self.submit_export(filters, resource, extra_params).await?;
        let url = match self.poll_export_until_ready(&job.id).await {
            Ok(url) => url,
            Err(e) => {
                job.mark_failed(e.to_string());
                warn!(job = ?job, "Export job failed");
                return Err(e);
            }
        };

        self.download_export_result(&url, destination).await?;
        job.mark_ready(url);
        Ok(job)
    }

    // ------------------------------------------------------------------------
    // Listings
    // ------------------------------------------------------------------------

    /// Lazily page through a cursor listing
    pub fn list_paged(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
        result_key: &str,
        cursor_field: &str,
        start: Option<String>,
    ) -> PageStream<'_> {
        let mut request = PagedRequest::new(endpoint, result_key)
            .paginator(CursorPaginator::new(cursor_field, self.page_limit))
            .start(start);
        for (key, value) in params {
            request = request.param(*key, value.clone());
        }
        paginate(&self.http, request)
    }

    /// Page through activities of one type
    pub fn get_activities(&self, activity_type: &str, include_deleted: bool) -> PageStream<'_> {
        self.list_paged(
            "activities",
            &[
                ("type", activity_type.to_string()),
                ("deleted", include_deleted.to_string()),
            ],
            "activities",
            "next",
            None,
        )
    }

    /// Page through messages of one type, resuming from `last_token`
    ///
    /// Each page's `next` is the token to persist for the following run.
    pub fn get_messages(&self, message_type: &str, last_token: Option<String>) -> PageStream<'_> {
        self.list_paged(
            "messages",
            &[("type", message_type.to_string())],
            "messages",
            "next",
            last_token,
        )
    }

    /// Fetch every campaign
    pub async fn get_campaigns(&self) -> Result<Vec<Value>> {
        self.get_list("campaigns", "campaigns").await
    }

    /// Fetch every segment
    pub async fn get_segments(&self) -> Result<Vec<Value>> {
        self.get_list("segments", "segments").await
    }

    async fn get_list(&self, endpoint: &str, result_key: &str) -> Result<Vec<Value>> {
        let url = self.http.build_url(endpoint);
        let mut body: Value = self.http.get_json(endpoint).await?;
        validate_response(&url, &body)?;

        match body.get_mut(result_key).map(Value::take) {
            Some(Value::Array(records)) => {
                debug!(endpoint, records = records.len(), "Fetched listing");
                Ok(records)
            }
            Some(Value::Null) => Ok(Vec::new()),
            Some(other) => Err(Error::record_extraction(
                result_key,
                format!("expected an array, got {other}"),
            )),
            None => Err(Error::record_extraction(result_key, "key missing from response")),
        }
    }
}
