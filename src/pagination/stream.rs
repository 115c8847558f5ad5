//! Lazy page stream
//!
//! Pages are fetched only when the consumer polls for the next one, so a
//! listing of unknown length is never buffered as a whole.

use super::cursor::CursorPaginator;
use super::types::PaginationState;
use crate::client::validate_response;
use crate::error::{Error, Result};
use crate::http::{HttpClient, RequestConfig};
use crate::types::StringMap;
use futures::stream::{self, BoxStream, StreamExt};
use serde_json::Value;
use tracing::debug;

/// One page of records from a listing endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// 1-based page number within this listing
    pub number: u32,
    /// Records found under the result key
    pub records: Vec<Value>,
    /// Cursor for the following page, `None` on the last page
    pub next: Option<String>,
}

impl Page {
    /// Number of records on this page
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the page carries no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Description of a paged listing
#[derive(Debug, Clone)]
pub struct PagedRequest {
    /// Endpoint path relative to the base URL
    pub endpoint: String,
    /// Fixed query parameters sent with every page
    pub params: StringMap,
    /// Response key holding the record list
    pub result_key: String,
    /// Cursor strategy
    pub paginator: CursorPaginator,
    /// Cursor to resume from
    pub start: Option<String>,
}

impl PagedRequest {
    /// Create a listing request for `endpoint`, reading records from `result_key`
    pub fn new(endpoint: impl Into<String>, result_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            params: StringMap::new(),
            result_key: result_key.into(),
            paginator: CursorPaginator::default(),
            start: None,
        }
    }

    /// Add a fixed query parameter
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Add several fixed query parameters
    #[must_use]
    pub fn params(mut self, params: StringMap) -> Self {
        self.params.extend(params);
        self
    }

    /// Use a custom cursor strategy (cursor field, page size)
    #[must_use]
    pub fn paginator(mut self, paginator: CursorPaginator) -> Self {
        self.paginator = paginator;
        self
    }

    /// Resume from a previously returned cursor
    #[must_use]
    pub fn start(mut self, cursor: Option<String>) -> Self {
        self.start = cursor;
        self
    }
}

/// Stream of pages, pulled one request at a time
pub type PageStream<'a> = BoxStream<'a, Result<Page>>;

/// Drive a cursor listing against `client`
///
/// The stream ends after yielding the page whose cursor field is absent or
/// falsy. Errors (transport, vendor `errors` payload, missing result key)
/// are yielded once and end the stream.
pub fn paginate(client: &HttpClient, request: PagedRequest) -> PageStream<'_> {
    let state = PaginationState::with_cursor(request.start.clone());

    stream::try_unfold((request, state), move |(request, mut state)| async move {
        if state.done {
            return Ok::<_, Error>(None);
        }

        let config = RequestConfig::new()
            .queries(&request.params)
            .queries(&request.paginator.query_params(&state));

        let url = client.build_url(&request.endpoint);
        let mut body: Value = client
            .get_json_with_config(&request.endpoint, config)
            .await?;
        validate_response(&url, &body)?;

        let records = take_records(&mut body, &request.result_key)?;
        let next = request.paginator.advance(&body, records.len(), &mut state);

        debug!(
            endpoint = %request.endpoint,
            page = state.pages,
            records = records.len(),
            more = next.is_some(),
            "Fetched page"
        );

        let page = Page {
            number: state.pages,
            records,
            next,
        };

        Ok::<_, Error>(Some((page, (request, state))))
    })
    .boxed()
}

/// Move the record list out of a response body
fn take_records(body: &mut Value, key: &str) -> Result<Vec<Value>> {
    match body.get_mut(key).map(Value::take) {
        Some(Value::Array(records)) => Ok(records),
        Some(Value::Null) => Ok(Vec::new()),
        Some(other) => Err(Error::record_extraction(
            key,
            format!("expected an array, got {other}"),
        )),
        None => Err(Error::record_extraction(key, "key missing from response")),
    }
}
