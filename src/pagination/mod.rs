//! Pagination module
//!
//! Cursor pagination for the vendor's listing endpoints and a lazy page
//! stream that a consumer pulls one page at a time.
//!
//! # Overview
//!
//! Listing endpoints accept `start=<cursor>` and `limit=<n>` and answer with a
//! `next` field while more pages remain. [`CursorPaginator`] turns a response
//! into the next request's parameters; [`paginate`] drives it against the
//! HTTP client and yields [`Page`]s until the cursor runs out.

mod cursor;
mod stream;
mod types;

pub use cursor::{is_truthy, CursorPaginator, DEFAULT_PAGE_LIMIT};
pub use stream::{paginate, Page, PageStream, PagedRequest};
pub use types::PaginationState;
