//! HTTP client module
//!
//! Provides the transport underneath the vendor client.
//!
//! # Features
//!
//! - **Automatic Retries**: 429/500/502/504 retried with exponential backoff
//! - **Rate Limiting**: Token bucket rate limiter using governor
//! - **Authentication**: Basic or Bearer credentials per request

mod client;
mod rate_limit;

pub use client::{HttpClient, HttpClientConfig, RequestConfig, DEFAULT_RETRY_STATUSES};
pub use rate_limit::{RateLimiter, RateLimiterConfig};
