// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # Solidafy Customer.io Extractor
//!
//! Pulls customers, activities, messages, campaigns and segments out of the
//! Customer.io REST API and writes them as headerless CSV tables with JSON
//! manifests, ready for a warehouse loader.
//!
//! ## Features
//!
//! - **Export Jobs**: Submit, poll and download customer exports
//! - **Cursor Pagination**: Lazy page streams with resumable tokens
//! - **Schema Discovery**: Flatten nested records and grow headers across runs
//! - **Incremental Messages**: Persist the last cursor per message type
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use solidafy_customerio::{engine::Extractor, state::StateManager, ExtractorConfig, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = ExtractorConfig::from_file("/data/config.json")?;
//!     config.validate()?;
//!
//!     let state = StateManager::new("/data/in/state.json", "/data/out/state.json");
//!     let extractor = Extractor::from_config(config, "/data/out/tables")?;
//!
//!     let outcome = extractor.run(state.load().await?).await?;
//!     state.save(&outcome.state).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      Extractor (engine)                         │
//! │  customers → activities → messages → campaigns → segments       │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//! ┌──────────┬───────────┬───────┴───────┬───────────┬─────────────┐
//! │   Auth   │   HTTP    │   Client      │  Schema   │   Output    │
//! ├──────────┼───────────┼───────────────┼───────────┼─────────────┤
//! │ Basic    │ Retry     │ Export jobs   │ Flatten   │ CSV         │
//! │ Bearer   │ Rate Limit│ Cursor pages  │ Headers   │ Manifests   │
//! │          │ Backoff   │ Validation    │           │             │
//! └──────────┴───────────┴───────────────┴───────────┴─────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(missing_docs)] // TODO: Add docs before 1.0 release

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the extractor
pub mod error;

/// Common types and type aliases
pub mod types;

/// Authentication implementations
pub mod auth;

/// HTTP client with retry and rate limiting
pub mod http;

/// Cursor pagination and page streams
pub mod pagination;

/// Customer.io API client
pub mod client;

/// Record flattening and header accumulation
pub mod schema;

/// CSV table writers and manifests
pub mod output;

/// Persisted state between runs
pub mod state;

/// Extractor configuration
pub mod config;

/// Run orchestration
pub mod engine;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use client::CustomerIoClient;
pub use config::ExtractorConfig;
pub use engine::{Extractor, RunOutcome};
pub use state::{ExtractorState, StateManager};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
