//! CLI module
//!
//! Command-line interface for running the extractor.
//!
//! # Commands
//!
//! - `run` - Extract every configured resource and write the new state
//! - `validate` - Check the configuration without calling the API

mod commands;
mod runner;

pub use commands::{Cli, Commands, RunPaths};
pub use runner::Runner;
