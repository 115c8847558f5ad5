//! State management module
//!
//! Carries discovered headers and message resume tokens between runs.
//!
//! # Overview
//!
//! The state module provides:
//! - `ExtractorState` - The persisted document
//! - `StateManager` - File-based loading and atomic saving

mod manager;
mod types;

pub use manager::StateManager;
pub use types::ExtractorState;
