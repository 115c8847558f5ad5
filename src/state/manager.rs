//! State manager implementation
//!
//! Provides file-based state loading and atomic writes.

use super::types::ExtractorState;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Loads the state of the previous run and persists the next one
#[derive(Debug, Clone)]
pub struct StateManager {
    /// State written by the previous run
    input: PathBuf,
    /// Where this run's state goes
    output: PathBuf,
}

impl StateManager {
    /// Read from `input`, write to `output`
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
        }
    }

    /// Read and write the same file
    pub fn single(path: impl AsRef<Path>) -> Self {
        Self::new(path.as_ref(), path.as_ref())
    }

    /// Parse a state document from inline JSON
    pub fn from_json(json: &str) -> Result<ExtractorState> {
        serde_json::from_str(json).map_err(|e| Error::State {
            message: format!("Failed to parse state JSON: {e}"),
        })
    }

    /// Load the previous state; a missing or blank file is an empty state
    pub async fn load(&self) -> Result<ExtractorState> {
        if !self.input.exists() {
            debug!(path = %self.input.display(), "No state file, starting empty");
            return Ok(ExtractorState::new());
        }

        let contents = tokio::fs::read_to_string(&self.input)
            .await
            .map_err(|e| Error::State {
                message: format!("Failed to read state file: {e}"),
            })?;

        if contents.trim().is_empty() {
            return Ok(ExtractorState::new());
        }

        let state = Self::from_json(&contents)?;
        info!(
            activity_types = state.activity_headers.len(),
            message_tokens = state.message_last_token.len(),
            "Loaded state"
        );
        Ok(state)
    }

    /// Save state, replacing the output file in one step
    pub async fn save(&self, state: &ExtractorState) -> Result<()> {
        let contents = serde_json::to_string_pretty(state).map_err(|e| Error::State {
            message: format!("Failed to serialize state: {e}"),
        })?;

        if let Some(parent) = self.output.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::State {
                    message: format!("Failed to create state directory: {e}"),
                })?;
        }

        // Write to temp file first, then rename for atomicity
        let temp_path = self.output.with_extension("tmp");
        tokio::fs::write(&temp_path, &contents)
            .await
            .map_err(|e| Error::State {
                message: format!("Failed to write state file: {e}"),
            })?;

        tokio::fs::rename(&temp_path, &self.output)
            .await
            .map_err(|e| Error::State {
                message: format!("Failed to rename state file: {e}"),
            })?;

        debug!(path = %self.output.display(), "Saved state");
        Ok(())
    }

    /// Path the previous state is read from
    pub fn input_path(&self) -> &Path {
        &self.input
    }

    /// Path the new state is written to
    pub fn output_path(&self) -> &Path {
        &self.output
    }
}
