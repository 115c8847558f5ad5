//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, RunPaths};
use crate::config::ExtractorConfig;
use crate::engine::{Extractor, RunOutcome};
use crate::error::{Result, ResultExt};
use crate::state::StateManager;
use tracing::{debug, info};

/// CLI runner
pub struct Runner {
    cli: Cli,
    paths: RunPaths,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        let paths = RunPaths::resolve(&cli);
        Self { cli, paths }
    }

    /// Resolved input and output locations
    pub fn paths(&self) -> &RunPaths {
        &self.paths
    }

    /// Whether debug logging was asked for, on the command line or in the config
    ///
    /// An unreadable config counts as "no"; the command itself reports it.
    pub fn wants_debug(&self) -> bool {
        self.cli.debug
            || ExtractorConfig::from_file(&self.paths.config).is_ok_and(|config| config.debug)
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match self.cli.command {
            Commands::Run => self.extract().await.map(|_| ()),
            Commands::Validate => self.validate(),
        }
    }

    /// Load and validate the configuration
    fn load_config(&self) -> Result<ExtractorConfig> {
        debug!(path = %self.paths.config.display(), "Loading configuration");
        let config = ExtractorConfig::from_file(&self.paths.config)?;
        config.validate()?;
        Ok(config)
    }

    /// Execute a full extraction and persist the state it returns
    ///
    /// The state file is written only after every resource succeeded.
    pub async fn extract(&self) -> Result<RunOutcome> {
        let config = self.load_config()?;
        let state_manager = StateManager::new(&self.paths.state_in, &self.paths.state_out);
        let state = state_manager.load().await?;

        let extractor = Extractor::from_config(config, &self.paths.tables_dir)?;
        let outcome = extractor.run(state).await?;

        state_manager
            .save(&outcome.state)
            .await
            .context("Extraction finished but state was not saved")?;

        for table in &outcome.tables {
            debug!(
                table = %table.name,
                path = %table.path.display(),
                rows = ?table.rows_written,
                "Registered output table"
            );
        }
        info!(
            tables = outcome.tables.len(),
            state = %state_manager.output_path().display(),
            "Run complete"
        );

        Ok(outcome)
    }

    /// Validate the configuration without touching the network
    fn validate(&self) -> Result<()> {
        let config = self.load_config()?;

        info!(
            customers = config.customers().is_some(),
            activity_types = config.activities().map_or(0, |a| a.distinct_types().len()),
            message_types = config.messages().map_or(0, |m| m.distinct_types().len()),
            campaigns = config.campaigns,
            segments = config.segments,
            "Configuration is valid"
        );

        Ok(())
    }
}
