//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Customer.io extractor CLI
#[derive(Parser, Debug)]
#[command(name = "solidafy-customerio")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Data directory holding config.json, in/ and out/
    #[arg(short, long, global = true, default_value = "/data")]
    pub data_dir: PathBuf,

    /// Configuration file (JSON or YAML), defaults to <data-dir>/config.json
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// State file of the previous run, defaults to <data-dir>/in/state.json
    #[arg(short, long, global = true)]
    pub state: Option<PathBuf>,

    /// State file to write, defaults to <data-dir>/out/state.json
    #[arg(long, global = true)]
    pub out_state: Option<PathBuf>,

    /// Output table directory, defaults to <data-dir>/out/tables
    #[arg(short, long, global = true)]
    pub tables_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Extract every configured resource
    Run,

    /// Validate the configuration without calling the API
    Validate,
}

/// Files and directories a run works with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPaths {
    pub config: PathBuf,
    pub state_in: PathBuf,
    pub state_out: PathBuf,
    pub tables_dir: PathBuf,
}

impl RunPaths {
    /// Resolve paths from the data directory and explicit overrides
    pub fn resolve(cli: &Cli) -> Self {
        let data = &cli.data_dir;
        Self {
            config: cli
                .config
                .clone()
                .unwrap_or_else(|| data.join("config.json")),
            state_in: cli
                .state
                .clone()
                .unwrap_or_else(|| data.join("in").join("state.json")),
            state_out: cli
                .out_state
                .clone()
                .unwrap_or_else(|| data.join("out").join("state.json")),
            tables_dir: cli
                .tables_dir
                .clone()
                .unwrap_or_else(|| data.join("out").join("tables")),
        }
    }
}
