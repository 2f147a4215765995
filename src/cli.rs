//! Command-line surface of the `georocket` binary.
//!
//! Only argument parsing and wiring live here; resolution and upload logic is
//! in [`crate::import`]. [`run`] is kept separate from `main` so integration
//! tests can drive a full invocation without spawning a process.
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::import::import;
use crate::load_config::{load_config, Overrides};
use crate::report::{BatchSummary, Reporter};

/// CLI for georocket: talk to a GeoRocket store.
#[derive(Parser, Debug)]
#[clap(name = "georocket", version, about = "Command-line client for GeoRocket")]
pub struct Cli {
    /// Path to an optional YAML config file
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,

    /// Host name of the GeoRocket server (overrides GEOROCKET_HOST)
    #[clap(long, global = true)]
    pub host: Option<String>,

    /// Port of the GeoRocket server (overrides GEOROCKET_PORT)
    #[clap(long, global = true)]
    pub port: Option<u16>,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Import one or more files into GeoRocket
    Import {
        /// Files or glob patterns to import
        #[clap(value_name = "FILE PATTERN")]
        patterns: Vec<String>,
    },
}

/// Runs the parsed command. Errors have already been reported through `reporter`
/// when this returns `Err`.
pub async fn run<R: Reporter + ?Sized>(cli: Cli, reporter: &R) -> Result<BatchSummary> {
    tracing::info!("trace_initialised");

    let overrides = Overrides {
        host: cli.host,
        port: cli.port,
    };
    let config = match load_config(cli.config.as_deref(), &overrides) {
        Ok(config) => config,
        Err(e) => {
            reporter.report_error(&e.to_string());
            return Err(e.into());
        }
    };

    match cli.command {
        Commands::Import { patterns } => {
            tracing::info!(command = "import", patterns = patterns.len(), "Starting import");
            match import(&patterns, &config, reporter).await {
                Ok(summary) => {
                    tracing::info!(command = "import", ?summary, "Import complete");
                    Ok(summary)
                }
                Err(e) => {
                    tracing::error!(command = "import", error = %e, "Import failed");
                    Err(e.into())
                }
            }
        }
    }
}
