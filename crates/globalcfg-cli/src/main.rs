//! globalcfg - global configuration reconciliation
//!
//! Drives the global configuration node over a snapshot file holding the
//! intent record, the state record and the worker table.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use globalcfg_core::NodeConfig;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod commands;
mod snapshot;

/// globalcfg - global configuration reconciliation
#[derive(Parser, Debug)]
#[command(name = "globalcfg")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to node configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a full reconciliation pass over a snapshot
    Reconcile {
        /// Snapshot file (TOML)
        snapshot: PathBuf,

        /// Save the reconciled records back into the snapshot
        #[arg(long)]
        write: bool,
    },

    /// Show the converged capability flags for a snapshot
    Features {
        /// Snapshot file (TOML)
        snapshot: PathBuf,
    },
}

fn load_config(path: Option<&Path>) -> Result<NodeConfig> {
    path.map_or_else(
        || Ok(NodeConfig::default()),
        |path| {
            NodeConfig::from_file(path)
                .with_context(|| format!("failed to load config {}", path.display()))
        },
    )
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    match cli.command {
        Commands::Reconcile { snapshot, write } => {
            let config = load_config(cli.config.as_deref())?;
            commands::reconcile::run(&config, &snapshot, write)
        },
        Commands::Features { snapshot } => commands::features::run(&snapshot),
    }
}
