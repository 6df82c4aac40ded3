//! # hoard-cli
//!
//! Command line front end for the hoard file store.
//!
//! This is the main entry point for the `hoard` binary. It handles command parsing,
//! sets up logging and error handling, and dispatches to the appropriate command handlers.

use clap::{Parser, Subcommand};
use hoard_core::error::{HoardError, HoardResult};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::CommandContext;
use output::errors::ErrorFormatter;

/// Content-addressable file store with deduplication
#[derive(Parser)]
#[command(name = "hoard", version, about = "Content-addressable file store")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Catches mistyped command names
    #[arg(value_name = "COMMAND", hide = true)]
    pub unknown: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Use this config file instead of searching for hoard.toml
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Override a config field, e.g. `--set scan_batch=50`
    #[arg(long = "set", global = true, value_name = "KEY=VALUE")]
    pub overrides: Vec<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Store files (directories are walked recursively)
    Upload {
        #[arg(required = true, value_name = "PATH")]
        paths: Vec<PathBuf>,
        /// Filename to record instead of the file's own name (single file only)
        #[arg(long)]
        name: Option<String>,
    },
    /// Fetch a stored file
    Download {
        #[arg(value_name = "FILE_ID")]
        file_id: String,
        /// Delivery path: local, staging-area or third-party
        #[arg(long, default_value = "local")]
        way: String,
        /// Archive scope for staging-area (user or room)
        #[arg(long = "type", value_name = "TYPE")]
        scope_type: Option<String>,
        /// Owner id for staging-area
        #[arg(long = "id", value_name = "ID")]
        owner_id: Option<String>,
        /// Where to write a local download (defaults to the stored filename)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Show the record behind a file id
    Stat {
        #[arg(value_name = "FILE_ID")]
        file_id: String,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a file, its blob and every file sharing the blob
    Delete {
        #[arg(value_name = "FILE_ID")]
        file_id: String,
    },
    /// Delete every blob and record
    Purge {
        /// Required confirmation
        #[arg(long)]
        yes: bool,
    },
    /// Drop expired records
    Sweep,
    /// Show store statistics
    Stats {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show version information
    Version,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_logging(cli.verbose);
    setup_panic_handler();

    debug!("Starting hoard v{}", env!("CARGO_PKG_VERSION"));

    match run_cli(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "command failed");
            eprintln!("{}", ErrorFormatter::new().format_error(&e));
            ExitCode::FAILURE
        }
    }
}

fn run_cli(cli: Cli) -> HoardResult<()> {
    // Create Tokio runtime for async operations
    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| HoardError::io("Failed to create async runtime".to_string(), e))?;

    rt.block_on(async {
        let Some(command) = cli.command else {
            return match cli.unknown {
                Some(name) => commands::unknown_command(&name),
                None => {
                    commands::show_help();
                    Ok(())
                }
            };
        };

        // Version needs no configuration or storage
        if let Commands::Version = command {
            return commands::show_version();
        }

        let ctx = CommandContext::load(cli.config.as_deref(), &cli.overrides).await?;
        commands::dispatch_command(command, &ctx).await
    })
}

fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };

    // HOARD_LOG takes a full filter directive and wins over --verbose
    let filter = EnvFilter::try_from_env("HOARD_LOG").unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "hoard={level},hoard_service={level},hoard_store={level},hoard_archive={level},hoard_config={level}"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|panic_info| {
        error!("hoard encountered an unexpected error: {}", panic_info);
        eprintln!("hoard crashed! This is a bug.");
        eprintln!("Please report this at: https://github.com/hoard-rs/hoard/issues");
        eprintln!("Error: {}", panic_info);
    }));
}
