//! Command implementations and dispatch logic.
//!
//! This module contains all command handlers and the central dispatch system.
//! Each command is implemented as an async function that takes a CommandContext.

use camino::Utf8PathBuf;
use hoard_config::{ConfigLayering, ConfigLoader, ConfigSource, HoardToml};
use hoard_core::error::{HoardError, HoardResult};
use hoard_core::types::FileId;
use hoard_service::FileService;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub mod delete;
pub mod download;
pub mod purge;
pub mod upload;


use crate::{output::OutputHandler, Commands};

/// Shared context for all commands
pub struct CommandContext {
    pub cwd: PathBuf,
    pub output: OutputHandler,
    pub config: HoardToml,
    pub service: FileService,
}

impl CommandContext {
    /// Resolve configuration and open the file service
    pub async fn load(config_path: Option<&Path>, overrides: &[String]) -> HoardResult<Self> {
        let cwd = std::env::current_dir()
            .map_err(|e| HoardError::io("Failed to get current directory".to_string(), e))?;
        let loader = ConfigLoader::new(utf8(cwd.clone())?);

        let explicit = config_path.map(|path| utf8(path.to_path_buf())).transpose()?;
        let (file_config, source) = loader.load(explicit.as_deref()).await?;
        match &source {
            ConfigSource::Defaults => debug!("no hoard.toml found, using defaults"),
            other => debug!(source = ?other, "loaded configuration"),
        }

        let config = ConfigLayering::merge_configs(
            file_config,
            ConfigLayering::collect_env_overrides(),
            parse_overrides(overrides)?,
        )?;

        Self::with_config(cwd, config).await
    }

    /// Open the service for an already resolved configuration
    pub async fn with_config(cwd: PathBuf, config: HoardToml) -> HoardResult<Self> {
        let service = FileService::from_config(&config).await?;
        Ok(Self {
            cwd,
            output: OutputHandler::new(),
            config,
            service,
        })
    }
}

fn utf8(path: PathBuf) -> HoardResult<Utf8PathBuf> {
    Utf8PathBuf::from_path_buf(path).map_err(|path| {
        HoardError::validation("path", format!("{} is not valid UTF-8", path.display()))
    })
}

/// Split `KEY=VALUE` flags into an override map
pub fn parse_overrides(raw: &[String]) -> HoardResult<HashMap<String, String>> {
    raw.iter()
        .map(|entry| {
            entry
                .split_once('=')
                .map(|(key, value)| (key.trim().replace('-', "_"), value.trim().to_string()))
                .filter(|(key, _)| !key.is_empty())
                .ok_or_else(|| HoardError::validation("--set", format!("expected KEY=VALUE, got '{}'", entry)))
        })
        .collect()
}

/// Parse a file id argument
pub fn parse_file_id(raw: &str) -> HoardResult<FileId> {
    FileId::parse(raw)
}

/// Dispatch a command to its handler
pub async fn dispatch_command(command: Commands, ctx: &CommandContext) -> HoardResult<()> {
    match command {
        Commands::Upload { paths, name } => {
            info!("Uploading {} path(s)", paths.len());
            upload::execute(paths, name, ctx).await
        }
        Commands::Download {
            file_id,
            way,
            scope_type,
            owner_id,
            out,
        } => {
            info!("Downloading {} via {}", file_id, way);
            let request = hoard_service::DownloadRequest {
                way,
                scope_type,
                owner_id,
            };
            download::execute(&file_id, request, out, ctx).await
        }
        Commands::Stat { file_id, json } => {
            info!("Resolving {}", file_id);
            stat_file(&file_id, json, ctx).await
        }
        Commands::Delete { file_id } => {
            info!("Deleting {}", file_id);
            delete::execute(&file_id, ctx).await
        }
        Commands::Purge { yes } => {
            info!("Purging store (confirmed: {})", yes);
            purge::execute(yes, ctx).await
        }
        Commands::Sweep => {
            info!("Sweeping expired records");
            sweep_expired(ctx).await
        }
        Commands::Stats { json } => show_stats(json, ctx).await,
        Commands::Version => show_version(),
    }
}

/// Report a mistyped command, with a suggestion when one is close
pub fn unknown_command(name: &str) -> HoardResult<()> {
    let output = OutputHandler::new();
    output.error(&format!("Unknown command '{}'", name));
    if let Some(suggestion) = suggest_similar_command(name) {
        output.info(&format!("Did you mean '{}'?", suggestion));
    }
    output.info("");
    output.info("Run 'hoard --help' to see available commands.");
    Err(HoardError::validation("command", format!("Unknown command: {}", name)))
}

/// Show help information
pub fn show_help() {
    let output = OutputHandler::new();
    output.info("hoard - content-addressable file store");
    output.info("");
    output.info("Usage: hoard [COMMAND] [OPTIONS]");
    output.info("");
    output.info("Files:");
    output.info("  upload <path>...   Store files");
    output.info("  download <id>      Fetch a file (--way local|staging-area)");
    output.info("  stat <id>          Show the record behind an id");
    output.info("  delete <id>        Delete a file and everything sharing its blob");
    output.info("");
    output.info("Maintenance:");
    output.info("  purge --yes        Delete every blob and record");
    output.info("  sweep              Drop expired records");
    output.info("  stats              Show store statistics");
    output.info("  version            Show version information");
    output.info("");
    output.info("Run 'hoard <command> --help' for more information on a command.");
}

async fn stat_file(raw_id: &str, json: bool, ctx: &CommandContext) -> HoardResult<()> {
    let record = ctx.service.stat(&parse_file_id(raw_id)?).await?;

    if json {
        ctx.output.json(&record)?;
    } else {
        ctx.output.field("file id", record.file_id.as_str());
        ctx.output.field("filename", &record.filename);
        ctx.output.field("hash", &record.content_hash);
    }
    Ok(())
}

async fn sweep_expired(ctx: &CommandContext) -> HoardResult<()> {
    let removed = ctx.service.sweep_expired().await?;
    ctx.output
        .success(&format!("Removed {} expired record entr{}", removed, plural(removed, "y", "ies")));
    Ok(())
}

async fn show_stats(json: bool, ctx: &CommandContext) -> HoardResult<()> {
    let stats = ctx.service.stats().await?;

    if json {
        return ctx.output.json(&stats);
    }

    ctx.output.field("blob dir", stats.blob_dir.as_str());
    ctx.output.field("blobs", &stats.blob_count.to_string());
    ctx.output.field("filter items", &stats.filter.item_count.to_string());
    ctx.output.field("filter capacity", &stats.filter.capacity.to_string());
    ctx.output.field(
        "filter slots",
        &format!("{} ({} hashes)", stats.filter.slots, stats.filter.hash_count),
    );
    ctx.output.field(
        "false positives",
        &format!(
            "{:.4}% estimated, {:.4}% target",
            stats.filter.estimated_false_positive_rate * 100.0,
            stats.filter.error_rate * 100.0
        ),
    );
    ctx.output.field("retention", &format!("{} days", ctx.config.records.retention_days));
    Ok(())
}

pub fn show_version() -> HoardResult<()> {
    let output = OutputHandler::new();
    let target = format!("{}-{}", std::env::consts::ARCH, std::env::consts::OS);

    output.info(&format!("hoard v{}", env!("CARGO_PKG_VERSION")));
    output.info(&format!("Built: {}", env!("BUILD_DATE")));
    output.info(&format!("Target: {}", target));
    output.info(&format!("Rust: {}", env!("RUSTC_VERSION")));

    Ok(())
}

pub(crate) fn plural<'a>(count: usize, one: &'a str, many: &'a str) -> &'a str {
    if count == 1 {
        one
    } else {
        many
    }
}

/// Suggest similar commands based on edit distance
pub fn suggest_similar_command(input: &str) -> Option<String> {
    let commands = [
        "upload", "download", "stat", "delete", "purge", "sweep", "stats", "version", "help",
    ];

    let mut best_match = None;
    let mut best_distance = usize::MAX;

    for &command in &commands {
        let distance = edit_distance(input, command);
        if distance < best_distance && distance <= 2 {
            best_distance = distance;
            best_match = Some(command);
        }
    }

    best_match.map(|s| s.to_string())
}

/// Calculate edit distance between two strings
fn edit_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    if a_chars.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a_chars.len();
    }

    // Two rolling rows instead of the full matrix
    let mut previous: Vec<usize> = (0..=b_chars.len()).collect();
    let mut current = vec![0; b_chars.len() + 1];

    for (i, a_char) in a_chars.iter().enumerate() {
        current[0] = i + 1;
        for (j, b_char) in b_chars.iter().enumerate() {
            let cost = usize::from(a_char != b_char);
            current[j + 1] = (previous[j + 1] + 1)
                .min(current[j] + 1)
                .min(previous[j] + cost);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b_chars.len()]
}
