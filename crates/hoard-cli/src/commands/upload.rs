//! `hoard upload` command implementation.
//!
//! Reads each file into memory and hands it to the file service. Directories
//! are walked recursively; hidden entries are skipped.

use hoard_core::error::{HoardError, HoardResult};
use hoard_service::UploadReceipt;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::warn;
use walkdir::WalkDir;

use super::{plural, CommandContext};
use crate::output::progress::ProgressBar;

/// Execute the `hoard upload` command
pub async fn execute(paths: Vec<PathBuf>, name: Option<String>, ctx: &CommandContext) -> HoardResult<()> {
    let start_time = Instant::now();
    let files = collect_files(&paths, &ctx.cwd)?;

    if files.is_empty() {
        return Err(HoardError::validation("path", "no files to upload"));
    }
    if name.is_some() && files.len() > 1 {
        return Err(HoardError::validation(
            "--name",
            "can only be used when uploading a single file",
        ));
    }

    let mut progress = (files.len() > 1).then(|| ProgressBar::new(files.len() as u64, "Uploading"));
    let mut receipts = Vec::with_capacity(files.len());

    for file in &files {
        let filename = match &name {
            Some(name) => name.clone(),
            None => file_name(file)?,
        };
        let receipt = upload_file(file, &filename, ctx).await?;
        if let Some(progress) = progress.as_mut() {
            progress.increment();
        }
        receipts.push(receipt);
    }

    if let Some(progress) = progress {
        progress.finish();
    }

    for receipt in &receipts {
        report(receipt, ctx);
    }

    let stored = receipts.iter().filter(|r| !r.already_existed).count();
    ctx.output.success(&format!(
        "Uploaded {} file{} ({} new blob{}) in {:.2}s",
        receipts.len(),
        plural(receipts.len(), "", "s"),
        stored,
        plural(stored, "", "s"),
        start_time.elapsed().as_secs_f64()
    ));
    Ok(())
}

async fn upload_file(path: &Path, filename: &str, ctx: &CommandContext) -> HoardResult<UploadReceipt> {
    let payload = tokio::fs::read(path)
        .await
        .map_err(|e| HoardError::io(format!("Failed to read {}", path.display()), e))?;
    ctx.service.upload(&payload, filename).await
}

fn report(receipt: &UploadReceipt, ctx: &CommandContext) {
    let note = if receipt.already_existed { " (deduplicated)" } else { "" };
    ctx.output
        .info(&format!("{}  {}{}", receipt.file_id, receipt.filename, note));
}

/// Expand the arguments into a sorted list of regular files
pub(crate) fn collect_files(paths: &[PathBuf], cwd: &Path) -> HoardResult<Vec<PathBuf>> {
    let mut files = Vec::new();

    for path in paths {
        let path = if path.is_relative() { cwd.join(path) } else { path.clone() };
        let metadata = std::fs::metadata(&path)
            .map_err(|e| HoardError::io(format!("Cannot access {}", path.display()), e))?;

        if metadata.is_file() {
            files.push(path);
            continue;
        }

        let mut found: Vec<PathBuf> = WalkDir::new(&path)
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry.file_name()))
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(error = %e, "skipping unreadable entry");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .collect();
        found.sort();
        files.extend(found);
    }

    Ok(files)
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().map(|name| name.starts_with('.')).unwrap_or(false)
}

fn file_name(path: &Path) -> HoardResult<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| {
            HoardError::validation("filename", format!("{} has no usable file name", path.display()))
        })
}
