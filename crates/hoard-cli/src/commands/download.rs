//! `hoard download` command implementation.

use hoard_core::error::{HoardError, HoardResult};
use hoard_service::{Download, DownloadRequest};
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;

use super::{parse_file_id, CommandContext};

/// Execute the `hoard download` command
pub async fn execute(
    raw_id: &str,
    request: DownloadRequest,
    out: Option<PathBuf>,
    ctx: &CommandContext,
) -> HoardResult<()> {
    let file_id = parse_file_id(raw_id)?;

    match ctx.service.download(&file_id, &request).await? {
        Download::Local { mut reader, filename } => {
            let target = match out {
                Some(path) if path.is_relative() => ctx.cwd.join(path),
                Some(path) => path,
                None => ctx.cwd.join(&filename),
            };

            let mut file = tokio::fs::File::create(&target)
                .await
                .map_err(|e| HoardError::io(format!("Failed to create {}", target.display()), e))?;
            let written = tokio::io::copy(&mut reader, &mut file)
                .await
                .map_err(|e| HoardError::io(format!("Failed to write {}", target.display()), e))?;
            file.flush()
                .await
                .map_err(|e| HoardError::io(format!("Failed to flush {}", target.display()), e))?;

            ctx.output.success(&format!(
                "Saved {} ({} bytes) to {}",
                filename,
                written,
                target.display()
            ));
        }
        Download::Staged {
            location,
            key,
            filename,
        } => {
            ctx.output.success(&format!("Staged {} as {}", filename, key));
            ctx.output.field("location", &location);
        }
    }

    Ok(())
}
