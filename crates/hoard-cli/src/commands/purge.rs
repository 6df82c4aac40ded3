//! `hoard purge` command implementation.

use hoard_core::error::{HoardError, HoardResult};

use super::CommandContext;

/// Execute the `hoard purge` command
pub async fn execute(confirmed: bool, ctx: &CommandContext) -> HoardResult<()> {
    if !confirmed {
        ctx.output.warn("This deletes every stored file and record.");
        return Err(HoardError::validation("--yes", "purge needs explicit confirmation"));
    }

    ctx.output.step("Purging", ctx.service.stats().await?.blob_dir.as_str());
    let report = ctx.service.delete_all().await?;

    ctx.output.success(&format!(
        "Removed {} blobs and {} record keys",
        report.blobs_removed, report.record_keys_removed
    ));
    Ok(())
}
