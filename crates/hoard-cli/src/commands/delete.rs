//! `hoard delete` command implementation.

use hoard_core::error::HoardResult;

use super::{parse_file_id, plural, CommandContext};

/// Execute the `hoard delete` command
pub async fn execute(raw_id: &str, ctx: &CommandContext) -> HoardResult<()> {
    let report = ctx.service.delete(&parse_file_id(raw_id)?).await?;

    if !report.blob_removed {
        ctx.output.warn("No blob was on disk for this file");
    }
    // Sharers go too, since there is only one copy of the content
    let others = report.records_removed.saturating_sub(1);
    if others > 0 {
        ctx.output.warn(&format!(
            "{} other file{} shared this content and {} deleted as well",
            others,
            plural(others, "", "s"),
            plural(others, "was", "were")
        ));
    }

    ctx.output.success(&format!("Deleted {}", report.file_id));
    Ok(())
}
