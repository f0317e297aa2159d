// `folio archive`: retire a document from deduplication.

use anyhow::Context as _;
use clap::Args;
use serde::Serialize;

use super::Context;
use crate::output;

#[derive(Debug, Args)]
pub struct ArchiveArgs {
    /// Document path relative to the store root.
    pub path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArchiveResult {
    pub path: String,
    pub title: String,
    pub status: String,
}

pub fn run(ctx: &Context, args: ArchiveArgs) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let document =
        store.archive(&args.path).with_context(|| format!("failed to archive `{}`", args.path))?;
    let result = ArchiveResult {
        path: document.path,
        title: document.title,
        status: document.status.to_string(),
    };
    output::print_output(ctx.format, &result, |result| {
        format!("Archived {} ({})", result.path, result.title)
    })?;
    Ok(())
}
