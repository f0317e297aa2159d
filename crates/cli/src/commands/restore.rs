// `folio restore`: make an earlier revision current again.

use anyhow::Context as _;
use clap::Args;
use folio_engine::DocumentStore;
use serde::Serialize;

use super::Context;
use crate::output;

#[derive(Debug, Args)]
pub struct RestoreArgs {
    /// Document path relative to the store root.
    pub path: String,

    /// Revision to restore (full handle or unique prefix).
    pub revision: String,

    /// Discard uncommitted working changes instead of committing them first.
    #[arg(long)]
    pub no_backup: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RestoreResult {
    pub path: String,
    pub restored: String,
    pub revision: String,
}

pub fn run(ctx: &Context, args: RestoreArgs) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let result = execute(&store, args)?;
    output::print_output(ctx.format, &result, |result| {
        format!("Restored {} to {} as {}", result.path, result.restored, short(&result.revision))
    })?;
    Ok(())
}

fn execute(store: &DocumentStore, args: RestoreArgs) -> anyhow::Result<RestoreResult> {
    let revision = store
        .restore(&args.path, &args.revision, !args.no_backup)
        .with_context(|| format!("failed to restore `{}` to `{}`", args.path, args.revision))?;
    Ok(RestoreResult { path: args.path, restored: args.revision, revision })
}

fn short(handle: &str) -> &str {
    &handle[..handle.len().min(12)]
}
