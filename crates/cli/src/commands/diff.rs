// `folio diff`: unified diff between revisions of a document.

use anyhow::Context as _;
use clap::Args;
use folio_engine::DocumentStore;
use serde::{Deserialize, Serialize};

use super::Context;
use crate::output;

#[derive(Debug, Args)]
pub struct DiffArgs {
    /// Document path relative to the store root.
    pub path: String,

    /// Base revision (full handle or unique prefix).
    pub from: String,

    /// Target revision; the working file when omitted.
    pub to: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffResult {
    pub path: String,
    pub from: String,
    #[serde(default)]
    pub to: Option<String>,
    pub patch: String,
}

pub fn run(ctx: &Context, args: DiffArgs) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let result = execute(&store, args)?;
    output::print_output(ctx.format, &result, format_human)?;
    Ok(())
}

fn execute(store: &DocumentStore, args: DiffArgs) -> anyhow::Result<DiffResult> {
    let patch = store
        .diff(&args.path, &args.from, args.to.as_deref())
        .with_context(|| format!("failed to diff `{}`", args.path))?;
    Ok(DiffResult { path: args.path, from: args.from, to: args.to, patch })
}

fn format_human(result: &DiffResult) -> String {
    if result.patch.is_empty() {
        return "No differences.".into();
    }
    result.patch.trim_end_matches('\n').to_string()
}
