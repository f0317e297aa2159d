// `folio status`: compare a document's working file with its latest revision.

use anyhow::Context as _;
use clap::Args;
use folio_engine::{DocumentStore, WorkingState};
use serde::Serialize;

use super::Context;
use crate::output;

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Document path relative to the store root.
    pub path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusResult {
    pub path: String,
    pub state: WorkingState,
    pub uncommitted_changes: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head: Option<String>,
}

pub fn run(ctx: &Context, args: StatusArgs) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let result = execute(&store, args)?;
    output::print_output(ctx.format, &result, format_human)?;
    Ok(())
}

fn execute(store: &DocumentStore, args: StatusArgs) -> anyhow::Result<StatusResult> {
    let state = store
        .status(&args.path)
        .with_context(|| format!("failed to read status of `{}`", args.path))?;
    let head = store
        .history(&args.path, 1)?
        .into_iter()
        .next()
        .map(|revision| revision.short_handle().to_string());
    Ok(StatusResult {
        path: args.path,
        state,
        uncommitted_changes: state.has_uncommitted_changes(),
        head,
    })
}

fn format_human(result: &StatusResult) -> String {
    match (&result.head, result.state) {
        (_, WorkingState::Unknown) => format!("{}: not tracked", result.path),
        (Some(head), state) => format!("{}: {} (head {head})", result.path, state.as_str()),
        (None, state) => format!("{}: {}", result.path, state.as_str()),
    }
}
