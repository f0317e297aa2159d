// `folio history`: list revisions of a document, most recent first.

use anyhow::Context as _;
use clap::Args;
use folio_engine::{DocumentStore, RevisionSummary};
use serde::Serialize;

use super::Context;
use crate::output;

#[derive(Debug, Args)]
pub struct HistoryArgs {
    /// Document path relative to the store root.
    pub path: String,

    /// Maximum number of revisions (defaults to `history_limit` from config).
    #[arg(short = 'n', long = "max-count")]
    pub max_count: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryResult {
    pub path: String,
    pub revisions: Vec<RevisionSummary>,
}

pub fn run(ctx: &Context, args: HistoryArgs) -> anyhow::Result<()> {
    let store = ctx.open_store()?;
    let result = execute(&store, &args)?;
    output::print_output(ctx.format, &result, format_human)?;
    Ok(())
}

fn execute(store: &DocumentStore, args: &HistoryArgs) -> anyhow::Result<HistoryResult> {
    let limit = args.max_count.unwrap_or(store.config().history_limit);
    let revisions = store
        .history(&args.path, limit)
        .with_context(|| format!("failed to read history of `{}`", args.path))?;
    Ok(HistoryResult { path: args.path.clone(), revisions })
}

fn format_human(result: &HistoryResult) -> String {
    if result.revisions.is_empty() {
        return format!("No revisions for {}.", result.path);
    }

    let mut lines = Vec::new();
    for revision in &result.revisions {
        let header = revision.message.lines().next().unwrap_or_default();
        lines.push(format!(
            "{}  {}  {}  {}",
            revision.short_handle(),
            revision.timestamp.format("%Y-%m-%d %H:%M:%S"),
            revision.author,
            header
        ));
        if let Some(report) = &revision.merge_report {
            if !report.conflicts.is_empty() {
                lines.push(format!(
                    "    {} conflict(s), strategy {}",
                    report.conflicts.len(),
                    report.strategy
                ));
            }
        }
    }
    lines.join("\n")
}
