// CLI subcommand dispatch.

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Subcommand;
use folio_engine::{DocumentStore, EngineConfig};

use crate::output::OutputFormat;

pub mod archive;
pub mod diff;
pub mod history;
pub mod restore;
pub mod status;
pub mod write;

/// Global flags shared by every subcommand.
pub struct Context {
    pub root: PathBuf,
    pub format: OutputFormat,
}

impl Context {
    /// Load layered config for the root and open the store with its SQLite index.
    pub fn open_store(&self) -> anyhow::Result<DocumentStore> {
        let config = EngineConfig::load(self.root.clone())
            .with_context(|| format!("failed to load configuration for `{}`", self.root.display()))?;
        DocumentStore::open(config)
            .with_context(|| format!("failed to open document store at `{}`", self.root.display()))
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Deduplicate and commit a piece of research content
    Write(write::WriteArgs),
    /// List revisions of a document, most recent first
    History(history::HistoryArgs),
    /// Show a unified diff between two revisions or a revision and the working file
    Diff(diff::DiffArgs),
    /// Make an earlier revision current again
    Restore(restore::RestoreArgs),
    /// Compare the working file with its latest revision
    Status(status::StatusArgs),
    /// Stop offering a document as a deduplication candidate
    Archive(archive::ArchiveArgs),
}

pub fn run(ctx: &Context, cmd: Command) -> anyhow::Result<()> {
    match cmd {
        Command::Write(args) => write::run(ctx, args),
        Command::History(args) => history::run(ctx, args),
        Command::Diff(args) => diff::run(ctx, args),
        Command::Restore(args) => restore::run(ctx, args),
        Command::Status(args) => status::run(ctx, args),
        Command::Archive(args) => archive::run(ctx, args),
    }
}
