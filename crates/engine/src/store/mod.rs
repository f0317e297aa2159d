// Versioned document store.
//
// Layout under the store root:
//   <path>                                  working copy of each document
//   .folio/objects/<hh>/<sha256>            content blobs
//   .folio/history/<sha256(path)>.jsonl     append-only revision log per path
//
// Every mutation commits exactly one revision. Commit order is blob, working
// file, then log line; if the log append fails the working file is rolled
// back, so a revision is observable only once fully written.

mod blob;
mod locks;
mod revision;

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use folio_common::diff::unified_diff;
use folio_common::path::normalize::STATE_DIR_NAME;
use folio_common::path::resolve_within;
use folio_common::section::parse_sections;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::RevisionStoreError;
use crate::merge::MergeReport;
use crate::message::CommitMessage;

pub use blob::sha256_hex;
pub use revision::RevisionRecord;

use blob::{write_atomic, BlobStore};
use locks::PathLocks;
use revision::{HistoryLog, LoadedHistory};

/// Shortest revision prefix accepted by `diff` and `restore`.
pub const MIN_HANDLE_PREFIX: usize = 4;
/// Length of handles in human-facing labels.
pub const SHORT_HANDLE_LEN: usize = 12;

/// A revision as listed by `history`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RevisionSummary {
    pub handle: String,
    pub parent: Option<String>,
    /// `create`, `update`, `merge`, `restore` or `backup`.
    pub kind: Option<String>,
    pub title: Option<String>,
    pub message: String,
    pub author: String,
    pub timestamp: DateTime<Utc>,
    pub merge_report: Option<MergeReport>,
}

impl RevisionSummary {
    fn from_record(record: &RevisionRecord) -> Self {
        let parsed = CommitMessage::parse(&record.message).ok();
        Self {
            handle: record.handle.clone(),
            parent: record.parent.clone(),
            kind: parsed.as_ref().map(|message| message.kind().to_string()),
            title: parsed.as_ref().map(|message| message.title().to_string()),
            message: record.message.clone(),
            author: record.author.clone(),
            timestamp: record.timestamp,
            merge_report: record.merge_report.clone(),
        }
    }

    pub fn short_handle(&self) -> &str {
        short(&self.handle)
    }
}

/// Working copy compared with the latest revision.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WorkingState {
    /// Working content equals the latest revision.
    Clean,
    /// Working content differs from the latest revision.
    Modified,
    /// A file exists but has never been committed.
    Untracked,
    /// Revisions exist but the working file is gone.
    Missing,
    /// Neither a file nor any revision.
    Unknown,
}

impl WorkingState {
    pub fn has_uncommitted_changes(self) -> bool {
        matches!(self, Self::Modified | Self::Untracked | Self::Missing)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Clean => "clean",
            Self::Modified => "modified",
            Self::Untracked => "untracked",
            Self::Missing => "missing",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug)]
pub struct RevisionStore {
    root: PathBuf,
    blobs: BlobStore,
    log: HistoryLog,
    locks: PathLocks,
}

/// A document path whose writer lock is held.
///
/// Obtained from [`RevisionStore::with_path_lock`]; everything done through
/// it is atomic with respect to other writers of the same path.
pub struct LockedPath<'a> {
    store: &'a RevisionStore,
    relative: String,
    absolute: PathBuf,
}

impl RevisionStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, RevisionStoreError> {
        let root = root.into();
        let state_dir = root.join(STATE_DIR_NAME);
        fs::create_dir_all(&state_dir).map_err(|error| RevisionStoreError::io(&state_dir, error))?;
        Ok(Self {
            blobs: BlobStore::new(state_dir.join("objects")),
            log: HistoryLog::new(state_dir.join("history")),
            locks: PathLocks::new(),
            root,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Normalize `path` and check it stays under the root. Performs no I/O.
    pub fn resolve(&self, path: &str) -> Result<(String, PathBuf), RevisionStoreError> {
        resolve_within(&self.root, path)
            .map_err(|error| RevisionStoreError::from_path_error(path, error))
    }

    /// Run `f` with the writer lock for `path` held.
    pub fn with_path_lock<T, E>(
        &self,
        path: &str,
        f: impl FnOnce(&LockedPath<'_>) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<RevisionStoreError>,
    {
        let (relative, absolute) = self.resolve(path)?;
        let locked = LockedPath { store: self, relative, absolute };
        self.locks.with_lock(&locked.relative, || f(&locked))
    }

    pub fn commit(
        &self,
        path: &str,
        content: &str,
        message: &CommitMessage,
        author: &str,
    ) -> Result<String, RevisionStoreError> {
        self.with_path_lock(path, |locked| locked.commit(content, message, author, None))
    }

    /// Most recent first, at most `max_count` entries.
    pub fn history(
        &self,
        path: &str,
        max_count: usize,
    ) -> Result<Vec<RevisionSummary>, RevisionStoreError> {
        let (relative, _) = self.resolve(path)?;
        let loaded = self.log.load(&relative)?;
        Ok(loaded.records.iter().rev().take(max_count).map(RevisionSummary::from_record).collect())
    }

    /// Unified diff from revision `a` to revision `b`, or to the working
    /// content when `b` is `None`. Empty when the contents are equal.
    pub fn diff(
        &self,
        path: &str,
        a: &str,
        b: Option<&str>,
    ) -> Result<String, RevisionStoreError> {
        let (relative, absolute) = self.resolve(path)?;
        let loaded = self.log.load(&relative)?;

        let from = find_revision(&loaded, &relative, a)?;
        let old = self.blobs.get(&from.blob)?;
        let old_label = format!("a/{relative}@{}", short(&from.handle));

        let (new, new_label) = match b {
            Some(handle) => {
                let to = find_revision(&loaded, &relative, handle)?;
                (self.blobs.get(&to.blob)?, format!("b/{relative}@{}", short(&to.handle)))
            }
            None => {
                (read_working(&absolute)?.unwrap_or_default(), format!("b/{relative} (working)"))
            }
        };

        Ok(unified_diff(&old, &new, &old_label, &new_label))
    }

    /// Make the content of `handle` current again as a new revision.
    ///
    /// With `backup`, the working content is first committed under a
    /// `Backup before restore` message when it differs from the latest revision.
    pub fn restore(
        &self,
        path: &str,
        handle: &str,
        backup: bool,
        author: &str,
    ) -> Result<String, RevisionStoreError> {
        self.with_path_lock(path, |locked| locked.restore(handle, backup, author))
    }

    pub fn status(&self, path: &str) -> Result<WorkingState, RevisionStoreError> {
        let (relative, absolute) = self.resolve(path)?;
        let loaded = self.log.load(&relative)?;
        let working = read_working(&absolute)?;

        Ok(match (loaded.head(), working) {
            (None, None) => WorkingState::Unknown,
            (None, Some(_)) => WorkingState::Untracked,
            (Some(_), None) => WorkingState::Missing,
            (Some(head), Some(content)) => {
                if sha256_hex(content.as_bytes()) == head.blob {
                    WorkingState::Clean
                } else {
                    WorkingState::Modified
                }
            }
        })
    }

    pub fn has_uncommitted_changes(&self, path: &str) -> Result<bool, RevisionStoreError> {
        Ok(self.status(path)?.has_uncommitted_changes())
    }

    /// Content of a revision, addressed by full handle or unique prefix.
    pub fn read_revision(&self, path: &str, handle: &str) -> Result<String, RevisionStoreError> {
        let (relative, _) = self.resolve(path)?;
        let loaded = self.log.load(&relative)?;
        let record = find_revision(&loaded, &relative, handle)?;
        self.blobs.get(&record.blob)
    }

    /// Working content, `None` when the file does not exist.
    pub fn current_content(&self, path: &str) -> Result<Option<String>, RevisionStoreError> {
        let (_, absolute) = self.resolve(path)?;
        read_working(&absolute)
    }

    /// True when `path` has a working file or any revision.
    pub fn exists(&self, path: &str) -> Result<bool, RevisionStoreError> {
        let (relative, absolute) = self.resolve(path)?;
        Ok(absolute.exists() || self.log.file_for(&relative).exists())
    }
}

impl LockedPath<'_> {
    pub fn relative(&self) -> &str {
        &self.relative
    }

    pub fn head(&self) -> Result<Option<RevisionRecord>, RevisionStoreError> {
        Ok(self.store.log.load(&self.relative)?.records.pop())
    }

    pub fn current_content(&self) -> Result<Option<String>, RevisionStoreError> {
        read_working(&self.absolute)
    }

    pub fn commit(
        &self,
        content: &str,
        message: &CommitMessage,
        author: &str,
        merge_report: Option<&MergeReport>,
    ) -> Result<String, RevisionStoreError> {
        let loaded = self.store.log.load(&self.relative)?;
        self.commit_onto(&loaded, content, message, author, merge_report)
    }

    fn commit_onto(
        &self,
        loaded: &LoadedHistory,
        content: &str,
        message: &CommitMessage,
        author: &str,
        merge_report: Option<&MergeReport>,
    ) -> Result<String, RevisionStoreError> {
        let parent = loaded.head().map(|head| head.handle.clone());
        let blob = self.store.blobs.put(content)?;
        let message = message.render();
        let timestamp = Utc::now();
        let handle = RevisionRecord::compute_handle(
            parent.as_deref(),
            &self.relative,
            &blob,
            &message,
            author,
            timestamp,
        );
        let record = RevisionRecord {
            handle: handle.clone(),
            parent,
            path: self.relative.clone(),
            blob,
            message,
            author: author.to_string(),
            timestamp,
            merge_report: merge_report.cloned(),
        };

        let previous = read_working(&self.absolute)?;
        if let Some(parent_dir) = self.absolute.parent() {
            fs::create_dir_all(parent_dir)
                .map_err(|error| RevisionStoreError::io(parent_dir, error))?;
        }
        write_atomic(&self.absolute, content.as_bytes())?;

        if let Err(error) = self.store.log.append(loaded, &record) {
            if let Err(rollback_error) = restore_working(&self.absolute, previous.as_deref()) {
                warn!(
                    path = %self.relative,
                    error = %rollback_error,
                    "working file rollback failed; it now holds uncommitted content"
                );
            }
            return Err(error);
        }

        info!(
            path = %self.relative,
            handle = %short(&handle),
            parent = record.parent.as_deref().map(short).unwrap_or("-"),
            "committed revision"
        );
        Ok(handle)
    }

    fn restore(
        &self,
        handle: &str,
        backup: bool,
        author: &str,
    ) -> Result<String, RevisionStoreError> {
        let loaded = self.store.log.load(&self.relative)?;
        let target = find_revision(&loaded, &self.relative, handle)?.clone();
        let content = self.store.blobs.get(&target.blob)?;

        let loaded = if backup {
            match read_working(&self.absolute)? {
                Some(working)
                    if loaded.head().map_or(true, |head| sha256_hex(working.as_bytes()) != head.blob) =>
                {
                    let title = document_title(&self.relative, &working);
                    let backup_handle = self.commit_onto(
                        &loaded,
                        &working,
                        &CommitMessage::Backup { title },
                        author,
                        None,
                    )?;
                    info!(
                        path = %self.relative,
                        handle = %short(&backup_handle),
                        "backed up working content before restore"
                    );
                    self.store.log.load(&self.relative)?
                }
                _ => {
                    debug!(path = %self.relative, "working content already committed; no backup needed");
                    loaded
                }
            }
        } else {
            loaded
        };

        let message = CommitMessage::Restore {
            title: document_title(&self.relative, &content),
            handle: target.handle.clone(),
        };
        self.commit_onto(&loaded, &content, &message, author, None)
    }
}

/// Resolve a full handle or unique prefix against the loaded history.
fn find_revision<'a>(
    loaded: &'a LoadedHistory,
    path: &str,
    handle: &str,
) -> Result<&'a RevisionRecord, RevisionStoreError> {
    let wanted = handle.trim().to_ascii_lowercase();
    let unknown =
        || RevisionStoreError::UnknownRevision { path: path.to_string(), handle: handle.to_string() };
    if wanted.len() < MIN_HANDLE_PREFIX {
        return Err(unknown());
    }

    let mut found = loaded.records.iter().filter(|record| record.handle.starts_with(&wanted));
    let first = found.next().ok_or_else(unknown)?;
    if found.next().is_some() {
        return Err(RevisionStoreError::AmbiguousRevision {
            path: path.to_string(),
            prefix: handle.to_string(),
        });
    }
    Ok(first)
}

/// Put the working file back to `previous`, or remove it if there was none.
fn restore_working(absolute: &Path, previous: Option<&str>) -> Result<(), RevisionStoreError> {
    match previous {
        Some(previous) => write_atomic(absolute, previous.as_bytes()),
        None => fs::remove_file(absolute).map_err(|error| RevisionStoreError::io(absolute, error)),
    }
}

fn read_working(absolute: &Path) -> Result<Option<String>, RevisionStoreError> {
    match fs::read_to_string(absolute) {
        Ok(content) => Ok(Some(content)),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(error) => Err(RevisionStoreError::io(absolute, error)),
    }
}

/// First level-1 heading of `content`, else the file stem of `path`.
pub fn document_title(path: &str, content: &str) -> String {
    parse_sections(content)
        .into_iter()
        .find(|section| section.level == 1 && !section.heading.is_empty())
        .map(|section| section.heading)
        .unwrap_or_else(|| {
            Path::new(path)
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.to_string())
        })
}

fn short(handle: &str) -> &str {
    &handle[..handle.len().min(SHORT_HANDLE_LEN)]
}
