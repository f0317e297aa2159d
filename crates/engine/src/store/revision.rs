// Per-path revision history, stored as append-only JSON lines.
//
// One file per document: `.folio/history/<sha256(path)>.jsonl`. Each line is
// a `RevisionRecord`. A crash mid-append can leave an incomplete last line;
// readers ignore it and the next append truncates it away.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::blob::sha256_hex;
use crate::error::RevisionStoreError;
use crate::merge::MergeReport;

/// One immutable revision of a document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RevisionRecord {
    pub handle: String,
    pub parent: Option<String>,
    pub path: String,
    /// Hash of the content blob.
    pub blob: String,
    /// Rendered `CommitMessage`.
    pub message: String,
    pub author: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_report: Option<MergeReport>,
}

impl RevisionRecord {
    /// Derive the handle from everything that identifies the revision,
    /// including its parent, so identical content committed twice yields
    /// distinct handles.
    pub fn compute_handle(
        parent: Option<&str>,
        path: &str,
        blob: &str,
        message: &str,
        author: &str,
        timestamp: DateTime<Utc>,
    ) -> String {
        let preimage = format!(
            "parent {}\npath {path}\nblob {blob}\nauthor {author}\ntime {}\n\n{message}",
            parent.unwrap_or("-"),
            timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true),
        );
        sha256_hex(preimage.as_bytes())
    }
}

/// The parsed contents of a history file.
#[derive(Debug, Default)]
pub(crate) struct LoadedHistory {
    /// Oldest first.
    pub records: Vec<RevisionRecord>,
    /// Byte length of the valid prefix.
    pub valid_len: u64,
    pub torn: bool,
}

impl LoadedHistory {
    pub fn head(&self) -> Option<&RevisionRecord> {
        self.records.last()
    }
}

#[derive(Debug, Clone)]
pub(crate) struct HistoryLog {
    dir: PathBuf,
}

impl HistoryLog {
    pub fn new(history_dir: impl Into<PathBuf>) -> Self {
        Self { dir: history_dir.into() }
    }

    pub fn file_for(&self, path: &str) -> PathBuf {
        self.dir.join(format!("{}.jsonl", sha256_hex(path.as_bytes())))
    }

    pub fn load(&self, path: &str) -> Result<LoadedHistory, RevisionStoreError> {
        let file = self.file_for(path);
        let bytes = match fs::read(&file) {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Ok(LoadedHistory::default())
            }
            Err(error) => return Err(RevisionStoreError::io(&file, error)),
        };
        parse_history(&file, &bytes)
    }

    /// Append `record`, first dropping any torn tail left by an earlier crash.
    pub fn append(
        &self,
        loaded: &LoadedHistory,
        record: &RevisionRecord,
    ) -> Result<(), RevisionStoreError> {
        let file_path = self.file_for(&record.path);
        fs::create_dir_all(&self.dir).map_err(|error| RevisionStoreError::io(&self.dir, error))?;

        let mut line = serde_json::to_vec(record)
            .map_err(|source| RevisionStoreError::Corrupt { path: file_path.clone(), source })?;
        line.push(b'\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&file_path)
            .map_err(|error| RevisionStoreError::io(&file_path, error))?;
        if loaded.torn {
            file.set_len(loaded.valid_len).map_err(|error| RevisionStoreError::io(&file_path, error))?;
        }
        file.write_all(&line).map_err(|error| RevisionStoreError::io(&file_path, error))?;
        file.sync_data().map_err(|error| RevisionStoreError::io(&file_path, error))?;
        Ok(())
    }
}

fn parse_history(file: &Path, bytes: &[u8]) -> Result<LoadedHistory, RevisionStoreError> {
    let mut loaded = LoadedHistory::default();
    let mut offset = 0usize;

    while offset < bytes.len() {
        let rest = &bytes[offset..];
        let Some(newline) = rest.iter().position(|byte| *byte == b'\n') else {
            // Unterminated final line: an interrupted append.
            loaded.torn = true;
            break;
        };
        let line = &rest[..newline];
        let next = offset + newline + 1;

        if line.iter().all(u8::is_ascii_whitespace) {
            offset = next;
            loaded.valid_len = next as u64;
            continue;
        }

        match serde_json::from_slice::<RevisionRecord>(line) {
            Ok(record) => {
                loaded.records.push(record);
                offset = next;
                loaded.valid_len = next as u64;
            }
            Err(_) if next >= bytes.len() => {
                loaded.torn = true;
                break;
            }
            Err(source) => {
                return Err(RevisionStoreError::Corrupt { path: file.to_path_buf(), source })
            }
        }
    }

    if loaded.torn {
        warn!(
            file = %file.display(),
            valid_records = loaded.records.len(),
            "ignoring torn tail of revision history"
        );
    }
    Ok(loaded)
}
