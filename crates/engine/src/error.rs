// Typed errors for every engine concern, aggregated by `FolioError`.

use std::path::{Path, PathBuf};

use folio_common::path::PathError;
use thiserror::Error;

/// Malformed scoring input. The caller must fix the metadata and retry.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("{subject}: required metadata field `{field}` is missing or blank")]
    MissingField { subject: String, field: &'static str },

    #[error("{subject}: confidence {value} must be a finite number in [0, 1]")]
    ConfidenceOutOfRange { subject: String, value: f64 },
}

/// A candidate's score at the time a decision failed.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateScore {
    pub path: String,
    pub score: f64,
}

/// A decision aborted by invalid input, with the scores computed so far.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("deduplication aborted after scoring {} candidate(s): {source}", considered.len())]
pub struct ScoringError {
    #[source]
    pub source: ValidationError,
    pub considered: Vec<CandidateScore>,
}

/// Invalid engine configuration. Fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("threshold `{name}` must lie strictly between 0 and 1, got {value}")]
    ThresholdOutOfRange { name: &'static str, value: f64 },

    #[error(
        "similarity_threshold ({similarity}) must be greater than merge_threshold ({merge})"
    )]
    ThresholdOrder { similarity: f64, merge: f64 },

    #[error("failed to access config file `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file `{}`: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Content that a merge strategy cannot work with.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MergeError {
    #[error("unknown merge strategy `{0}` (expected append, replace or integrate)")]
    UnknownStrategy(String),

    #[error("{side} content has no markdown headings to integrate by section")]
    Unsectionable { side: &'static str },
}

/// Revision store failures. A failed operation never leaves a partial revision.
#[derive(Debug, Error)]
pub enum RevisionStoreError {
    #[error("path `{path}` resolves outside the store root: {source}")]
    PathOutsideStore {
        path: String,
        #[source]
        source: PathError,
    },

    #[error("invalid document path `{path}`: {source}")]
    InvalidPath {
        path: String,
        #[source]
        source: PathError,
    },

    #[error("revision `{handle}` not found in the history of `{path}`")]
    UnknownRevision { path: String, handle: String },

    #[error("revision prefix `{prefix}` matches several revisions of `{path}`")]
    AmbiguousRevision { path: String, prefix: String },

    #[error("I/O failure on `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt revision record in `{}`: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("content blob {hash} is missing or does not match its hash")]
    MissingBlob { hash: String },

    #[error("writer lock for `{0}` was poisoned by a panicking writer")]
    LockPoisoned(String),
}

impl RevisionStoreError {
    pub(crate) fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io { path: path.as_ref().to_path_buf(), source }
    }

    pub(crate) fn from_path_error(path: &str, source: PathError) -> Self {
        if source.is_escape() {
            Self::PathOutsideStore { path: path.to_string(), source }
        } else {
            Self::InvalidPath { path: path.to_string(), source }
        }
    }
}

/// Document index failures.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("index database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to prepare index location `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("index row for `{path}` is corrupt: {reason}")]
    Corrupt { path: String, reason: String },

    #[error("index lock was poisoned by a panicking writer")]
    LockPoisoned,
}

/// Everything a write through the document store can fail with.
#[derive(Debug, Error)]
pub enum FolioError {
    #[error(transparent)]
    Scoring(#[from] ScoringError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error(transparent)]
    Store(#[from] RevisionStoreError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error("no document is tracked at `{0}`")]
    UnknownDocument(String),

    #[error("no free document path left for title `{0}`")]
    PathExhausted(String),
}
