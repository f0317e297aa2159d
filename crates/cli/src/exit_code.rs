// Consistent exit codes for the folio CLI.
//
//   0  = success
//   1  = general error
//   2  = usage/argument error (bad metadata, path outside the store)
//   10 = invalid configuration
//   11 = document or revision not found
//   12 = ambiguous revision prefix
//   13 = storage failure (I/O, corrupt history, index)

use std::process;

use folio_engine::{ConfigurationError, FolioError, MergeError, RevisionStoreError};

/// Named exit codes for the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    Error = 1,
    Usage = 2,
    Config = 10,
    NotFound = 11,
    Ambiguous = 12,
    Storage = 13,
}

impl ExitCode {
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Map an anyhow error to an exit code by inspecting the error chain.
    pub fn from_error(err: &anyhow::Error) -> Self {
        for cause in err.chain() {
            if let Some(folio) = cause.downcast_ref::<FolioError>() {
                return Self::from_folio_error(folio);
            }
            if let Some(store) = cause.downcast_ref::<RevisionStoreError>() {
                return Self::from_store_error(store);
            }
            if cause.downcast_ref::<ConfigurationError>().is_some() {
                return Self::Config;
            }
            if cause.downcast_ref::<std::io::Error>().is_some() {
                return Self::Error;
            }
        }
        Self::Error
    }

    pub fn from_folio_error(error: &FolioError) -> Self {
        match error {
            FolioError::Scoring(_) | FolioError::PathExhausted(_) => Self::Usage,
            FolioError::Merge(MergeError::UnknownStrategy(_)) => Self::Config,
            FolioError::Merge(_) => Self::Error,
            FolioError::Configuration(_) => Self::Config,
            FolioError::Store(store) => Self::from_store_error(store),
            FolioError::Index(_) => Self::Storage,
            FolioError::UnknownDocument(_) => Self::NotFound,
        }
    }

    pub fn from_store_error(error: &RevisionStoreError) -> Self {
        match error {
            RevisionStoreError::PathOutsideStore { .. } | RevisionStoreError::InvalidPath { .. } => {
                Self::Usage
            }
            RevisionStoreError::UnknownRevision { .. } => Self::NotFound,
            RevisionStoreError::AmbiguousRevision { .. } => Self::Ambiguous,
            RevisionStoreError::Io { .. }
            | RevisionStoreError::Corrupt { .. }
            | RevisionStoreError::MissingBlob { .. }
            | RevisionStoreError::LockPoisoned(_) => Self::Storage,
        }
    }

    /// Stable machine-readable label used in JSON error output.
    pub fn label(self) -> &'static str {
        match self {
            Self::Success => "OK",
            Self::Error => "ERROR",
            Self::Usage => "INVALID_INPUT",
            Self::Config => "INVALID_CONFIG",
            Self::NotFound => "NOT_FOUND",
            Self::Ambiguous => "AMBIGUOUS_REVISION",
            Self::Storage => "STORAGE_FAILURE",
        }
    }
}

impl From<ExitCode> for process::ExitCode {
    fn from(code: ExitCode) -> Self {
        process::ExitCode::from(code.code() as u8)
    }
}
