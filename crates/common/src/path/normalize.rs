// Document path canonicalization and store-root containment.
//
// Every document is addressed by a store-relative path. Inputs may be
// relative or absolute; absolute inputs must live under the store root.

use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use unicode_normalization::UnicodeNormalization;

/// Maximum allowed path length in characters.
const MAX_PATH_CHARS: usize = 512;

/// Directory under the store root holding internal state; never a document.
pub const STATE_DIR_NAME: &str = ".folio";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("path is empty")]
    Empty,

    #[error("path exceeds maximum length of {MAX_PATH_CHARS} characters")]
    TooLong,

    #[error("path contains directory traversal component: {0}")]
    Traversal(String),

    #[error("path contains null byte")]
    NullByte,

    #[error("path contains invalid component: {0}")]
    InvalidComponent(String),

    #[error("path `{path}` is outside the store root `{root}`")]
    OutsideRoot { path: String, root: String },

    #[error("path `{0}` addresses internal store state")]
    Reserved(String),
}

impl PathError {
    /// True when the path would escape the store root if honoured.
    pub fn is_escape(&self) -> bool {
        matches!(self, Self::Traversal(_) | Self::OutsideRoot { .. })
    }
}

/// Normalize a store-relative document path.
///
/// - Unicode NFKC normalization
/// - `\` becomes `/`, repeated separators collapse, outer separators strip
/// - `.` and `..` components are rejected
/// - null bytes, empty paths and paths over 512 characters are rejected
/// - the internal `.folio/` directory is not addressable
pub fn normalize_path(input: &str) -> Result<String, PathError> {
    if input.is_empty() {
        return Err(PathError::Empty);
    }
    if input.contains('\0') {
        return Err(PathError::NullByte);
    }

    let normalized: String = input.nfkc().collect();
    let unified = normalized.replace('\\', "/");
    let components: Vec<&str> = unified.split('/').filter(|part| !part.is_empty()).collect();

    if components.is_empty() {
        return Err(PathError::Empty);
    }

    for component in &components {
        match *component {
            "." | ".." => return Err(PathError::Traversal((*component).to_string())),
            part if part.trim().is_empty() => {
                return Err(PathError::InvalidComponent("(whitespace-only component)".into()))
            }
            _ => {}
        }
    }

    if components[0] == STATE_DIR_NAME {
        return Err(PathError::Reserved(components.join("/")));
    }

    let result = components.join("/");
    if result.chars().count() > MAX_PATH_CHARS {
        return Err(PathError::TooLong);
    }

    Ok(result)
}

/// Resolve `input` against `root`, returning the normalized relative path and
/// the absolute location of the document.
///
/// Absolute inputs are accepted only when they lie under `root`.
pub fn resolve_within(root: &Path, input: &str) -> Result<(String, PathBuf), PathError> {
    let candidate = Path::new(input);
    let relative = if candidate.has_root() || is_windows_drive(input) {
        let stripped = strip_root(root, candidate).ok_or_else(|| PathError::OutsideRoot {
            path: input.to_string(),
            root: root.display().to_string(),
        })?;
        stripped
            .components()
            .map(|component| match component {
                Component::Normal(part) => Ok(part.to_string_lossy().into_owned()),
                Component::ParentDir => Err(PathError::Traversal("..".into())),
                Component::CurDir => Err(PathError::Traversal(".".into())),
                _ => Err(PathError::OutsideRoot {
                    path: input.to_string(),
                    root: root.display().to_string(),
                }),
            })
            .collect::<Result<Vec<_>, _>>()?
            .join("/")
    } else {
        input.to_string()
    };

    let relative = normalize_path(&relative)?;
    let absolute = relative.split('/').fold(root.to_path_buf(), |acc, part| acc.join(part));
    Ok((relative, absolute))
}

fn strip_root<'a>(root: &Path, candidate: &'a Path) -> Option<&'a Path> {
    if let Ok(rest) = candidate.strip_prefix(root) {
        return Some(rest);
    }
    let canonical_root = root.canonicalize().ok()?;
    candidate.strip_prefix(canonical_root).ok()
}

fn is_windows_drive(input: &str) -> bool {
    let bytes = input.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}
