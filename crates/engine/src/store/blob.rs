// Content-addressed blob storage: `.folio/objects/<hh>/<sha256>`.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::RevisionStoreError;

/// Lowercase hex SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        hex.push(char::from(b"0123456789abcdef"[usize::from(byte >> 4)]));
        hex.push(char::from(b"0123456789abcdef"[usize::from(byte & 0x0f)]));
    }
    hex
}

#[derive(Debug, Clone)]
pub struct BlobStore {
    dir: PathBuf,
}

impl BlobStore {
    pub fn new(objects_dir: impl Into<PathBuf>) -> Self {
        Self { dir: objects_dir.into() }
    }

    /// Store `content`, returning its hash. Existing blobs are not rewritten.
    pub fn put(&self, content: &str) -> Result<String, RevisionStoreError> {
        let hash = sha256_hex(content.as_bytes());
        let target = self.blob_path(&hash);
        if target.exists() {
            return Ok(hash);
        }
        let parent = target.parent().unwrap_or(&self.dir);
        fs::create_dir_all(parent).map_err(|error| RevisionStoreError::io(parent, error))?;
        write_atomic(&target, content.as_bytes())?;
        Ok(hash)
    }

    /// Read a blob back, verifying it still matches its hash.
    pub fn get(&self, hash: &str) -> Result<String, RevisionStoreError> {
        if hash.len() != 64 || !hash.bytes().all(|byte| byte.is_ascii_hexdigit()) {
            return Err(RevisionStoreError::MissingBlob { hash: hash.to_string() });
        }
        let path = self.blob_path(hash);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Err(RevisionStoreError::MissingBlob { hash: hash.to_string() })
            }
            Err(error) => return Err(RevisionStoreError::io(&path, error)),
        };
        if sha256_hex(&bytes) != hash {
            return Err(RevisionStoreError::MissingBlob { hash: hash.to_string() });
        }
        String::from_utf8(bytes).map_err(|_| RevisionStoreError::MissingBlob { hash: hash.to_string() })
    }

    fn blob_path(&self, hash: &str) -> PathBuf {
        let (fanout, rest) = hash.split_at(hash.len().min(2));
        self.dir.join(fanout).join(rest)
    }
}

/// Write `bytes` to `target` via a sibling temp file and rename, fsyncing the
/// data before the rename.
pub(crate) fn write_atomic(target: &Path, bytes: &[u8]) -> Result<(), RevisionStoreError> {
    let file_name =
        target.file_name().map(|name| name.to_string_lossy().into_owned()).unwrap_or_default();
    let tmp_path = target.with_file_name(format!(".{file_name}.{}.tmp", Uuid::new_v4().simple()));

    let mut file =
        fs::File::create(&tmp_path).map_err(|error| RevisionStoreError::io(&tmp_path, error))?;
    file.write_all(bytes).map_err(|error| RevisionStoreError::io(&tmp_path, error))?;
    file.sync_data().map_err(|error| RevisionStoreError::io(&tmp_path, error))?;
    drop(file);

    fs::rename(&tmp_path, target).map_err(|error| {
        let _ = fs::remove_file(&tmp_path);
        RevisionStoreError::io(target, error)
    })
}
