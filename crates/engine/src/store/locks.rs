// Per-path writer locks.
//
// Writers to the same document path are serialized; writers to different
// paths never contend beyond the brief registry lookup.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::RevisionStoreError;

#[derive(Debug, Default)]
pub struct PathLocks {
    registry: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl PathLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the lock for `path`.
    pub fn with_lock<T, E>(&self, path: &str, f: impl FnOnce() -> Result<T, E>) -> Result<T, E>
    where
        E: From<RevisionStoreError>,
    {
        let lock = self.lock_for(path)?;
        let _guard: MutexGuard<'_, ()> =
            lock.lock().map_err(|_| RevisionStoreError::LockPoisoned(path.to_string()))?;
        f()
    }

    fn lock_for(&self, path: &str) -> Result<Arc<Mutex<()>>, RevisionStoreError> {
        let mut registry =
            self.registry.lock().map_err(|_| RevisionStoreError::LockPoisoned(path.to_string()))?;
        Ok(Arc::clone(registry.entry(path.to_string()).or_default()))
    }
}
