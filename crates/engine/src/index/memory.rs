use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

use folio_common::types::Document;

use super::{is_candidate, DocumentIndex};
use crate::error::IndexError;

/// In-process index keyed by document path.
#[derive(Debug, Default)]
pub struct MemoryIndex {
    documents: RwLock<BTreeMap<String, Document>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_documents(documents: impl IntoIterator<Item = Document>) -> Self {
        Self {
            documents: RwLock::new(
                documents.into_iter().map(|document| (document.path.clone(), document)).collect(),
            ),
        }
    }
}

impl DocumentIndex for MemoryIndex {
    fn find_candidates(
        &self,
        topics: Option<&BTreeSet<String>>,
    ) -> Result<Vec<Document>, IndexError> {
        let documents = self.documents.read().map_err(|_| IndexError::LockPoisoned)?;
        Ok(documents.values().filter(|document| is_candidate(document, topics)).cloned().collect())
    }

    fn get_by_path(&self, path: &str) -> Result<Option<Document>, IndexError> {
        let documents = self.documents.read().map_err(|_| IndexError::LockPoisoned)?;
        Ok(documents.get(path).cloned())
    }

    fn upsert(&self, document: &Document) -> Result<(), IndexError> {
        let mut documents = self.documents.write().map_err(|_| IndexError::LockPoisoned)?;
        documents.insert(document.path.clone(), document.clone());
        Ok(())
    }
}
