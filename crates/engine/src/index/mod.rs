// Document index: candidate lookup by topic, plus the metadata the gate needs.
//
// The core only consumes this interface. Two implementations ship with the
// engine: an in-process map and a SQLite-backed index at `.folio/index.db`.

mod memory;
mod meta_db;

use std::collections::BTreeSet;

use folio_common::types::Document;

use crate::error::IndexError;

pub use memory::MemoryIndex;
pub use meta_db::{MetaIndex, INDEX_DB_FILE};

pub trait DocumentIndex: Send + Sync {
    /// Active (non-archived) documents sharing at least one topic with
    /// `topics`. `None` or an empty set returns every active document.
    ///
    /// Must be side-effect free.
    fn find_candidates(
        &self,
        topics: Option<&BTreeSet<String>>,
    ) -> Result<Vec<Document>, IndexError>;

    fn get_by_path(&self, path: &str) -> Result<Option<Document>, IndexError>;

    /// Insert or replace the entry for `document.path`.
    fn upsert(&self, document: &Document) -> Result<(), IndexError>;
}

pub(crate) fn is_candidate(document: &Document, topics: Option<&BTreeSet<String>>) -> bool {
    if document.is_archived() {
        return false;
    }
    match topics {
        Some(filter) if !filter.is_empty() => !document.topics.is_disjoint(filter),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use folio_common::types::{DocumentMetadata, DocumentStatus};

    #[test]
    fn candidate_filter_matches_any_shared_topic() {
        let doc = Document::create(
            "a.md",
            &DocumentMetadata::new("A").with_topics(["ai", "ethics"]),
            "",
            Utc::now(),
        );
        let filter: BTreeSet<String> = ["ethics".to_string(), "law".to_string()].into();
        let other: BTreeSet<String> = ["biology".to_string()].into();

        assert!(is_candidate(&doc, Some(&filter)));
        assert!(!is_candidate(&doc, Some(&other)));
        assert!(is_candidate(&doc, None));
        assert!(is_candidate(&doc, Some(&BTreeSet::new())));
    }

    #[test]
    fn archived_documents_are_never_candidates() {
        let doc = Document::create(
            "a.md",
            &DocumentMetadata::new("A").with_status(DocumentStatus::Archived),
            "",
            Utc::now(),
        );
        assert!(!is_candidate(&doc, None));
    }
}
