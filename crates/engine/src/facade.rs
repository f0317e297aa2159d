// Document store facade: index lookup, gate, merger and revision store
// wired together into one committed revision per research write.

use chrono::Utc;
use folio_common::path::document_file_name;
use folio_common::types::{Document, DocumentMetadata, DocumentStatus};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::{FolioError, IndexError};
use crate::gate::{Action, DeduplicationDecision, DeduplicationGate};
use crate::index::{DocumentIndex, MetaIndex, INDEX_DB_FILE};
use crate::merge::{DocumentMerger, MergeReport, MergeStrategy};
use crate::message::CommitMessage;
use crate::store::{RevisionStore, RevisionSummary, WorkingState};

/// Upper bound on `-2`, `-3`, ... suffixes tried for a new document path.
const MAX_PATH_ATTEMPTS: usize = 1_000;

/// Result of `decide_and_commit`.
#[derive(Debug, Clone, Serialize)]
pub struct WriteOutcome {
    pub action: Action,
    pub path: String,
    pub revision: String,
    /// Present for UPDATE and MERGE.
    pub report: Option<MergeReport>,
    pub decision: DeduplicationDecision,
}

pub struct DocumentStore {
    config: EngineConfig,
    gate: DeduplicationGate,
    merger: DocumentMerger,
    revisions: RevisionStore,
    index: Box<dyn DocumentIndex>,
}

impl DocumentStore {
    pub fn new(config: EngineConfig, index: Box<dyn DocumentIndex>) -> Result<Self, FolioError> {
        let gate = DeduplicationGate::new(config.dedup)?;
        let revisions = RevisionStore::open(&config.store_root)?;
        Ok(Self { config, gate, merger: DocumentMerger::new(), revisions, index })
    }

    /// Open with the SQLite index at `<store_root>/.folio/index.db`.
    pub fn open(config: EngineConfig) -> Result<Self, FolioError> {
        let index_path = config
            .store_root
            .join(folio_common::path::normalize::STATE_DIR_NAME)
            .join(INDEX_DB_FILE);
        let index = MetaIndex::open(index_path)?;
        Self::new(config, Box::new(index))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn revisions(&self) -> &RevisionStore {
        &self.revisions
    }

    /// Decide CREATE, UPDATE or MERGE for `content` and commit the result.
    ///
    /// For UPDATE and MERGE the target's writer lock is held from re-reading
    /// its current content through the commit, so concurrent writers of the
    /// same document never merge against a stale revision.
    ///
    /// Once the revision is committed the write succeeds. A failure to refresh
    /// the index afterwards is logged, not returned; merges re-read the
    /// working file, so a stale index entry only affects candidate scoring.
    pub fn decide_and_commit(
        &self,
        content: &str,
        metadata: &DocumentMetadata,
        origin_query: &str,
    ) -> Result<WriteOutcome, FolioError> {
        let candidates = self.index.find_candidates(Some(&metadata.topics))?;
        debug!(candidates = candidates.len(), "loaded deduplication candidates");
        let decision = self.gate.decide(content, metadata, &candidates)?;

        match (decision.action, decision.target.clone()) {
            (Action::Update, Some(target)) => {
                self.merge_into(target, content, metadata, decision, self.config.merge.update_strategy)
            }
            (Action::Merge, Some(target)) => {
                self.merge_into(target, content, metadata, decision, self.config.merge.merge_strategy)
            }
            _ => self.create(content, metadata, origin_query, decision),
        }
    }

    fn create(
        &self,
        content: &str,
        metadata: &DocumentMetadata,
        origin_query: &str,
        decision: DeduplicationDecision,
    ) -> Result<WriteOutcome, FolioError> {
        let purpose = metadata
            .purpose
            .clone()
            .filter(|purpose| !purpose.trim().is_empty())
            .unwrap_or_else(|| origin_query.to_string());
        let message = CommitMessage::create(metadata, purpose);

        for attempt in 1..=MAX_PATH_ATTEMPTS {
            let candidate = document_file_name(&metadata.title, attempt);
            let committed = self.revisions.with_path_lock(&candidate, |locked| {
                if locked.head()?.is_some() || locked.current_content()?.is_some() {
                    return Ok::<_, FolioError>(None);
                }
                let revision = locked.commit(content, &message, &self.config.author, None)?;
                Ok(Some((locked.relative().to_string(), revision)))
            })?;

            let Some((path, revision)) = committed else {
                continue;
            };

            let document = Document::create(path.clone(), metadata, content, Utc::now());
            self.refresh_index(&document);
            info!(path = %path, revision = %short(&revision), "created document");

            return Ok(WriteOutcome {
                action: Action::Create,
                path,
                revision,
                report: None,
                decision,
            });
        }

        Err(FolioError::PathExhausted(metadata.title.clone()))
    }

    fn merge_into(
        &self,
        target: Document,
        content: &str,
        metadata: &DocumentMetadata,
        decision: DeduplicationDecision,
        strategy: MergeStrategy,
    ) -> Result<WriteOutcome, FolioError> {
        let action = decision.action;
        let (path, revision, report) = self.revisions.with_path_lock(&target.path, |locked| {
            // Re-read under the lock: another writer may have committed since
            // the candidate snapshot was taken.
            let mut existing = self
                .index
                .get_by_path(locked.relative())?
                .unwrap_or_else(|| target.clone());
            if let Some(current) = locked.current_content()? {
                existing.content = current;
            }

            let (merged, report) = self.merger.merge(&existing, content, metadata, strategy);
            let message = match action {
                Action::Update => CommitMessage::update(&report),
                _ => CommitMessage::merge(&report),
            };
            let revision =
                locked.commit(&merged.content, &message, &self.config.author, Some(&report))?;
            self.refresh_index(&merged);
            Ok::<_, FolioError>((locked.relative().to_string(), revision, report))
        })?;

        info!(
            path = %path,
            action = %action,
            strategy = %report.strategy,
            conflicts = report.conflicts.len(),
            revision = %short(&revision),
            "merged into existing document"
        );

        Ok(WriteOutcome { action, path, revision, report: Some(report), decision })
    }

    pub fn history(&self, path: &str, max_count: usize) -> Result<Vec<RevisionSummary>, FolioError> {
        Ok(self.revisions.history(path, max_count)?)
    }

    pub fn diff(&self, path: &str, a: &str, b: Option<&str>) -> Result<String, FolioError> {
        Ok(self.revisions.diff(path, a, b)?)
    }

    /// Restore a revision as the new current content and refresh the index.
    pub fn restore(&self, path: &str, handle: &str, backup: bool) -> Result<String, FolioError> {
        let revision = self.revisions.restore(path, handle, backup, &self.config.author)?;
        let (relative, _) = self.revisions.resolve(path)?;
        if let Some(mut document) = self.index.get_by_path(&relative)? {
            if let Some(content) = self.revisions.current_content(&relative)? {
                document.content = content;
            }
            document.updated_at = Utc::now();
            self.refresh_index(&document);
        }
        Ok(revision)
    }

    pub fn status(&self, path: &str) -> Result<WorkingState, FolioError> {
        Ok(self.revisions.status(path)?)
    }

    pub fn has_uncommitted_changes(&self, path: &str) -> Result<bool, FolioError> {
        Ok(self.revisions.has_uncommitted_changes(path)?)
    }

    /// Mark a document archived. Content is untouched, so no revision is made;
    /// archived documents stop being deduplication candidates.
    pub fn archive(&self, path: &str) -> Result<Document, FolioError> {
        let (relative, _) = self.revisions.resolve(path)?;
        let mut document = self
            .index
            .get_by_path(&relative)?
            .ok_or_else(|| FolioError::UnknownDocument(relative.clone()))?;
        if document.status != DocumentStatus::Archived {
            document.status = DocumentStatus::Archived;
            document.updated_at = Utc::now();
            self.index.upsert(&document)?;
            info!(path = %relative, "archived document");
        }
        Ok(document)
    }

    /// Index update after a committed revision. The revision stands either way.
    fn refresh_index(&self, document: &Document) {
        if let Err(error) = self.index.upsert(document) {
            warn!(path = %document.path, %error, "revision committed but index update failed");
        }
    }

    pub fn document(&self, path: &str) -> Result<Option<Document>, IndexError> {
        self.index.get_by_path(path)
    }
}

fn short(handle: &str) -> &str {
    &handle[..handle.len().min(crate::store::SHORT_HANDLE_LEN)]
}
