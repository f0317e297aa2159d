use std::collections::BTreeSet;
use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use folio_common::types::{Document, DocumentMetadata, DocumentStatus};
use folio_engine::{
    Action, ConflictKind, DocumentIndex, DocumentStore, EngineConfig, FolioError, IndexError,
    MemoryIndex, MergeStrategy, ValidationError,
};
use tempfile::TempDir;

fn store(temp: &TempDir) -> DocumentStore {
    DocumentStore::new(EngineConfig::for_root(temp.path()), Box::new(MemoryIndex::new()))
        .expect("document store should open")
}

fn rust_meta() -> DocumentMetadata {
    DocumentMetadata::new("Rust")
        .with_topics(["rust", "memory"])
        .with_questions(["How does borrowing work?"])
        .with_confidence(0.7)
}

const RUST_OWNERSHIP: &str = "# Rust\n\n## Ownership\nborrow checker lifetimes\n";

#[test]
fn first_write_creates_a_document_at_its_title_slug() {
    let temp = TempDir::new().expect("tempdir should be created");
    let store = store(&temp);

    let outcome = store
        .decide_and_commit(RUST_OWNERSHIP, &rust_meta(), "how does rust manage memory")
        .expect("create should succeed");

    assert_eq!(outcome.action, Action::Create);
    assert_eq!(outcome.path, "rust.md");
    assert!(outcome.report.is_none());
    assert_eq!(outcome.decision.reason, "no existing documents");
    assert_eq!(fs::read_to_string(temp.path().join("rust.md")).unwrap(), RUST_OWNERSHIP);

    let history = store.history("rust.md", 10).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].handle, outcome.revision);
    assert!(history[0].message.starts_with("Create: Rust\n\nPurpose: how does rust manage memory\n"));

    let indexed = store.document("rust.md").unwrap().expect("document should be indexed");
    assert_eq!(indexed.content, RUST_OWNERSHIP);
    assert_eq!(indexed.confidence, 0.7);
}

#[test]
fn identical_rewrite_updates_the_existing_document() {
    let temp = TempDir::new().expect("tempdir should be created");
    let store = store(&temp);
    let created = store.decide_and_commit(RUST_OWNERSHIP, &rust_meta(), "q").unwrap();

    let outcome = store.decide_and_commit(RUST_OWNERSHIP, &rust_meta(), "q").unwrap();

    assert_eq!(outcome.action, Action::Update);
    assert_eq!(outcome.path, "rust.md");
    assert!(outcome.decision.confidence >= 0.99);
    let report = outcome.report.expect("update should carry a report");
    assert_eq!(report.strategy, MergeStrategy::Integrate);
    assert!(report.conflicts.is_empty(), "{:?}", report.conflicts);

    let history = store.history("rust.md", 10).unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].parent.as_deref(), Some(created.revision.as_str()));
    assert_eq!(history[0].kind.as_deref(), Some("update"));
    assert!(history[0].merge_report.is_some());
    assert_eq!(fs::read_to_string(temp.path().join("rust.md")).unwrap(), RUST_OWNERSHIP);
}

#[test]
fn partially_overlapping_write_merges_new_sections() {
    let temp = TempDir::new().expect("tempdir should be created");
    let store = store(&temp);
    store.decide_and_commit(RUST_OWNERSHIP, &rust_meta(), "q").unwrap();

    // topics 1.0, questions 1.0, content 3/7 => 0.77
    let incoming = "# Rust\n\n## Traits\nborrow checker generics\n";
    let outcome = store.decide_and_commit(incoming, &rust_meta(), "q").unwrap();

    assert_eq!(outcome.action, Action::Merge);
    let merged = fs::read_to_string(temp.path().join("rust.md")).unwrap();
    assert!(merged.starts_with(RUST_OWNERSHIP), "{merged}");
    assert!(merged.contains("## Traits\nborrow checker generics\n"), "{merged}");

    let report = outcome.report.expect("merge should carry a report");
    assert!(report.operations.iter().any(|op| op == "section `Traits` added"), "{:?}", report.operations);

    let history = store.history("rust.md", 1).unwrap();
    assert_eq!(history[0].kind.as_deref(), Some("merge"));
    assert!(history[0].message.starts_with("Merge: Rust\n\nConflicts: 0\nStrategy: integrate"));
}

#[test]
fn unrelated_write_creates_a_second_document() {
    let temp = TempDir::new().expect("tempdir should be created");
    let store = store(&temp);
    store.decide_and_commit(RUST_OWNERSHIP, &rust_meta(), "q").unwrap();

    let meta = DocumentMetadata::new("Sourdough").with_topics(["baking"]).with_confidence(0.4);
    let outcome =
        store.decide_and_commit("# Sourdough\n\nstarter hydration flour\n", &meta, "bread").unwrap();

    assert_eq!(outcome.action, Action::Create);
    assert_eq!(outcome.path, "sourdough.md");
    assert_eq!(store.history("rust.md", 10).unwrap().len(), 1);
}

#[test]
fn colliding_titles_get_numbered_paths() {
    let temp = TempDir::new().expect("tempdir should be created");
    let store = store(&temp);
    store.decide_and_commit(RUST_OWNERSHIP, &rust_meta(), "q").unwrap();

    let meta = DocumentMetadata::new("Rust").with_topics(["corrosion"]).with_confidence(0.5);
    let outcome = store.decide_and_commit("iron oxide forms on steel\n", &meta, "q").unwrap();

    assert_eq!(outcome.action, Action::Create);
    assert_eq!(outcome.path, "rust-2.md");
    assert_eq!(fs::read_to_string(temp.path().join("rust.md")).unwrap(), RUST_OWNERSHIP);
}

#[test]
fn diverging_topics_and_confidence_are_reported_and_merged() {
    let temp = TempDir::new().expect("tempdir should be created");
    let store = store(&temp);
    let content = "# Alignment\n\n## Findings\nreward hacking persists\n";
    let questions = ["Can reward hacking be detected?"];

    let existing = DocumentMetadata::new("Alignment")
        .with_topics(["ai", "ethics"])
        .with_questions(questions)
        .with_confidence(0.6);
    store.decide_and_commit(content, &existing, "q").unwrap();

    // topics 1/3, content 1.0, questions 1.0 => 0.73
    let incoming = DocumentMetadata::new("Alignment")
        .with_topics(["ai", "safety"])
        .with_questions(questions)
        .with_confidence(0.9);
    let outcome = store.decide_and_commit(content, &incoming, "q").unwrap();

    assert_eq!(outcome.action, Action::Merge);
    let report = outcome.report.expect("merge should carry a report");
    let topic_conflict = report
        .conflicts
        .iter()
        .find(|conflict| conflict.field == "topics")
        .expect("topic divergence should be reported");
    assert_eq!(topic_conflict.kind, ConflictKind::Metadata);
    assert!(report.conflicts.iter().any(|conflict| conflict.kind == ConflictKind::Confidence));

    let merged = store.document("alignment.md").unwrap().expect("document should be indexed");
    let expected: BTreeSet<String> =
        ["ai", "ethics", "safety"].into_iter().map(String::from).collect();
    assert_eq!(merged.topics, expected);
    assert_eq!(merged.confidence, 0.9);
}

#[test]
fn archived_documents_are_not_merged_into() {
    let temp = TempDir::new().expect("tempdir should be created");
    let store = store(&temp);
    store.decide_and_commit(RUST_OWNERSHIP, &rust_meta(), "q").unwrap();

    let archived = store.archive("rust.md").unwrap();
    assert_eq!(archived.status, DocumentStatus::Archived);

    let outcome = store.decide_and_commit(RUST_OWNERSHIP, &rust_meta(), "q").unwrap();
    assert_eq!(outcome.action, Action::Create);
    assert_eq!(outcome.path, "rust-2.md");
    assert_eq!(store.history("rust.md", 10).unwrap().len(), 1);
}

#[test]
fn archiving_an_unknown_document_fails() {
    let temp = TempDir::new().expect("tempdir should be created");
    let store = store(&temp);
    assert!(matches!(store.archive("nothing.md"), Err(FolioError::UnknownDocument(_))));
}

#[test]
fn invalid_metadata_aborts_without_writing() {
    let temp = TempDir::new().expect("tempdir should be created");
    let store = store(&temp);
    store.decide_and_commit(RUST_OWNERSHIP, &rust_meta(), "q").unwrap();

    let broken = rust_meta().with_confidence(1.5);
    let error = store.decide_and_commit("# Rust\n\nnew\n", &broken, "q").unwrap_err();

    assert!(matches!(error, FolioError::Scoring(_)), "{error:?}");
    assert_eq!(store.history("rust.md", 10).unwrap().len(), 1);
    assert_eq!(fs::read_to_string(temp.path().join("rust.md")).unwrap(), RUST_OWNERSHIP);
}

#[test]
fn invalid_first_write_is_rejected_and_leaves_the_store_usable() {
    let temp = TempDir::new().expect("tempdir should be created");
    let store = store(&temp);

    let error = store
        .decide_and_commit(RUST_OWNERSHIP, &rust_meta().with_confidence(1.5), "q")
        .unwrap_err();
    match error {
        FolioError::Scoring(scoring) => {
            assert!(matches!(scoring.source, ValidationError::ConfidenceOutOfRange { .. }));
            assert!(scoring.considered.is_empty());
        }
        other => panic!("expected a scoring error, got {other:?}"),
    }
    let blank = DocumentMetadata::new("   ").with_topics(["rust"]);
    assert!(matches!(store.decide_and_commit("text", &blank, "q"), Err(FolioError::Scoring(_))));

    assert!(!temp.path().join("rust.md").exists());
    assert!(store.document("rust.md").unwrap().is_none());

    let outcome = store.decide_and_commit(RUST_OWNERSHIP, &rust_meta(), "q").unwrap();
    assert_eq!(outcome.action, Action::Create);
    assert_eq!(outcome.path, "rust.md");
}

/// Index whose upserts can be switched off to fail.
#[derive(Clone, Default)]
struct FlakyIndex {
    inner: Arc<MemoryIndex>,
    failing: Arc<AtomicBool>,
}

impl DocumentIndex for FlakyIndex {
    fn find_candidates(
        &self,
        topics: Option<&BTreeSet<String>>,
    ) -> Result<Vec<Document>, IndexError> {
        self.inner.find_candidates(topics)
    }

    fn get_by_path(&self, path: &str) -> Result<Option<Document>, IndexError> {
        self.inner.get_by_path(path)
    }

    fn upsert(&self, document: &Document) -> Result<(), IndexError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(IndexError::LockPoisoned);
        }
        self.inner.upsert(document)
    }
}

#[test]
fn index_failure_after_commit_still_reports_the_revision() {
    let temp = TempDir::new().expect("tempdir should be created");
    let index = FlakyIndex::default();
    let store = DocumentStore::new(EngineConfig::for_root(temp.path()), Box::new(index.clone()))
        .expect("document store should open");
    store.decide_and_commit(RUST_OWNERSHIP, &rust_meta(), "q").unwrap();

    index.failing.store(true, Ordering::SeqCst);
    let incoming = "# Rust\n\n## Traits\nborrow checker generics\n";
    let outcome = store.decide_and_commit(incoming, &rust_meta(), "q").expect("commit should stand");

    assert_eq!(outcome.action, Action::Merge);
    let history = store.history("rust.md", 10).unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].handle, outcome.revision);
    let indexed = store.document("rust.md").unwrap().expect("document should be indexed");
    assert_eq!(indexed.content, RUST_OWNERSHIP);
}

#[test]
fn restore_through_the_store_refreshes_indexed_content() {
    let temp = TempDir::new().expect("tempdir should be created");
    let store = store(&temp);
    let created = store.decide_and_commit(RUST_OWNERSHIP, &rust_meta(), "q").unwrap();
    store
        .decide_and_commit("# Rust\n\n## Traits\nborrow checker generics\n", &rust_meta(), "q")
        .unwrap();

    store.restore("rust.md", &created.revision, true).unwrap();

    let indexed = store.document("rust.md").unwrap().expect("document should be indexed");
    assert_eq!(indexed.content, RUST_OWNERSHIP);
    assert!(!store.has_uncommitted_changes("rust.md").unwrap());
}
