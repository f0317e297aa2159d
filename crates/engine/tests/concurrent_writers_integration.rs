use std::sync::Barrier;
use std::thread;

use folio_common::types::DocumentMetadata;
use folio_engine::message::CommitMessage;
use folio_engine::{Action, DocumentStore, EngineConfig, MemoryIndex, RevisionStore};
use tempfile::TempDir;

fn notes_meta() -> DocumentMetadata {
    DocumentMetadata::new("Notes")
        .with_topics(["systems"])
        .with_questions(["Where does latency come from?"])
        .with_confidence(0.5)
}

fn base_notes() -> String {
    let words: Vec<String> = (1..=20).map(|n| format!("term{n}")).collect();
    format!("# Notes\n\n## Base\n{}\n", words.join(" "))
}

#[test]
fn concurrent_updates_of_one_document_both_land_in_sequence() {
    let temp = TempDir::new().expect("tempdir should be created");
    let store =
        DocumentStore::new(EngineConfig::for_root(temp.path()), Box::new(MemoryIndex::new()))
            .expect("document store should open");
    let created = store.decide_and_commit(&base_notes(), &notes_meta(), "q").unwrap();

    let barrier = Barrier::new(2);
    let outcomes: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = ["alpha", "bravo"]
            .into_iter()
            .map(|word| {
                let store = &store;
                let barrier = &barrier;
                scope.spawn(move || {
                    let content = format!("{}\n## Thread {word}\n{word} finding\n", base_notes());
                    barrier.wait();
                    store.decide_and_commit(&content, &notes_meta(), "q")
                })
            })
            .collect();
        handles.into_iter().map(|handle| handle.join().expect("writer should not panic")).collect()
    });

    for outcome in &outcomes {
        let outcome = outcome.as_ref().expect("update should succeed");
        assert_eq!(outcome.action, Action::Update);
        assert_eq!(outcome.path, "notes.md");
    }

    let history = store.history("notes.md", 10).unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[2].handle, created.revision);
    assert_eq!(history[1].parent.as_deref(), Some(created.revision.as_str()));
    assert_eq!(history[0].parent.as_deref(), Some(history[1].handle.as_str()));

    let content = store.revisions().current_content("notes.md").unwrap().unwrap_or_default();
    assert!(content.contains("## Thread alpha\nalpha finding"), "{content}");
    assert!(content.contains("## Thread bravo\nbravo finding"), "{content}");
    assert!(!store.has_uncommitted_changes("notes.md").unwrap());
}

#[test]
fn concurrent_commits_on_distinct_paths_do_not_interfere() {
    let temp = TempDir::new().expect("tempdir should be created");
    let store = RevisionStore::open(temp.path()).expect("store should open");
    let barrier = Barrier::new(4);

    thread::scope(|scope| {
        for writer in 0..4 {
            let store = &store;
            let barrier = &barrier;
            scope.spawn(move || {
                barrier.wait();
                for round in 0..5 {
                    let message = CommitMessage::Update {
                        title: format!("Doc {writer}"),
                        summary: format!("round {round}"),
                    };
                    store
                        .commit(&format!("doc-{writer}.md"), &format!("round {round}\n"), &message, "tester")
                        .expect("commit should succeed");
                }
            });
        }
    });

    for writer in 0..4 {
        let path = format!("doc-{writer}.md");
        let history = store.history(&path, 10).unwrap();
        assert_eq!(history.len(), 5, "{path}");
        for pair in history.windows(2) {
            assert_eq!(pair[0].parent.as_deref(), Some(pair[1].handle.as_str()));
        }
        assert_eq!(store.current_content(&path).unwrap().as_deref(), Some("round 4\n"));
    }
}

#[test]
fn concurrent_commits_on_one_path_form_a_single_chain() {
    let temp = TempDir::new().expect("tempdir should be created");
    let store = RevisionStore::open(temp.path()).expect("store should open");
    let barrier = Barrier::new(8);

    thread::scope(|scope| {
        for writer in 0..8 {
            let store = &store;
            let barrier = &barrier;
            scope.spawn(move || {
                let message = CommitMessage::Update {
                    title: "Shared".to_string(),
                    summary: format!("writer {writer}"),
                };
                barrier.wait();
                store
                    .commit("shared.md", &format!("writer {writer}\n"), &message, "tester")
                    .expect("commit should succeed");
            });
        }
    });

    let history = store.history("shared.md", 100).unwrap();
    assert_eq!(history.len(), 8);
    assert_eq!(history.last().and_then(|oldest| oldest.parent.clone()), None);
    for pair in history.windows(2) {
        assert_eq!(pair[0].parent.as_deref(), Some(pair[1].handle.as_str()));
    }
}
