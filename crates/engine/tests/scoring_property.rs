use chrono::Utc;
use folio_common::types::{Document, DocumentMetadata};
use folio_engine::{Action, DedupConfig, DeduplicationGate, SimilarityScorer};
use proptest::prelude::*;

// Words carry a digit so none of them can be a stop word.
fn words(prefix: &'static str) -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-z]{2,6}[0-9]", 1..12)
        .prop_map(move |words| words.into_iter().map(|word| format!("{prefix}{word}")).collect())
}

fn topics(prefix: &'static str) -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-z]{3,8}", 1..4)
        .prop_map(move |topics| topics.into_iter().map(|topic| format!("{prefix}{topic}")).collect())
}

proptest! {
    #[test]
    fn a_document_scores_itself_maximally(
        body in words(""),
        topics in topics(""),
        questions in prop::collection::vec("[a-z ]{3,30}[a-z]", 0..3),
        confidence in 0.0f64..=1.0,
    ) {
        let content = body.join(" ");
        let metadata = DocumentMetadata::new("Self")
            .with_topics(topics)
            .with_questions(questions)
            .with_confidence(confidence);
        let document = Document::create("self.md", &metadata, content.clone(), Utc::now());

        let scored = SimilarityScorer::new().score(&content, &metadata, &document).unwrap();
        prop_assert!(scored.score >= 0.99, "{}", scored.explanation);
    }

    #[test]
    fn disjoint_documents_are_always_created(
        left in words("l"),
        right in words("r"),
        left_topics in topics("l"),
        right_topics in topics("r"),
        question in "[a-z ]{3,30}[a-z]",
    ) {
        let existing_meta = DocumentMetadata::new("Existing").with_topics(right_topics);
        let existing = Document::create("existing.md", &existing_meta, right.join(" "), Utc::now());
        let incoming = DocumentMetadata::new("Incoming")
            .with_topics(left_topics)
            .with_questions([question]);

        let gate = DeduplicationGate::new(DedupConfig::default()).unwrap();
        let decision = gate.decide(&left.join(" "), &incoming, &[existing]).unwrap();

        prop_assert_eq!(decision.action, Action::Create);
        prop_assert!(decision.target.is_none());
        prop_assert_eq!(decision.confidence, 0.0);
    }
}
