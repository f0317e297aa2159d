// Similarity scoring between incoming content and an existing document.
//
// overall = 0.4 * topic + 0.4 * content + 0.2 * question, clamped to [0, 1].
// The content component is pluggable through `TextSimilarity`.

use std::collections::{BTreeSet, HashSet};

use folio_common::types::{Document, DocumentMetadata};
use serde::Serialize;

use crate::error::ValidationError;

pub const TOPIC_WEIGHT: f64 = 0.4;
pub const CONTENT_WEIGHT: f64 = 0.4;
pub const QUESTION_WEIGHT: f64 = 0.2;

const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "also", "am", "an", "and", "any",
    "are", "as", "at", "be", "because", "been", "before", "being", "below", "between", "both",
    "but", "by", "can", "could", "did", "do", "does", "doing", "down", "during", "each", "few",
    "for", "from", "further", "had", "has", "have", "having", "he", "her", "here", "hers", "him",
    "his", "how", "i", "if", "in", "into", "is", "it", "its", "itself", "just", "me", "more",
    "most", "my", "no", "nor", "not", "now", "of", "off", "on", "once", "only", "or", "other",
    "our", "ours", "out", "over", "own", "same", "she", "should", "so", "some", "such", "than",
    "that", "the", "their", "theirs", "them", "then", "there", "these", "they", "this", "those",
    "through", "to", "too", "under", "until", "up", "very", "was", "we", "were", "what", "when",
    "where", "which", "while", "who", "whom", "why", "will", "with", "would", "you", "your",
];

/// A symmetric, bounded text similarity in [0, 1].
///
/// Implementations must score identical non-empty texts 1.0 and texts with
/// disjoint vocabularies 0.0.
pub trait TextSimilarity: Send + Sync {
    fn similarity(&self, a: &str, b: &str) -> f64;
}

/// Jaccard overlap of normalized word sets.
#[derive(Debug, Default, Clone, Copy)]
pub struct WordOverlap;

impl TextSimilarity for WordOverlap {
    fn similarity(&self, a: &str, b: &str) -> f64 {
        let left = normalized_tokens(a);
        let right = normalized_tokens(b);
        if left.is_empty() || right.is_empty() {
            return 0.0;
        }
        let shared = left.intersection(&right).count();
        let union = left.len() + right.len() - shared;
        shared as f64 / union as f64
    }
}

/// Lower-cased alphanumeric words with stop words removed.
pub fn normalized_tokens(text: &str) -> HashSet<String> {
    text.split(|ch: char| !ch.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .filter(|word| !STOP_WORDS.contains(&word.as_str()))
        .collect()
}

/// |a ∩ b| / |a ∪ b|, defined as 0.0 when both sets are empty.
pub fn jaccard<T: Ord>(a: &BTreeSet<T>, b: &BTreeSet<T>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

/// Scores of one candidate against the incoming content.
#[derive(Debug, Clone, Serialize)]
pub struct SimilarityMatch {
    pub candidate: Document,
    pub score: f64,
    pub topic_overlap: f64,
    pub content_overlap: f64,
    pub question_overlap: f64,
    pub explanation: String,
}

#[derive(Debug, Clone, Default)]
pub struct SimilarityScorer<S = WordOverlap> {
    text: S,
}

impl SimilarityScorer<WordOverlap> {
    pub fn new() -> Self {
        Self { text: WordOverlap }
    }
}

impl<S: TextSimilarity> SimilarityScorer<S> {
    pub fn with_text_similarity(text: S) -> Self {
        Self { text }
    }

    /// Score `candidate` against the incoming content and metadata.
    ///
    /// Fails only on malformed metadata. Empty topic sets score 0.0; see
    /// [`question_overlap`] for empty question lists.
    pub fn score(
        &self,
        new_content: &str,
        new_metadata: &DocumentMetadata,
        candidate: &Document,
    ) -> Result<SimilarityMatch, ValidationError> {
        validate_metadata(new_metadata)?;
        validate_fields(
            &format!("candidate `{}`", candidate.path),
            &candidate.title,
            candidate.confidence,
        )?;

        let topic_overlap = jaccard(&new_metadata.topics, &candidate.topics);
        let content_overlap =
            self.text.similarity(new_content, &candidate.content).clamp(0.0, 1.0);
        let question_overlap =
            question_overlap(&new_metadata.open_questions, &candidate.open_questions);

        let score = (TOPIC_WEIGHT * topic_overlap
            + CONTENT_WEIGHT * content_overlap
            + QUESTION_WEIGHT * question_overlap)
            .clamp(0.0, 1.0);

        Ok(SimilarityMatch {
            candidate: candidate.clone(),
            score,
            topic_overlap,
            content_overlap,
            question_overlap,
            explanation: format!(
                "topics {topic_overlap:.2}, content {content_overlap:.2}, questions {question_overlap:.2} => {score:.2}"
            ),
        })
    }
}

/// Fraction of `new` questions that substring-match (case-insensitive, either
/// direction) some existing question.
///
/// Two documents without open questions agree completely (1.0); an empty
/// list against a non-empty one scores 0.0.
pub fn question_overlap(new: &[String], existing: &[String]) -> f64 {
    let new: Vec<String> =
        new.iter().map(|q| q.trim().to_lowercase()).filter(|q| !q.is_empty()).collect();
    let existing: Vec<String> =
        existing.iter().map(|q| q.trim().to_lowercase()).filter(|q| !q.is_empty()).collect();
    match (new.is_empty(), existing.is_empty()) {
        (true, true) => return 1.0,
        (true, false) => return 0.0,
        _ => {}
    }

    let matched = new
        .iter()
        .filter(|question| {
            existing.iter().any(|other| other.contains(question.as_str()) || question.contains(other.as_str()))
        })
        .count();
    matched as f64 / new.len() as f64
}

/// Title must be non-blank and confidence a finite number in [0, 1].
pub fn validate_metadata(metadata: &DocumentMetadata) -> Result<(), ValidationError> {
    validate_fields("new content", &metadata.title, metadata.confidence)
}

fn validate_fields(subject: &str, title: &str, confidence: f64) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        return Err(ValidationError::MissingField { subject: subject.to_string(), field: "title" });
    }
    if !confidence.is_finite() || !(0.0..=1.0).contains(&confidence) {
        return Err(ValidationError::ConfidenceOutOfRange {
            subject: subject.to_string(),
            value: confidence,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn doc(meta: &DocumentMetadata, content: &str) -> Document {
        Document::create("doc.md", meta, content, Utc::now())
    }

    #[test]
    fn identical_document_scores_maximally() {
        let meta = DocumentMetadata::new("Alignment")
            .with_topics(["ai", "safety"])
            .with_questions(["Does RLHF scale?"]);
        let content = "## Findings\nReward hacking remains a core alignment failure mode.\n";
        let candidate = doc(&meta, content);

        let scored = SimilarityScorer::new().score(content, &meta, &candidate).unwrap();
        assert!(scored.score >= 0.99, "score was {}", scored.score);
        assert_eq!(scored.topic_overlap, 1.0);
        assert_eq!(scored.content_overlap, 1.0);
        assert_eq!(scored.question_overlap, 1.0);
    }

    #[test]
    fn disjoint_inputs_score_zero() {
        let existing = DocumentMetadata::new("Bees").with_topics(["biology"]);
        let incoming =
            DocumentMetadata::new("Rust").with_topics(["programming"]).with_questions(["Why lifetimes?"]);
        let candidate = doc(&existing, "pollination colonies hives");

        let scored = SimilarityScorer::new()
            .score("borrow checker lifetimes traits", &incoming, &candidate)
            .unwrap();
        assert_eq!(scored.score, 0.0);
    }

    #[test]
    fn empty_topic_sets_are_no_match() {
        let meta = DocumentMetadata::new("Untagged");
        let candidate = doc(&meta, "same words");
        let scored = SimilarityScorer::new().score("same words", &meta, &candidate).unwrap();
        assert_eq!(scored.topic_overlap, 0.0);
        assert!((scored.score - (CONTENT_WEIGHT + QUESTION_WEIGHT)).abs() < 1e-12);
    }

    #[test]
    fn topic_overlap_is_jaccard() {
        let a: BTreeSet<String> = ["ai", "ethics"].map(String::from).into();
        let b: BTreeSet<String> = ["ai", "safety"].map(String::from).into();
        assert!((jaccard(&a, &b) - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(jaccard::<String>(&BTreeSet::new(), &BTreeSet::new()), 0.0);
    }

    #[test]
    fn word_overlap_ignores_case_punctuation_and_stop_words() {
        let similarity = WordOverlap.similarity("The Transformer, and the Attention!", "attention transformer");
        assert_eq!(similarity, 1.0);
        assert_eq!(WordOverlap.similarity("", ""), 0.0);
        assert_eq!(WordOverlap.similarity("the and of", "the and of"), 0.0);
    }

    #[test]
    fn word_overlap_is_symmetric() {
        let a = "gradient descent converges slowly";
        let b = "stochastic gradient descent diverges";
        assert_eq!(WordOverlap.similarity(a, b), WordOverlap.similarity(b, a));
        assert!((WordOverlap.similarity(a, b) - 2.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn question_overlap_uses_case_insensitive_substrings() {
        let new = vec!["does RLHF scale".to_string(), "Who funds it?".to_string()];
        let existing = vec!["Does RLHF scale to superhuman systems?".to_string()];
        assert_eq!(question_overlap(&new, &existing), 0.5);
        assert_eq!(question_overlap(&[], &existing), 0.0);
        assert_eq!(question_overlap(&new, &[]), 0.0);
        assert_eq!(question_overlap(&[], &[]), 1.0);
        assert_eq!(question_overlap(&["  ".to_string()], &[]), 1.0);
    }

    #[test]
    fn document_without_questions_scores_itself_maximally() {
        let meta = DocumentMetadata::new("Rust").with_topics(["rust"]);
        let content = "ownership borrowing lifetimes";
        let scored = SimilarityScorer::new().score(content, &meta, &doc(&meta, content)).unwrap();
        assert_eq!(scored.question_overlap, 1.0);
        assert!(scored.score >= 0.99, "score was {}", scored.score);
    }

    #[test]
    fn blank_title_is_a_validation_error() {
        let meta = DocumentMetadata::new("  ");
        let candidate = doc(&DocumentMetadata::new("Ok"), "x");
        let error = SimilarityScorer::new().score("x", &meta, &candidate).unwrap_err();
        assert!(matches!(error, ValidationError::MissingField { field: "title", .. }));
    }

    #[test]
    fn out_of_range_confidence_is_a_validation_error() {
        let meta = DocumentMetadata::new("Fine").with_confidence(1.5);
        let candidate = doc(&DocumentMetadata::new("Ok"), "x");
        let error = SimilarityScorer::new().score("x", &meta, &candidate).unwrap_err();
        assert!(matches!(error, ValidationError::ConfidenceOutOfRange { .. }));

        let mut broken = doc(&DocumentMetadata::new("Ok"), "x");
        broken.confidence = f64::NAN;
        let error =
            SimilarityScorer::new().score("x", &DocumentMetadata::new("Fine"), &broken).unwrap_err();
        assert!(matches!(error, ValidationError::ConfidenceOutOfRange { .. }));
    }

    struct Constant(f64);

    impl TextSimilarity for Constant {
        fn similarity(&self, _a: &str, _b: &str) -> f64 {
            self.0
        }
    }

    #[test]
    fn pluggable_text_similarity_is_used_and_clamped() {
        let meta = DocumentMetadata::new("X");
        let candidate = doc(&meta, "irrelevant");
        let scored = SimilarityScorer::with_text_similarity(Constant(7.0))
            .score("whatever", &meta, &candidate)
            .unwrap();
        assert_eq!(scored.content_overlap, 1.0);
    }
}
