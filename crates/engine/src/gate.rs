// Deduplication gate: CREATE, UPDATE or MERGE for a piece of new content.
//
// The gate is a pure function of its inputs and its two thresholds. It keeps
// no state between calls.

use std::cmp::Ordering;
use std::fmt;

use folio_common::types::{Document, DocumentMetadata};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::DedupConfig;
use crate::error::{CandidateScore, ConfigurationError, ScoringError};
use crate::similarity::{
    validate_metadata, SimilarityMatch, SimilarityScorer, TextSimilarity, WordOverlap,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    Update,
    Merge,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Merge => "merge",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated threshold pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    similarity: f64,
    merge: f64,
}

impl Thresholds {
    pub fn new(config: DedupConfig) -> Result<Self, ConfigurationError> {
        config.validate()?;
        Ok(Self { similarity: config.similarity_threshold, merge: config.merge_threshold })
    }

    pub fn similarity(&self) -> f64 {
        self.similarity
    }

    pub fn merge(&self) -> f64 {
        self.merge
    }

    /// `score >= similarity` updates, `score >= merge` merges, anything lower creates.
    pub fn classify(&self, score: f64) -> Action {
        if score >= self.similarity {
            Action::Update
        } else if score >= self.merge {
            Action::Merge
        } else {
            Action::Create
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DeduplicationDecision {
    pub action: Action,
    /// Present iff `action` is not `Create`.
    pub target: Option<Document>,
    /// Winning score, or 1.0 when there were no candidates.
    pub confidence: f64,
    pub reason: String,
    /// Every scored candidate, best first.
    pub matches: Vec<SimilarityMatch>,
}

pub struct DeduplicationGate<S = WordOverlap> {
    thresholds: Thresholds,
    scorer: SimilarityScorer<S>,
}

impl DeduplicationGate<WordOverlap> {
    pub fn new(config: DedupConfig) -> Result<Self, ConfigurationError> {
        Self::with_scorer(config, SimilarityScorer::new())
    }
}

impl<S: TextSimilarity> DeduplicationGate<S> {
    pub fn with_scorer(
        config: DedupConfig,
        scorer: SimilarityScorer<S>,
    ) -> Result<Self, ConfigurationError> {
        Ok(Self { thresholds: Thresholds::new(config)?, scorer })
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    pub fn decide(
        &self,
        new_content: &str,
        new_metadata: &DocumentMetadata,
        candidates: &[Document],
    ) -> Result<DeduplicationDecision, ScoringError> {
        validate_metadata(new_metadata)
            .map_err(|source| ScoringError { source, considered: Vec::new() })?;

        if candidates.is_empty() {
            info!(action = %Action::Create, "no existing documents");
            return Ok(DeduplicationDecision {
                action: Action::Create,
                target: None,
                confidence: 1.0,
                reason: "no existing documents".to_string(),
                matches: Vec::new(),
            });
        }

        let mut matches: Vec<SimilarityMatch> = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            match self.scorer.score(new_content, new_metadata, candidate) {
                Ok(scored) => matches.push(scored),
                Err(source) => {
                    return Err(ScoringError {
                        source,
                        considered: matches
                            .iter()
                            .map(|m| CandidateScore { path: m.candidate.path.clone(), score: m.score })
                            .collect(),
                    })
                }
            }
        }

        matches.sort_by(rank);

        let best = &matches[0];
        let action = self.thresholds.classify(best.score);
        let confidence = best.score;
        let reason = match action {
            Action::Update => format!(
                "`{}` scored {:.3} >= similarity threshold {:.2} ({})",
                best.candidate.path, best.score, self.thresholds.similarity, best.explanation
            ),
            Action::Merge => format!(
                "`{}` scored {:.3}, between merge threshold {:.2} and similarity threshold {:.2} ({})",
                best.candidate.path,
                best.score,
                self.thresholds.merge,
                self.thresholds.similarity,
                best.explanation
            ),
            Action::Create => format!(
                "best candidate `{}` scored {:.3} < merge threshold {:.2}",
                best.candidate.path, best.score, self.thresholds.merge
            ),
        };
        let target = (action != Action::Create).then(|| best.candidate.clone());

        info!(
            action = %action,
            score = confidence,
            candidate = %best.candidate.path,
            candidates = matches.len(),
            "deduplication decision"
        );

        Ok(DeduplicationDecision { action, target, confidence, reason, matches })
    }
}

/// Score descending, then most recently updated first.
fn rank(a: &SimilarityMatch, b: &SimilarityMatch) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| b.candidate.updated_at.cmp(&a.candidate.updated_at))
}
