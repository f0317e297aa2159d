// Conflict detection and explicit resolution.
//
// Conflicts annotate a merge; they never block it and are never resolved
// implicitly. `resolve` with `ResolutionPolicy::Manual` hands the conflict
// back to the caller as `ConflictUnresolved`.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use folio_common::section::split_blocks;
use folio_common::types::{Document, DocumentMetadata};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::MergeStrategy;
use crate::similarity::{jaccard, normalized_tokens};

/// Confidence gap above which a conflict is recorded.
pub const CONFIDENCE_CONFLICT_GAP: f64 = 0.15;
/// Confidence gap above which the conflict is high severity.
pub const CONFIDENCE_HIGH_GAP: f64 = 0.30;
/// Topic Jaccard below which the documents likely cover different subjects.
pub const TOPIC_DIVERGENCE: f64 = 0.30;
/// Topic Jaccard below which partial divergence is still worth a review.
pub const TOPIC_PARTIAL_DIVERGENCE: f64 = 0.50;

const EPSILON: f64 = 1e-9;

/// Opposing claim terms. Either side may hold either term.
pub const OPPOSING_TERMS: &[(&str, &str)] = &[
    ("supports", "contradicts"),
    ("true", "false"),
    ("confirmed", "refuted"),
    ("increases", "decreases"),
    ("effective", "ineffective"),
    ("proven", "disproven"),
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    Metadata,
    Content,
    Structural,
    Confidence,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        })
    }
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Metadata => "metadata",
            Self::Content => "content",
            Self::Structural => "structural",
            Self::Confidence => "confidence",
        })
    }
}

/// A disagreement between the existing document and the incoming content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Conflict {
    pub kind: ConflictKind,
    pub field: String,
    pub existing_value: String,
    pub new_value: String,
    pub severity: Severity,
    pub detected_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionPolicy {
    PreferExisting,
    PreferNew,
    Manual,
}

/// A conflict that needs a human decision.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{} conflict on `{}` requires manual resolution", conflict.kind, conflict.field)]
pub struct ConflictUnresolved {
    pub conflict: Conflict,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Resolved(String),
    Unresolved(ConflictUnresolved),
}

/// Apply `policy` to a single conflict.
pub fn resolve(conflict: &Conflict, policy: ResolutionPolicy) -> Resolution {
    match policy {
        ResolutionPolicy::PreferExisting => Resolution::Resolved(conflict.existing_value.clone()),
        ResolutionPolicy::PreferNew => Resolution::Resolved(conflict.new_value.clone()),
        ResolutionPolicy::Manual => {
            Resolution::Unresolved(ConflictUnresolved { conflict: conflict.clone() })
        }
    }
}

/// Every conflict between `existing` and the incoming content, in detection
/// order: metadata, confidence, topics, structure, content.
///
/// Content conflicts are only looked for when `strategy` interleaves or
/// replaces existing text; an append keeps both bodies intact.
pub fn detect_conflicts(
    existing: &Document,
    new_content: &str,
    new_metadata: &DocumentMetadata,
    strategy: MergeStrategy,
    now: DateTime<Utc>,
) -> Vec<Conflict> {
    let mut found = Vec::new();
    let mut record = |kind, field: &str, existing_value: String, new_value: String, severity| {
        found.push(Conflict {
            kind,
            field: field.to_string(),
            existing_value,
            new_value,
            severity,
            detected_at: now,
        });
    };

    if existing.title.trim() != new_metadata.title.trim() {
        record(
            ConflictKind::Metadata,
            "title",
            existing.title.clone(),
            new_metadata.title.clone(),
            Severity::Low,
        );
    }
    if existing.status != new_metadata.status {
        record(
            ConflictKind::Metadata,
            "status",
            existing.status.to_string(),
            new_metadata.status.to_string(),
            Severity::Medium,
        );
    }

    let gap = (existing.confidence - new_metadata.confidence).abs();
    if gap > CONFIDENCE_CONFLICT_GAP + EPSILON {
        let severity =
            if gap > CONFIDENCE_HIGH_GAP + EPSILON { Severity::High } else { Severity::Medium };
        record(
            ConflictKind::Confidence,
            "confidence",
            format!("{:.2}", existing.confidence),
            format!("{:.2}", new_metadata.confidence),
            severity,
        );
    }

    // Two untagged documents have nothing to disagree on.
    if !existing.topics.is_empty() || !new_metadata.topics.is_empty() {
        let overlap = jaccard(&existing.topics, &new_metadata.topics);
        let severity = if overlap < TOPIC_DIVERGENCE {
            Some(Severity::Medium)
        } else if overlap < TOPIC_PARTIAL_DIVERGENCE {
            Some(Severity::Low)
        } else {
            None
        };
        if let Some(severity) = severity {
            record(
                ConflictKind::Metadata,
                "topics",
                join(&existing.topics),
                join(&new_metadata.topics),
                severity,
            );
        }
    }

    for pair in paired_sections(&existing.content, new_content) {
        if let Some((existing_level, new_level)) = pair.levels {
            if existing_level != new_level {
                record(
                    ConflictKind::Structural,
                    &pair.field,
                    format!("h{existing_level}"),
                    format!("h{new_level}"),
                    Severity::Low,
                );
            }
        }

        if strategy == MergeStrategy::Append {
            continue;
        }
        let existing_terms = normalized_tokens(&pair.existing);
        let new_terms = normalized_tokens(&pair.incoming);
        for (existing_term, new_term) in opposing_claims(&existing_terms, &new_terms) {
            record(
                ConflictKind::Content,
                &pair.field,
                existing_term.to_string(),
                new_term.to_string(),
                Severity::Low,
            );
        }
    }

    found
}

struct SectionPair {
    field: String,
    levels: Option<(u8, u8)>,
    existing: String,
    incoming: String,
}

/// Sections compared for content conflicts: each incoming section with the
/// existing section of the same heading, or the whole texts when either side
/// has no headings.
fn paired_sections(existing: &str, incoming: &str) -> Vec<SectionPair> {
    let base = split_blocks(existing);
    let new = split_blocks(incoming);

    if !base.has_headings() || !new.has_headings() {
        return vec![SectionPair {
            field: "content".to_string(),
            levels: None,
            existing: existing.to_string(),
            incoming: incoming.to_string(),
        }];
    }

    let mut pairs = Vec::new();
    if !base.preamble.trim().is_empty() && !new.preamble.trim().is_empty() {
        pairs.push(SectionPair {
            field: "preamble".to_string(),
            levels: None,
            existing: base.preamble.clone(),
            incoming: new.preamble.clone(),
        });
    }

    let mut taken = Vec::new();
    for block in &new.blocks {
        if let Some(index) = base.position_of(&block.heading, &taken) {
            taken.push(index);
            let matched = &base.blocks[index];
            pairs.push(SectionPair {
                field: format!("section `{}`", block.heading),
                levels: Some((matched.level, block.level)),
                existing: matched.body.clone(),
                incoming: block.body.clone(),
            });
        }
    }
    pairs
}

fn opposing_claims(
    existing: &HashSet<String>,
    incoming: &HashSet<String>,
) -> Vec<(&'static str, &'static str)> {
    let mut claims = Vec::new();
    for &(left, right) in OPPOSING_TERMS {
        if existing.contains(left) && incoming.contains(right) {
            claims.push((left, right));
        }
        if existing.contains(right) && incoming.contains(left) {
            claims.push((right, left));
        }
    }
    claims
}

fn join<'a>(values: impl IntoIterator<Item = &'a String>) -> String {
    values.into_iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}
