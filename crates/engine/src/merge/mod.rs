// Document merging: content strategies, metadata union and conflict reporting.

pub mod conflict;
mod integrate;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use folio_common::types::{Document, DocumentMetadata};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::MergeError;

pub use conflict::{
    detect_conflicts, resolve, Conflict, ConflictKind, ConflictUnresolved, Resolution,
    ResolutionPolicy, Severity,
};

/// How new content is combined with an existing document body.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MergeStrategy {
    /// Existing body, a timestamped separator, then the new content.
    Append,
    /// The new content becomes the body.
    Replace,
    /// Section-aware merge keyed on heading text.
    #[default]
    Integrate,
}

impl MergeStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Append => "append",
            Self::Replace => "replace",
            Self::Integrate => "integrate",
        }
    }
}

impl fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MergeStrategy {
    type Err = MergeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "append" => Ok(Self::Append),
            "replace" => Ok(Self::Replace),
            "integrate" => Ok(Self::Integrate),
            _ => Err(MergeError::UnknownStrategy(value.to_string())),
        }
    }
}

/// Audit trail of one merge, stored with the resulting revision.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MergeReport {
    /// Title of the resulting document.
    pub title: String,
    /// Strategy actually applied (after any downgrade).
    pub strategy: MergeStrategy,
    pub conflicts: Vec<Conflict>,
    /// Ordered log of what the merge did.
    pub operations: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// Separator placed between existing and appended content.
pub fn append_separator(now: DateTime<Utc>) -> String {
    format!("\n\n---\n\n<!-- appended {} -->\n\n", now.to_rfc3339_opts(SecondsFormat::Secs, true))
}

/// Stateless merger. Safe to share across threads.
#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentMerger;

impl DocumentMerger {
    pub fn new() -> Self {
        Self
    }

    pub fn merge(
        &self,
        existing: &Document,
        new_content: &str,
        new_metadata: &DocumentMetadata,
        strategy: MergeStrategy,
    ) -> (Document, MergeReport) {
        self.merge_at(existing, new_content, new_metadata, strategy, Utc::now())
    }

    /// Merge with an explicit clock; `now` stamps separators, sub-headings,
    /// conflicts and the updated timestamp.
    pub fn merge_at(
        &self,
        existing: &Document,
        new_content: &str,
        new_metadata: &DocumentMetadata,
        strategy: MergeStrategy,
        now: DateTime<Utc>,
    ) -> (Document, MergeReport) {
        let mut operations = Vec::new();

        let (content, applied) = match strategy {
            MergeStrategy::Append => {
                operations.push("appended new content after separator".to_string());
                (append(&existing.content, new_content, now), MergeStrategy::Append)
            }
            MergeStrategy::Replace => {
                operations.push(format!(
                    "replaced body ({} -> {} bytes)",
                    existing.content.len(),
                    new_content.len()
                ));
                (new_content.to_string(), MergeStrategy::Replace)
            }
            MergeStrategy::Integrate => {
                match integrate::integrate(&existing.content, new_content, now) {
                    Ok(integrated) => {
                        operations.extend(integrated.operations);
                        (integrated.content, MergeStrategy::Integrate)
                    }
                    Err(error) => {
                        warn!(path = %existing.path, %error, "integrate not possible, falling back to append");
                        operations.push(format!("downgraded integrate to append: {error}"));
                        operations.push("appended new content after separator".to_string());
                        (append(&existing.content, new_content, now), MergeStrategy::Append)
                    }
                }
            }
        };

        let conflicts = detect_conflicts(existing, new_content, new_metadata, applied, now);
        let merged = merge_metadata(existing, new_metadata, content, now, &mut operations);

        if !conflicts.is_empty() {
            info!(path = %existing.path, count = conflicts.len(), "merge conflicts detected");
        }
        debug!(path = %existing.path, strategy = %applied, operations = operations.len(), "merge complete");

        let report = MergeReport {
            title: merged.title.clone(),
            strategy: applied,
            conflicts,
            operations,
            timestamp: now,
        };
        (merged, report)
    }
}

fn append(existing: &str, new_content: &str, now: DateTime<Utc>) -> String {
    let separator = append_separator(now);
    let mut out = String::with_capacity(existing.len() + separator.len() + new_content.len());
    out.push_str(existing);
    out.push_str(&separator);
    out.push_str(new_content);
    out
}

/// Topics and questions union, confidence max, source counts summed.
/// Identity, title, status and creation time stay with the existing document.
fn merge_metadata(
    existing: &Document,
    incoming: &DocumentMetadata,
    content: String,
    now: DateTime<Utc>,
    operations: &mut Vec<String>,
) -> Document {
    let mut merged = existing.clone();

    let added_topics = incoming.topics.difference(&existing.topics).count();
    merged.topics.extend(incoming.topics.iter().cloned());

    let mut added_questions = 0;
    for question in &incoming.open_questions {
        if !merged.open_questions.contains(question) {
            merged.open_questions.push(question.clone());
            added_questions += 1;
        }
    }

    merged.confidence = existing.confidence.max(incoming.confidence);
    merged.source_count = existing.source_count.saturating_add(incoming.source_count);
    merged.updated_at = now;
    merged.content = content;

    operations.push(format!(
        "metadata: +{added_topics} topic(s), +{added_questions} question(s), confidence {:.2}, sources {}",
        merged.confidence, merged.source_count
    ));
    merged
}
