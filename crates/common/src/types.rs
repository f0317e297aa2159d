// Core domain types shared across all folio crates.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a research document. Documents are never deleted,
/// only archived.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

impl DocumentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Archived => "archived",
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentStatus {
    type Err = UnknownStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(Self::Draft),
            "published" => Ok(Self::Published),
            "archived" => Ok(Self::Archived),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown document status `{0}`")]
pub struct UnknownStatus(pub String);

/// Metadata accompanying a freshly produced piece of research content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentMetadata {
    pub title: String,
    /// Why the content was produced; rendered into `Create:` commit messages.
    #[serde(default)]
    pub purpose: Option<String>,
    #[serde(default)]
    pub topics: BTreeSet<String>,
    #[serde(default)]
    pub open_questions: Vec<String>,
    pub confidence: f64,
    #[serde(default)]
    pub source_count: u32,
    #[serde(default)]
    pub status: DocumentStatus,
}

impl DocumentMetadata {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            purpose: None,
            topics: BTreeSet::new(),
            open_questions: Vec::new(),
            confidence: 0.5,
            source_count: 0,
            status: DocumentStatus::Draft,
        }
    }

    pub fn with_topics<I, S>(mut self, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.topics = topics.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_questions<I, S>(mut self, questions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.open_questions = questions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_source_count(mut self, source_count: u32) -> Self {
        self.source_count = source_count;
        self
    }

    pub fn with_purpose(mut self, purpose: impl Into<String>) -> Self {
        self.purpose = Some(purpose.into());
        self
    }

    pub fn with_status(mut self, status: DocumentStatus) -> Self {
        self.status = status;
        self
    }
}

/// A unit of research content tracked by the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: Uuid,
    /// Store-relative, normalized path (e.g. `ai-alignment.md`).
    pub path: String,
    pub title: String,
    #[serde(default)]
    pub topics: BTreeSet<String>,
    #[serde(default)]
    pub open_questions: Vec<String>,
    pub confidence: f64,
    #[serde(default)]
    pub source_count: u32,
    pub status: DocumentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Current markdown body.
    #[serde(default)]
    pub content: String,
}

impl Document {
    /// Build a brand-new document from incoming metadata and content.
    pub fn create(
        path: impl Into<String>,
        metadata: &DocumentMetadata,
        content: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            path: path.into(),
            title: metadata.title.clone(),
            topics: metadata.topics.clone(),
            open_questions: metadata.open_questions.clone(),
            confidence: metadata.confidence,
            source_count: metadata.source_count,
            status: metadata.status,
            created_at: now,
            updated_at: now,
            content: content.into(),
        }
    }

    /// The document's own metadata, as if it were arriving fresh.
    pub fn metadata(&self) -> DocumentMetadata {
        DocumentMetadata {
            title: self.title.clone(),
            purpose: None,
            topics: self.topics.clone(),
            open_questions: self.open_questions.clone(),
            confidence: self.confidence,
            source_count: self.source_count,
            status: self.status,
        }
    }

    pub fn is_archived(&self) -> bool {
        self.status == DocumentStatus::Archived
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_display_and_parse() {
        for status in [DocumentStatus::Draft, DocumentStatus::Published, DocumentStatus::Archived] {
            assert_eq!(status.to_string().parse::<DocumentStatus>(), Ok(status));
        }
        assert_eq!(" Published ".parse::<DocumentStatus>(), Ok(DocumentStatus::Published));
        assert!("deleted".parse::<DocumentStatus>().is_err());
    }

    #[test]
    fn document_metadata_mirrors_document_fields() {
        let meta = DocumentMetadata::new("Alignment")
            .with_topics(["ai", "safety"])
            .with_questions(["Is RLHF enough?"])
            .with_confidence(0.7)
            .with_source_count(3);
        let doc = Document::create("alignment.md", &meta, "# Alignment\n", Utc::now());

        let round = doc.metadata();
        assert_eq!(round.title, "Alignment");
        assert_eq!(round.topics, meta.topics);
        assert_eq!(round.open_questions, meta.open_questions);
        assert_eq!(round.source_count, 3);
        assert!(!doc.is_archived());
    }

    #[test]
    fn metadata_deserializes_with_defaults() {
        let meta: DocumentMetadata =
            serde_json::from_str(r#"{"title":"T","confidence":0.4}"#).expect("json should parse");
        assert!(meta.topics.is_empty());
        assert_eq!(meta.status, DocumentStatus::Draft);
        assert_eq!(meta.source_count, 0);
    }
}
