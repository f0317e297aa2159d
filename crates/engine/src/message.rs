// Structured commit messages.
//
// Every revision carries one of these templates so history stays
// machine-parseable:
//
//   Create: <title>\n\nPurpose: <purpose>\nTopics: <a, b>\nStatus: <status>\nConfidence: <0.00>
//   Update: <title>\n\n<change summary>
//   Merge: <title>\n\nConflicts: <n>\nStrategy: <strategy>
//   Restore: <title> to <handle>
//   Backup before restore: <title>

use std::fmt;

use folio_common::types::{DocumentMetadata, DocumentStatus};
use thiserror::Error;

use crate::merge::{MergeReport, MergeStrategy};

#[derive(Debug, Clone, PartialEq)]
pub enum CommitMessage {
    Create {
        title: String,
        purpose: String,
        topics: Vec<String>,
        status: DocumentStatus,
        confidence: f64,
    },
    Update {
        title: String,
        summary: String,
    },
    Merge {
        title: String,
        conflicts: usize,
        strategy: MergeStrategy,
    },
    Restore {
        title: String,
        handle: String,
    },
    Backup {
        title: String,
    },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MessageParseError {
    #[error("unrecognised commit message header `{0}`")]
    UnknownHeader(String),

    #[error("commit message is missing the `{0}` line")]
    MissingField(&'static str),

    #[error("commit message field `{field}` has invalid value `{value}`")]
    InvalidField { field: &'static str, value: String },
}

impl CommitMessage {
    pub fn create(metadata: &DocumentMetadata, purpose: impl Into<String>) -> Self {
        Self::Create {
            title: metadata.title.clone(),
            purpose: purpose.into(),
            topics: metadata.topics.iter().cloned().collect(),
            status: metadata.status,
            confidence: metadata.confidence,
        }
    }

    /// `Update:` message summarising the operations of a merge report.
    pub fn update(report: &MergeReport) -> Self {
        let mut summary = format!("Strategy: {}", report.strategy);
        for operation in &report.operations {
            summary.push_str("\n- ");
            summary.push_str(&single_line(operation));
        }
        Self::Update { title: report.title.clone(), summary }
    }

    pub fn merge(report: &MergeReport) -> Self {
        Self::Merge {
            title: report.title.clone(),
            conflicts: report.conflicts.len(),
            strategy: report.strategy,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Create { .. } => "create",
            Self::Update { .. } => "update",
            Self::Merge { .. } => "merge",
            Self::Restore { .. } => "restore",
            Self::Backup { .. } => "backup",
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Self::Create { title, .. }
            | Self::Update { title, .. }
            | Self::Merge { title, .. }
            | Self::Restore { title, .. }
            | Self::Backup { title } => title,
        }
    }

    pub fn render(&self) -> String {
        match self {
            Self::Create { title, purpose, topics, status, confidence } => format!(
                "Create: {}\n\nPurpose: {}\nTopics: {}\nStatus: {status}\nConfidence: {confidence:.2}",
                single_line(title),
                single_line(purpose),
                topics.iter().map(|topic| single_line(topic)).collect::<Vec<_>>().join(", "),
            ),
            Self::Update { title, summary } => format!("Update: {}\n\n{summary}", single_line(title)),
            Self::Merge { title, conflicts, strategy } => {
                format!("Merge: {}\n\nConflicts: {conflicts}\nStrategy: {strategy}", single_line(title))
            }
            Self::Restore { title, handle } => format!("Restore: {} to {handle}", single_line(title)),
            Self::Backup { title } => format!("Backup before restore: {}", single_line(title)),
        }
    }

    pub fn parse(message: &str) -> Result<Self, MessageParseError> {
        let (header, body) = match message.split_once("\n\n") {
            Some((header, body)) => (header, body),
            None => (message, ""),
        };

        if let Some(title) = header.strip_prefix("Backup before restore: ") {
            return Ok(Self::Backup { title: title.to_string() });
        }
        if let Some(rest) = header.strip_prefix("Restore: ") {
            let (title, handle) = rest
                .rsplit_once(" to ")
                .ok_or(MessageParseError::MissingField("to <handle>"))?;
            return Ok(Self::Restore { title: title.to_string(), handle: handle.to_string() });
        }
        if let Some(title) = header.strip_prefix("Update: ") {
            return Ok(Self::Update { title: title.to_string(), summary: body.to_string() });
        }
        if let Some(title) = header.strip_prefix("Merge: ") {
            let conflicts = field(body, "Conflicts")?;
            let conflicts = conflicts.parse().map_err(|_| MessageParseError::InvalidField {
                field: "Conflicts",
                value: conflicts.to_string(),
            })?;
            let strategy = field(body, "Strategy")?;
            let strategy = strategy.parse().map_err(|_| MessageParseError::InvalidField {
                field: "Strategy",
                value: strategy.to_string(),
            })?;
            return Ok(Self::Merge { title: title.to_string(), conflicts, strategy });
        }
        if let Some(title) = header.strip_prefix("Create: ") {
            let topics = field(body, "Topics")?;
            let status = field(body, "Status")?;
            let confidence = field(body, "Confidence")?;
            return Ok(Self::Create {
                title: title.to_string(),
                purpose: field(body, "Purpose")?.to_string(),
                topics: topics
                    .split(", ")
                    .filter(|topic| !topic.is_empty())
                    .map(str::to_string)
                    .collect(),
                status: status.parse().map_err(|_| MessageParseError::InvalidField {
                    field: "Status",
                    value: status.to_string(),
                })?,
                confidence: confidence.parse().map_err(|_| MessageParseError::InvalidField {
                    field: "Confidence",
                    value: confidence.to_string(),
                })?,
            });
        }

        Err(MessageParseError::UnknownHeader(header.lines().next().unwrap_or_default().to_string()))
    }
}

impl fmt::Display for CommitMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

fn field<'a>(body: &'a str, name: &'static str) -> Result<&'a str, MessageParseError> {
    body.lines()
        .find_map(|line| line.strip_prefix(name).and_then(|rest| rest.strip_prefix(": ")))
        .or_else(|| body.lines().find(|line| *line == format!("{name}:")).map(|_| ""))
        .ok_or(MessageParseError::MissingField(name))
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
