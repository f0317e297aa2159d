// `folio write`: deduplicate and commit a piece of research content.

use std::io::Read as _;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::Args;
use folio_common::types::{DocumentMetadata, DocumentStatus};
use folio_engine::{Action, DocumentStore, MergeStrategy, WriteOutcome};
use serde::{Deserialize, Serialize};

use super::Context;
use crate::output;

#[derive(Debug, Args)]
pub struct WriteArgs {
    /// Markdown file to commit (`-` reads stdin).
    pub file: PathBuf,

    /// Document title.
    #[arg(long)]
    pub title: String,

    /// Topic tag (repeatable).
    #[arg(long = "topic")]
    pub topics: Vec<String>,

    /// Open research question (repeatable).
    #[arg(long = "question")]
    pub questions: Vec<String>,

    /// Confidence in the findings, 0..=1.
    #[arg(long, default_value_t = 0.5)]
    pub confidence: f64,

    /// Number of sources consulted.
    #[arg(long, default_value_t = 0)]
    pub sources: u32,

    /// Query that produced the content; recorded as the purpose of new documents.
    #[arg(long, default_value = "")]
    pub query: String,

    /// Purpose recorded on creation (defaults to `--query`).
    #[arg(long)]
    pub purpose: Option<String>,

    /// Lifecycle status: draft or published.
    #[arg(long, default_value = "draft")]
    pub status: DocumentStatus,
}

impl WriteArgs {
    fn metadata(&self) -> DocumentMetadata {
        let mut metadata = DocumentMetadata::new(self.title.clone())
            .with_topics(self.topics.iter().map(|topic| topic.trim().to_lowercase()))
            .with_questions(self.questions.iter().cloned())
            .with_confidence(self.confidence)
            .with_source_count(self.sources)
            .with_status(self.status);
        if let Some(purpose) = &self.purpose {
            metadata = metadata.with_purpose(purpose.clone());
        }
        metadata
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WriteResult {
    pub action: Action,
    pub path: String,
    pub revision: String,
    pub score: f64,
    pub reason: String,
    #[serde(default)]
    pub strategy: Option<MergeStrategy>,
    #[serde(default)]
    pub conflicts: Vec<ConflictLine>,
    #[serde(default)]
    pub operations: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConflictLine {
    pub kind: String,
    pub severity: String,
    pub field: String,
    pub existing_value: String,
    pub new_value: String,
}

impl From<WriteOutcome> for WriteResult {
    fn from(outcome: WriteOutcome) -> Self {
        let (strategy, conflicts, operations) = match outcome.report {
            Some(report) => (
                Some(report.strategy),
                report
                    .conflicts
                    .into_iter()
                    .map(|conflict| ConflictLine {
                        kind: conflict.kind.to_string(),
                        severity: conflict.severity.to_string(),
                        field: conflict.field,
                        existing_value: conflict.existing_value,
                        new_value: conflict.new_value,
                    })
                    .collect(),
                report.operations,
            ),
            None => (None, Vec::new(), Vec::new()),
        };
        Self {
            action: outcome.action,
            path: outcome.path,
            revision: outcome.revision,
            score: outcome.decision.confidence,
            reason: outcome.decision.reason,
            strategy,
            conflicts,
            operations,
        }
    }
}

pub fn run(ctx: &Context, args: WriteArgs) -> anyhow::Result<()> {
    let content = read_content(&args.file)?;
    let store = ctx.open_store()?;
    let result = execute(&store, &args, &content)?;

    if !result.conflicts.is_empty() {
        output::print_warning(
            ctx.format,
            "CONFLICTS_RECORDED",
            &format!("{} conflict(s) recorded in {}; review them with `folio history`", result.conflicts.len(), result.path),
        );
    }
    output::print_output(ctx.format, &result, format_human)?;
    Ok(())
}

fn execute(store: &DocumentStore, args: &WriteArgs, content: &str) -> anyhow::Result<WriteResult> {
    let outcome = store
        .decide_and_commit(content, &args.metadata(), &args.query)
        .with_context(|| format!("failed to write `{}`", args.title))?;
    Ok(outcome.into())
}

fn read_content(file: &Path) -> anyhow::Result<String> {
    if file.as_os_str() == "-" {
        let mut content = String::new();
        std::io::stdin().read_to_string(&mut content).context("failed to read stdin")?;
        return Ok(content);
    }
    std::fs::read_to_string(file).with_context(|| format!("failed to read `{}`", file.display()))
}

fn format_human(result: &WriteResult) -> String {
    let mut lines = vec![format!(
        "{} {} @ {}",
        result.action,
        result.path,
        &result.revision[..result.revision.len().min(12)]
    )];
    lines.push(format!("  {}", result.reason));
    if let Some(strategy) = result.strategy {
        lines.push(format!("  strategy: {strategy}"));
    }
    for operation in &result.operations {
        lines.push(format!("  - {operation}"));
    }
    for conflict in &result.conflicts {
        lines.push(format!(
            "  ! {} {} `{}`: {} -> {}",
            conflict.severity, conflict.kind, conflict.field, conflict.existing_value, conflict.new_value
        ));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support;
    use crate::output::OutputFormat;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: WriteArgs,
    }

    fn parse(argv: &[&str]) -> WriteArgs {
        Harness::try_parse_from(std::iter::once("write").chain(argv.iter().copied()))
            .expect("arguments should parse")
            .args
    }

    #[test]
    fn arguments_build_metadata() {
        let args = parse(&[
            "notes.md",
            "--title",
            "AI Safety",
            "--topic",
            " AI ",
            "--topic",
            "alignment",
            "--question",
            "Is it robust?",
            "--confidence",
            "0.8",
            "--sources",
            "3",
            "--status",
            "published",
        ]);
        let metadata = args.metadata();
        assert_eq!(metadata.title, "AI Safety");
        assert_eq!(metadata.topics.iter().map(String::as_str).collect::<Vec<_>>(), ["ai", "alignment"]);
        assert_eq!(metadata.open_questions, ["Is it robust?"]);
        assert_eq!(metadata.confidence, 0.8);
        assert_eq!(metadata.source_count, 3);
        assert_eq!(metadata.status, DocumentStatus::Published);
        assert_eq!(metadata.purpose, None);
    }

    #[test]
    fn unknown_status_is_rejected() {
        let parsed = Harness::try_parse_from(["write", "a.md", "--title", "A", "--status", "lost"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn execute_creates_then_updates() {
        let (_temp, store) = test_support::store();
        let args = parse(&["a.md", "--title", "Caching", "--topic", "perf", "--question", "Why slow?"]);
        let content = "# Caching\n\n## Findings\nwarm cache hits\n";

        let created = execute(&store, &args, content).unwrap();
        assert_eq!(created.action, Action::Create);
        assert_eq!(created.path, "caching.md");
        assert!(created.strategy.is_none());

        let updated = execute(&store, &args, content).unwrap();
        assert_eq!(updated.action, Action::Update);
        assert_eq!(updated.strategy, Some(MergeStrategy::Integrate));
        assert!(updated.conflicts.is_empty());
    }

    #[test]
    fn human_format_lists_operations_and_conflicts() {
        let result = WriteResult {
            action: Action::Merge,
            path: "ai.md".into(),
            revision: "0123456789abcdef".into(),
            score: 0.75,
            reason: "`ai.md` scored 0.750".into(),
            strategy: Some(MergeStrategy::Integrate),
            conflicts: vec![ConflictLine {
                kind: "metadata".into(),
                severity: "low".into(),
                field: "topics".into(),
                existing_value: "ai, ethics".into(),
                new_value: "ai, safety".into(),
            }],
            operations: vec!["section `Risks` added".into()],
        };
        let text = format_human(&result);
        assert!(text.starts_with("merge ai.md @ 0123456789ab\n"), "{text}");
        assert!(text.contains("strategy: integrate"));
        assert!(text.contains("- section `Risks` added"));
        assert!(text.contains("! low metadata `topics`: ai, ethics -> ai, safety"));
    }

    #[test]
    fn json_format_roundtrips() {
        let result = WriteResult {
            action: Action::Create,
            path: "a.md".into(),
            revision: "abc".into(),
            score: 1.0,
            reason: "no existing documents".into(),
            strategy: None,
            conflicts: Vec::new(),
            operations: Vec::new(),
        };
        let mut buf = Vec::new();
        output::write_output(&mut buf, OutputFormat::Json, &result, format_human).unwrap();
        let parsed: WriteResult = serde_json::from_slice(&buf).unwrap();
        assert_eq!(parsed, result);
    }
}
