// SQLite-backed document index at `<store_root>/.folio/index.db`.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use folio_common::types::{Document, DocumentStatus};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use tracing::debug;
use uuid::Uuid;

use super::DocumentIndex;
use crate::error::IndexError;

pub const INDEX_DB_FILE: &str = "index.db";

const MIGRATION_V1_SQL: &str = r#"
CREATE TABLE documents (
    path            TEXT PRIMARY KEY,
    doc_id          TEXT NOT NULL,
    title           TEXT NOT NULL,
    open_questions  TEXT NOT NULL,
    confidence      REAL NOT NULL,
    source_count    INTEGER NOT NULL DEFAULT 0,
    status          TEXT NOT NULL CHECK (status IN ('draft', 'published', 'archived')),
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL,
    content         TEXT NOT NULL
);

CREATE TABLE document_topics (
    path    TEXT NOT NULL REFERENCES documents (path) ON DELETE CASCADE,
    topic   TEXT NOT NULL,
    PRIMARY KEY (path, topic)
);

CREATE INDEX document_topics_topic_idx
    ON document_topics (topic);
"#;

const MIGRATIONS: &[(i64, &str)] = &[(1, MIGRATION_V1_SQL)];

const DOCUMENT_COLUMNS: &str = "d.path, d.doc_id, d.title, d.open_questions, d.confidence, \
     d.source_count, d.status, d.created_at, d.updated_at, d.content";

#[derive(Debug)]
pub struct MetaIndex {
    conn: Mutex<Connection>,
}

impl MetaIndex {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, IndexError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|source| IndexError::Io { path: parent.to_path_buf(), source })?;
        }
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, IndexError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(mut conn: Connection) -> Result<Self, IndexError> {
        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;
            PRAGMA busy_timeout = 5000;
            ",
        )?;
        ensure_migration_table(&conn)?;
        apply_pending_migrations(&mut conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    pub fn schema_version(&self) -> Result<i64, IndexError> {
        let conn = self.conn.lock().map_err(|_| IndexError::LockPoisoned)?;
        current_schema_version(&conn)
    }

    /// Topics for each document are kept in their own table for filtering.
    fn load_topics(conn: &Connection, path: &str) -> Result<BTreeSet<String>, IndexError> {
        let mut statement =
            conn.prepare_cached("SELECT topic FROM document_topics WHERE path = ?1")?;
        let topics = statement
            .query_map(params![path], |row| row.get::<_, String>(0))?
            .collect::<Result<BTreeSet<_>, _>>()?;
        Ok(topics)
    }
}

impl DocumentIndex for MetaIndex {
    fn find_candidates(
        &self,
        topics: Option<&BTreeSet<String>>,
    ) -> Result<Vec<Document>, IndexError> {
        let conn = self.conn.lock().map_err(|_| IndexError::LockPoisoned)?;

        let rows = match topics {
            Some(filter) if !filter.is_empty() => {
                let placeholders = vec!["?"; filter.len()].join(", ");
                let sql = format!(
                    "SELECT DISTINCT {DOCUMENT_COLUMNS} FROM documents d \
                     JOIN document_topics t ON t.path = d.path \
                     WHERE d.status != 'archived' AND t.topic IN ({placeholders}) \
                     ORDER BY d.updated_at DESC, d.path"
                );
                let mut statement = conn.prepare(&sql)?;
                let rows = statement
                    .query_map(params_from_iter(filter.iter()), RawDocument::from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
            _ => {
                let sql = format!(
                    "SELECT {DOCUMENT_COLUMNS} FROM documents d \
                     WHERE d.status != 'archived' ORDER BY d.updated_at DESC, d.path"
                );
                let mut statement = conn.prepare(&sql)?;
                let rows = statement
                    .query_map([], RawDocument::from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
        };

        rows.into_iter()
            .map(|raw| {
                let topics = Self::load_topics(&conn, &raw.path)?;
                raw.into_document(topics)
            })
            .collect()
    }

    fn get_by_path(&self, path: &str) -> Result<Option<Document>, IndexError> {
        let conn = self.conn.lock().map_err(|_| IndexError::LockPoisoned)?;
        let raw = conn
            .query_row(
                &format!("SELECT {DOCUMENT_COLUMNS} FROM documents d WHERE d.path = ?1"),
                params![path],
                RawDocument::from_row,
            )
            .optional()?;
        match raw {
            Some(raw) => {
                let topics = Self::load_topics(&conn, path)?;
                Ok(Some(raw.into_document(topics)?))
            }
            None => Ok(None),
        }
    }

    fn upsert(&self, document: &Document) -> Result<(), IndexError> {
        let questions = serde_json::to_string(&document.open_questions).map_err(|error| {
            IndexError::Corrupt { path: document.path.clone(), reason: error.to_string() }
        })?;

        let mut conn = self.conn.lock().map_err(|_| IndexError::LockPoisoned)?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO documents (
                 path, doc_id, title, open_questions, confidence, source_count,
                 status, created_at, updated_at, content
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT (path) DO UPDATE SET
                 doc_id = excluded.doc_id,
                 title = excluded.title,
                 open_questions = excluded.open_questions,
                 confidence = excluded.confidence,
                 source_count = excluded.source_count,
                 status = excluded.status,
                 created_at = excluded.created_at,
                 updated_at = excluded.updated_at,
                 content = excluded.content",
            params![
                document.path,
                document.id.to_string(),
                document.title,
                questions,
                document.confidence,
                document.source_count,
                document.status.as_str(),
                document.created_at.to_rfc3339(),
                document.updated_at.to_rfc3339(),
                document.content,
            ],
        )?;
        tx.execute("DELETE FROM document_topics WHERE path = ?1", params![document.path])?;
        {
            let mut insert =
                tx.prepare_cached("INSERT INTO document_topics (path, topic) VALUES (?1, ?2)")?;
            for topic in &document.topics {
                insert.execute(params![document.path, topic])?;
            }
        }
        tx.commit()?;

        debug!(path = %document.path, status = %document.status, "indexed document");
        Ok(())
    }
}

struct RawDocument {
    path: String,
    doc_id: String,
    title: String,
    open_questions: String,
    confidence: f64,
    source_count: u32,
    status: String,
    created_at: String,
    updated_at: String,
    content: String,
}

impl RawDocument {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            path: row.get(0)?,
            doc_id: row.get(1)?,
            title: row.get(2)?,
            open_questions: row.get(3)?,
            confidence: row.get(4)?,
            source_count: row.get(5)?,
            status: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
            content: row.get(9)?,
        })
    }

    fn into_document(self, topics: BTreeSet<String>) -> Result<Document, IndexError> {
        let corrupt = |reason: String| IndexError::Corrupt { path: self.path.clone(), reason };
        let id = Uuid::parse_str(&self.doc_id).map_err(|error| corrupt(error.to_string()))?;
        let open_questions: Vec<String> =
            serde_json::from_str(&self.open_questions).map_err(|error| corrupt(error.to_string()))?;
        let status: DocumentStatus =
            self.status.parse().map_err(|error: folio_common::types::UnknownStatus| {
                corrupt(error.to_string())
            })?;
        let created_at = parse_timestamp(&self.created_at).map_err(&corrupt)?;
        let updated_at = parse_timestamp(&self.updated_at).map_err(&corrupt)?;

        Ok(Document {
            id,
            path: self.path,
            title: self.title,
            topics,
            open_questions,
            confidence: self.confidence,
            source_count: self.source_count,
            status,
            created_at,
            updated_at,
            content: self.content,
        })
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value)
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|error| format!("invalid timestamp `{value}`: {error}"))
}

fn ensure_migration_table(conn: &Connection) -> Result<(), IndexError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY,
            applied_at  TEXT NOT NULL
        );
        ",
    )?;
    Ok(())
}

fn current_schema_version(conn: &Connection) -> Result<i64, IndexError> {
    Ok(conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_migrations", [], |row| {
        row.get(0)
    })?)
}

fn apply_pending_migrations(conn: &mut Connection) -> Result<(), IndexError> {
    let mut current_version = current_schema_version(conn)?;

    for (version, sql) in MIGRATIONS {
        if *version <= current_version {
            continue;
        }

        let tx = conn.transaction()?;
        tx.execute_batch(sql)?;
        tx.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, datetime('now'))",
            params![version],
        )?;
        tx.commit()?;
        debug!(version, "applied index migration");
        current_version = *version;
    }

    Ok(())
}
