//! Relational [`ProjectStore`] backed by SQLite.
//!
//! Uniqueness of project numbers, document identities and per-project
//! sequence numbers is enforced by the schema, not by callers. Units of work
//! open with `BEGIN IMMEDIATE`, which takes the database write lock up front,
//! so two processes sharing one database file cannot both allocate the same
//! sequence number.

// SQLite stores integers as i64; sequence numbers and counts are never negative.
#![allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::contract::{ProjectStore, UnitOfWork};
use super::error::{StoreError, StoreResult};
use super::records::{
    DocumentPlacement, NewDocument, NewProject, NewVersion, ProjectRecord, ProjectStatus,
    StoreStats, StoredDocument, VersionRecord,
};
use crate::types::identifiers::{
    ContentHash, DocumentRowId, IdentityKey, MetadataKey, ProjectId, ProjectNumber, SourceTag,
    VersionId,
};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = r"
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS projects (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_number TEXT NOT NULL UNIQUE,
    title TEXT NOT NULL,
    authors TEXT,
    legislative_period TEXT NOT NULL,
    status TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS documents (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source_tag TEXT NOT NULL,
    identity_key TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    metadata_key TEXT NOT NULL,
    title TEXT NOT NULL,
    url TEXT NOT NULL,
    published_at TEXT NOT NULL,
    kind TEXT NOT NULL,
    UNIQUE(source_tag, identity_key)
);

CREATE INDEX IF NOT EXISTS idx_documents_content_hash ON documents(content_hash);
CREATE INDEX IF NOT EXISTS idx_documents_metadata_key ON documents(metadata_key);

CREATE TABLE IF NOT EXISTS versions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id INTEGER NOT NULL REFERENCES projects(id),
    document_id INTEGER NOT NULL UNIQUE REFERENCES documents(id),
    sequence INTEGER NOT NULL,
    raw_content TEXT,
    change_description TEXT,
    version_date TEXT NOT NULL,
    UNIQUE(project_id, sequence)
);
";

const DOCUMENT_COLUMNS: &str =
    "id, source_tag, identity_key, content_hash, metadata_key, title, url, published_at, kind";

const PROJECT_COLUMNS: &str =
    "id, project_number, title, authors, legislative_period, status, created_at";

/// SQLite-backed store. Cloning shares the connection; separate
/// [`SqliteStore::open`] calls on one file behave like separate processes.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Opens or creates a database file and applies the schema.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path.as_ref()).map_err(map_sqlite)?;
        // WAL lets readers proceed while a unit of work holds the write lock.
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))
            .map_err(map_sqlite)?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory().map_err(map_sqlite)?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> StoreResult<Self> {
        conn.busy_timeout(BUSY_TIMEOUT).map_err(map_sqlite)?;
        conn.execute_batch(SCHEMA).map_err(map_sqlite)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

fn map_sqlite(err: rusqlite::Error) -> StoreError {
    match &err {
        rusqlite::Error::SqliteFailure(failure, _) => match failure.code {
            ErrorCode::ConstraintViolation => StoreError::Conflict(err.to_string()),
            ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked | ErrorCode::CannotOpen => {
                StoreError::Unavailable(err.to_string())
            }
            _ => StoreError::Backend(err.to_string()),
        },
        _ => StoreError::Backend(err.to_string()),
    }
}

fn conversion_error(idx: usize, err: StoreError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn document_from_row(row: &Row<'_>) -> rusqlite::Result<StoredDocument> {
    Ok(StoredDocument {
        id: DocumentRowId(row.get(0)?),
        source: SourceTag::new(row.get::<_, String>(1)?),
        identity_key: IdentityKey::new(row.get::<_, String>(2)?),
        content_hash: ContentHash::from_stored(row.get::<_, String>(3)?),
        metadata_key: MetadataKey::from_stored(row.get::<_, String>(4)?),
        title: row.get(5)?,
        url: row.get(6)?,
        published_at: row.get::<_, DateTime<Utc>>(7)?,
        kind: row.get(8)?,
    })
}

fn project_from_row(row: &Row<'_>) -> rusqlite::Result<ProjectRecord> {
    let status: String = row.get(5)?;
    Ok(ProjectRecord {
        id: ProjectId(row.get(0)?),
        number: ProjectNumber::new(row.get::<_, String>(1)?),
        title: row.get(2)?,
        authors: row.get(3)?,
        legislative_period: row.get(4)?,
        status: status.parse().map_err(|e| conversion_error(5, e))?,
        created_at: row.get::<_, DateTime<Utc>>(6)?,
    })
}

fn version_from_row(row: &Row<'_>) -> rusqlite::Result<VersionRecord> {
    Ok(VersionRecord {
        id: VersionId(row.get(0)?),
        project_id: ProjectId(row.get(1)?),
        document_id: DocumentRowId(row.get(2)?),
        sequence: row.get::<_, i64>(3)? as u32,
        raw_content: row.get(4)?,
        change_description: row.get(5)?,
        version_date: row.get::<_, NaiveDate>(6)?,
    })
}

fn query_document(
    conn: &Connection,
    filter: &str,
    param: &str,
) -> StoreResult<Option<StoredDocument>> {
    let sql = format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE {filter} ORDER BY id LIMIT 1");
    conn.query_row(&sql, params![param], document_from_row)
        .optional()
        .map_err(map_sqlite)
}

fn query_project(conn: &Connection, number: &ProjectNumber) -> StoreResult<Option<ProjectRecord>> {
    let sql = format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE project_number = ?1");
    conn.query_row(&sql, params![number.as_str()], project_from_row)
        .optional()
        .map_err(map_sqlite)
}

fn count(conn: &Connection, table: &str) -> StoreResult<usize> {
    let sql = format!("SELECT COUNT(*) FROM {table}");
    let n: i64 = conn.query_row(&sql, [], |row| row.get(0)).map_err(map_sqlite)?;
    Ok(n as usize)
}

#[async_trait]
impl ProjectStore for SqliteStore {
    async fn health_check(&self) -> StoreResult<()> {
        let conn = self.conn.lock().await;
        conn.query_row("SELECT 1", [], |_| Ok(()))
            .map_err(map_sqlite)
    }

    async fn find_document(
        &self,
        source: &SourceTag,
        identity_key: &IdentityKey,
    ) -> StoreResult<Option<StoredDocument>> {
        let conn = self.conn.lock().await;
        let sql = format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE source_tag = ?1 AND identity_key = ?2"
        );
        conn.query_row(
            &sql,
            params![source.as_str(), identity_key.as_str()],
            document_from_row,
        )
        .optional()
        .map_err(map_sqlite)
    }

    async fn find_document_by_hash(&self, hash: &ContentHash) -> StoreResult<Option<StoredDocument>> {
        let conn = self.conn.lock().await;
        query_document(&conn, "content_hash = ?1", hash.as_str())
    }

    async fn find_document_by_metadata_key(
        &self,
        key: &MetadataKey,
    ) -> StoreResult<Option<StoredDocument>> {
        let conn = self.conn.lock().await;
        query_document(&conn, "metadata_key = ?1", key.as_str())
    }

    async fn locate_document(
        &self,
        document: DocumentRowId,
    ) -> StoreResult<Option<DocumentPlacement>> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT v.project_id, p.project_number, v.sequence
             FROM versions v JOIN projects p ON p.id = v.project_id
             WHERE v.document_id = ?1",
            params![document.0],
            |row| {
                Ok(DocumentPlacement {
                    document_id: document,
                    project_id: ProjectId(row.get(0)?),
                    project_number: ProjectNumber::new(row.get::<_, String>(1)?),
                    sequence: row.get::<_, i64>(2)? as u32,
                })
            },
        )
        .optional()
        .map_err(map_sqlite)
    }

    async fn find_project(&self, number: &ProjectNumber) -> StoreResult<Option<ProjectRecord>> {
        let conn = self.conn.lock().await;
        query_project(&conn, number)
    }

    async fn list_versions(&self, project: ProjectId) -> StoreResult<Vec<VersionRecord>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(
                "SELECT id, project_id, document_id, sequence, raw_content, change_description, version_date
                 FROM versions WHERE project_id = ?1 ORDER BY sequence",
            )
            .map_err(map_sqlite)?;
        let rows = stmt
            .query_map(params![project.0], version_from_row)
            .map_err(map_sqlite)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(map_sqlite)
    }

    async fn update_project_status(
        &self,
        number: &ProjectNumber,
        status: ProjectStatus,
    ) -> StoreResult<ProjectRecord> {
        let conn = self.conn.lock().await;
        let mut project = query_project(&conn, number)?
            .ok_or_else(|| StoreError::NotFound(format!("project {number}")))?;

        if !project.status.can_transition_to(status) {
            return Err(StoreError::Conflict(format!(
                "project {number} cannot move from {} to {status}",
                project.status
            )));
        }

        conn.execute(
            "UPDATE projects SET status = ?1 WHERE id = ?2",
            params![status.as_str(), project.id.0],
        )
        .map_err(map_sqlite)?;
        project.status = status;
        Ok(project)
    }

    async fn stats(&self) -> StoreResult<StoreStats> {
        let conn = self.conn.lock().await;
        Ok(StoreStats {
            projects: count(&conn, "projects")?,
            documents: count(&conn, "documents")?,
            versions: count(&conn, "versions")?,
        })
    }

    async fn begin_unit_of_work(&self) -> StoreResult<Box<dyn UnitOfWork>> {
        let conn = self.conn.clone().lock_owned().await;
        conn.execute_batch("BEGIN IMMEDIATE").map_err(map_sqlite)?;
        Ok(Box::new(SqliteUnitOfWork {
            conn,
            finished: false,
        }))
    }
}

struct SqliteUnitOfWork {
    conn: OwnedMutexGuard<Connection>,
    finished: bool,
}

impl Drop for SqliteUnitOfWork {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(err) = self.conn.execute_batch("ROLLBACK") {
                tracing::warn!(error = %err, "rollback of abandoned unit of work failed");
            }
        }
    }
}

impl SqliteUnitOfWork {
    /// Ends the transaction. `finished` is only set once the statement
    /// succeeds, so a failed COMMIT or ROLLBACK is rolled back again on drop.
    fn finish(&mut self, statement: &str) -> StoreResult<()> {
        self.conn.execute_batch(statement).map_err(map_sqlite)?;
        self.finished = true;
        Ok(())
    }
}

#[async_trait]
impl UnitOfWork for SqliteUnitOfWork {
    async fn upsert_project(
        &mut self,
        number: &ProjectNumber,
        defaults: &NewProject,
    ) -> StoreResult<(ProjectId, bool)> {
        let inserted = self
            .conn
            .execute(
                "INSERT INTO projects (project_number, title, authors, legislative_period, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(project_number) DO NOTHING",
                params![
                    number.as_str(),
                    defaults.title,
                    defaults.authors,
                    defaults.legislative_period,
                    ProjectStatus::Active.as_str(),
                    Utc::now(),
                ],
            )
            .map_err(map_sqlite)?;

        let id: i64 = self
            .conn
            .query_row(
                "SELECT id FROM projects WHERE project_number = ?1",
                params![number.as_str()],
                |row| row.get(0),
            )
            .map_err(map_sqlite)?;
        Ok((ProjectId(id), inserted == 1))
    }

    async fn next_version_sequence(&mut self, project: ProjectId) -> StoreResult<u32> {
        let next: i64 = self
            .conn
            .query_row(
                "SELECT COALESCE(MAX(sequence), 0) + 1 FROM versions WHERE project_id = ?1",
                params![project.0],
                |row| row.get(0),
            )
            .map_err(map_sqlite)?;
        Ok(next as u32)
    }

    async fn insert_document(&mut self, document: &NewDocument) -> StoreResult<DocumentRowId> {
        self.conn
            .execute(
                "INSERT INTO documents (source_tag, identity_key, content_hash, metadata_key, title, url, published_at, kind)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    document.source.as_str(),
                    document.identity_key.as_str(),
                    document.content_hash.as_str(),
                    document.metadata_key.as_str(),
                    document.title,
                    document.url,
                    document.published_at,
                    document.kind,
                ],
            )
            .map_err(map_sqlite)?;
        Ok(DocumentRowId(self.conn.last_insert_rowid()))
    }

    async fn insert_version(&mut self, version: &NewVersion) -> StoreResult<VersionId> {
        self.conn
            .execute(
                "INSERT INTO versions (project_id, document_id, sequence, raw_content, change_description, version_date)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    version.project_id.0,
                    version.document_id.0,
                    i64::from(version.sequence),
                    version.raw_content,
                    version.change_description,
                    version.version_date,
                ],
            )
            .map_err(map_sqlite)?;
        Ok(VersionId(self.conn.last_insert_rowid()))
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let mut this = self;
        this.finish("COMMIT")
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        let mut this = self;
        this.finish("ROLLBACK")
    }
}
