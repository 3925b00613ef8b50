#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use legis_ingest::config::IngestConfig;
use legis_ingest::document::Document;
use legis_ingest::ingest::{IngestionCoordinator, RetryPolicy};
use legis_ingest::project::PolicyRegistry;
use legis_ingest::store::{
    DocumentPlacement, MemoryStore, NewDocument, NewProject, NewVersion, ProjectRecord,
    ProjectStatus, ProjectStore, StoreError, StoreResult, StoreStats, StoredDocument, UnitOfWork,
    VersionRecord,
};
use legis_ingest::types::{
    ContentHash, DocumentRowId, IdentityKey, MetadataKey, ProjectId, ProjectNumber, SourceTag,
    VersionId,
};

pub fn published(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
}

/// Senado-style document with a fixed title and date unless overridden.
pub fn make_doc(source: &str, key: &str, content: &str) -> Document {
    make_titled_doc(source, key, &format!("Projeto {key}"), content)
}

pub fn make_titled_doc(source: &str, key: &str, title: &str, content: &str) -> Document {
    Document::new(
        SourceTag::new(source),
        IdentityKey::new(key),
        title,
        format!("https://legis.example/{source}/{key}"),
        published(2024, 3, 15),
        "PL",
    )
    .with_content(content)
}

pub fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::new(max_attempts, Duration::from_millis(1), Duration::from_millis(5))
}

pub fn coordinator(store: Arc<dyn ProjectStore>) -> IngestionCoordinator {
    IngestionCoordinator::new(
        store,
        PolicyRegistry::brazil(),
        Arc::new(IngestConfig::default()),
    )
    .with_retry_policy(fast_retry(3))
}

fn take_one(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

#[derive(Default)]
struct Faults {
    fail_all: AtomicBool,
    unhealthy: AtomicBool,
    failing_reads: AtomicU32,
    failing_version_inserts: AtomicU32,
    hidden_identity_reads: AtomicU32,
    version_inserts: AtomicU32,
}

impl Faults {
    fn check_all(&self) -> StoreResult<()> {
        if self.fail_all.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected total failure".into()));
        }
        Ok(())
    }

    fn check_read(&self) -> StoreResult<()> {
        self.check_all()?;
        if take_one(&self.failing_reads) {
            return Err(StoreError::Unavailable("injected read failure".into()));
        }
        Ok(())
    }
}

/// `MemoryStore` wrapper with single-shot failure injection.
#[derive(Clone)]
pub struct FailingStore {
    inner: MemoryStore,
    faults: Arc<Faults>,
}

impl FailingStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            faults: Arc::new(Faults::default()),
        }
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    /// Fail the next `n` version inserts with `Unavailable`.
    pub fn fail_version_inserts(&self, n: u32) {
        self.faults.failing_version_inserts.store(n, Ordering::SeqCst);
    }

    /// Fail the next `n` reads with `Unavailable`.
    pub fn fail_reads(&self, n: u32) {
        self.faults.failing_reads.store(n, Ordering::SeqCst);
    }

    /// Report "not found" for the next `n` identity look-ups, as if another
    /// writer committed the document after we looked.
    pub fn hide_identity(&self, n: u32) {
        self.faults.hidden_identity_reads.store(n, Ordering::SeqCst);
    }

    pub fn fail_all(&self, fail: bool) {
        self.faults.fail_all.store(fail, Ordering::SeqCst);
    }

    pub fn set_unhealthy(&self, unhealthy: bool) {
        self.faults.unhealthy.store(unhealthy, Ordering::SeqCst);
    }

    /// Version inserts attempted, successful or not.
    pub fn version_inserts(&self) -> u32 {
        self.faults.version_inserts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProjectStore for FailingStore {
    async fn health_check(&self) -> StoreResult<()> {
        if self.faults.unhealthy.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected health failure".into()));
        }
        self.faults.check_all()?;
        self.inner.health_check().await
    }

    async fn find_document(
        &self,
        source: &SourceTag,
        identity_key: &IdentityKey,
    ) -> StoreResult<Option<StoredDocument>> {
        self.faults.check_read()?;
        if take_one(&self.faults.hidden_identity_reads) {
            return Ok(None);
        }
        self.inner.find_document(source, identity_key).await
    }

    async fn find_document_by_hash(&self, hash: &ContentHash) -> StoreResult<Option<StoredDocument>> {
        self.faults.check_read()?;
        self.inner.find_document_by_hash(hash).await
    }

    async fn find_document_by_metadata_key(
        &self,
        key: &MetadataKey,
    ) -> StoreResult<Option<StoredDocument>> {
        self.faults.check_read()?;
        self.inner.find_document_by_metadata_key(key).await
    }

    async fn locate_document(
        &self,
        document: DocumentRowId,
    ) -> StoreResult<Option<DocumentPlacement>> {
        self.faults.check_read()?;
        self.inner.locate_document(document).await
    }

    async fn find_project(&self, number: &ProjectNumber) -> StoreResult<Option<ProjectRecord>> {
        self.faults.check_read()?;
        self.inner.find_project(number).await
    }

    async fn list_versions(&self, project: ProjectId) -> StoreResult<Vec<VersionRecord>> {
        self.faults.check_read()?;
        self.inner.list_versions(project).await
    }

    async fn update_project_status(
        &self,
        number: &ProjectNumber,
        status: ProjectStatus,
    ) -> StoreResult<ProjectRecord> {
        self.faults.check_all()?;
        self.inner.update_project_status(number, status).await
    }

    async fn stats(&self) -> StoreResult<StoreStats> {
        self.inner.stats().await
    }

    async fn begin_unit_of_work(&self) -> StoreResult<Box<dyn UnitOfWork>> {
        self.faults.check_all()?;
        let inner = self.inner.begin_unit_of_work().await?;
        Ok(Box::new(FailingUnitOfWork {
            inner,
            faults: Arc::clone(&self.faults),
        }))
    }
}

struct FailingUnitOfWork {
    inner: Box<dyn UnitOfWork>,
    faults: Arc<Faults>,
}

#[async_trait]
impl UnitOfWork for FailingUnitOfWork {
    async fn upsert_project(
        &mut self,
        number: &ProjectNumber,
        defaults: &NewProject,
    ) -> StoreResult<(ProjectId, bool)> {
        self.faults.check_all()?;
        self.inner.upsert_project(number, defaults).await
    }

    async fn next_version_sequence(&mut self, project: ProjectId) -> StoreResult<u32> {
        self.inner.next_version_sequence(project).await
    }

    async fn insert_document(&mut self, document: &NewDocument) -> StoreResult<DocumentRowId> {
        self.faults.check_all()?;
        self.inner.insert_document(document).await
    }

    async fn insert_version(&mut self, version: &NewVersion) -> StoreResult<VersionId> {
        self.faults.version_inserts.fetch_add(1, Ordering::SeqCst);
        self.faults.check_all()?;
        if take_one(&self.faults.failing_version_inserts) {
            return Err(StoreError::Unavailable("injected version insert failure".into()));
        }
        self.inner.insert_version(version).await
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.inner.commit().await
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        self.inner.rollback().await
    }
}
