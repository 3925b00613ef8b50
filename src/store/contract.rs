use async_trait::async_trait;

use super::error::StoreResult;
use super::records::{
    DocumentPlacement, NewDocument, NewProject, NewVersion, ProjectRecord, ProjectStatus,
    StoreStats, StoredDocument, VersionRecord,
};
use crate::types::identifiers::{
    ContentHash, DocumentRowId, IdentityKey, MetadataKey, ProjectId, ProjectNumber, SourceTag,
    VersionId,
};

/// Persistence contract for projects, versions and documents.
///
/// Reads on the store itself see committed state only. All writes go through
/// a [`UnitOfWork`] obtained from [`ProjectStore::begin_unit_of_work`].
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Cheap connectivity check run before a batch starts.
    async fn health_check(&self) -> StoreResult<()>;

    async fn find_document(
        &self,
        source: &SourceTag,
        identity_key: &IdentityKey,
    ) -> StoreResult<Option<StoredDocument>>;

    /// Earliest persisted document with this content hash.
    async fn find_document_by_hash(&self, hash: &ContentHash) -> StoreResult<Option<StoredDocument>>;

    /// Earliest persisted document with this metadata key.
    async fn find_document_by_metadata_key(
        &self,
        key: &MetadataKey,
    ) -> StoreResult<Option<StoredDocument>>;

    /// Project and version a persisted document was filed under.
    async fn locate_document(&self, document: DocumentRowId)
        -> StoreResult<Option<DocumentPlacement>>;

    async fn find_project(&self, number: &ProjectNumber) -> StoreResult<Option<ProjectRecord>>;

    /// Versions of a project ordered by sequence.
    async fn list_versions(&self, project: ProjectId) -> StoreResult<Vec<VersionRecord>>;

    /// Flip a project's status. Backwards transitions are rejected with
    /// [`StoreError::Conflict`](super::StoreError::Conflict).
    async fn update_project_status(
        &self,
        number: &ProjectNumber,
        status: ProjectStatus,
    ) -> StoreResult<ProjectRecord>;

    async fn stats(&self) -> StoreResult<StoreStats>;

    /// Open a transaction. Dropping the returned value without calling
    /// [`UnitOfWork::commit`] rolls every write back.
    async fn begin_unit_of_work(&self) -> StoreResult<Box<dyn UnitOfWork>>;
}

/// One atomic write group: project look-up-or-create, sequence allocation,
/// document insert and version insert either all land or none do.
#[async_trait]
pub trait UnitOfWork: Send {
    /// Look up or create the project; `true` when it was created here.
    async fn upsert_project(
        &mut self,
        number: &ProjectNumber,
        defaults: &NewProject,
    ) -> StoreResult<(ProjectId, bool)>;

    /// `max(sequence) + 1` for the project, `1` when it has no versions.
    async fn next_version_sequence(&mut self, project: ProjectId) -> StoreResult<u32>;

    async fn insert_document(&mut self, document: &NewDocument) -> StoreResult<DocumentRowId>;

    async fn insert_version(&mut self, version: &NewVersion) -> StoreResult<VersionId>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;

    async fn rollback(self: Box<Self>) -> StoreResult<()>;
}
