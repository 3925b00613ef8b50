// Simulated local store.
// A unit of work owns the state lock until it commits or is dropped, so
// concurrent writers are serialized the way a serializable transaction would be.
// Writes go to a small overlay that is applied on commit and discarded otherwise.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
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

#[derive(Debug, Default)]
struct MemoryState {
    projects: BTreeMap<ProjectId, ProjectRecord>,
    project_numbers: HashMap<ProjectNumber, ProjectId>,
    documents: BTreeMap<DocumentRowId, StoredDocument>,
    identities: HashMap<(SourceTag, IdentityKey), DocumentRowId>,
    // Earliest document per hash and per metadata key.
    hashes: HashMap<ContentHash, DocumentRowId>,
    metadata_keys: HashMap<MetadataKey, DocumentRowId>,
    versions: BTreeMap<VersionId, VersionRecord>,
    placements: HashMap<DocumentRowId, VersionId>,
    sequences: HashSet<(ProjectId, u32)>,
    latest_sequence: HashMap<ProjectId, u32>,
    last_project_id: i64,
    last_document_id: i64,
    last_version_id: i64,
}

impl MemoryState {
    fn placement(&self, document: DocumentRowId) -> Option<DocumentPlacement> {
        let version = self.versions.get(self.placements.get(&document)?)?;
        let project = self.projects.get(&version.project_id)?;
        Some(DocumentPlacement {
            document_id: document,
            project_id: project.id,
            project_number: project.number.clone(),
            sequence: version.sequence,
        })
    }

    fn apply(&mut self, staged: Staged) {
        for project in staged.projects {
            self.project_numbers.insert(project.number.clone(), project.id);
            self.projects.insert(project.id, project);
        }
        for document in staged.documents {
            let key = (document.source.clone(), document.identity_key.clone());
            self.identities.insert(key, document.id);
            self.hashes
                .entry(document.content_hash.clone())
                .or_insert(document.id);
            self.metadata_keys
                .entry(document.metadata_key.clone())
                .or_insert(document.id);
            self.documents.insert(document.id, document);
        }
        for version in staged.versions {
            self.placements.insert(version.document_id, version.id);
            self.sequences.insert((version.project_id, version.sequence));
            let latest = self.latest_sequence.entry(version.project_id).or_insert(0);
            *latest = (*latest).max(version.sequence);
            self.versions.insert(version.id, version);
        }
        self.last_project_id = staged.last_project_id;
        self.last_document_id = staged.last_document_id;
        self.last_version_id = staged.last_version_id;
    }
}

/// Rows written by one unit of work, not yet visible to readers.
#[derive(Debug)]
struct Staged {
    projects: Vec<ProjectRecord>,
    documents: Vec<StoredDocument>,
    versions: Vec<VersionRecord>,
    last_project_id: i64,
    last_document_id: i64,
    last_version_id: i64,
}

impl Staged {
    fn over(state: &MemoryState) -> Self {
        Staged {
            projects: Vec::new(),
            documents: Vec::new(),
            versions: Vec::new(),
            last_project_id: state.last_project_id,
            last_document_id: state.last_document_id,
            last_version_id: state.last_version_id,
        }
    }
}

/// In-process [`ProjectStore`] with the same constraints as the relational schema.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProjectStore for MemoryStore {
    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn find_document(
        &self,
        source: &SourceTag,
        identity_key: &IdentityKey,
    ) -> StoreResult<Option<StoredDocument>> {
        let state = self.state.lock().await;
        let key = (source.clone(), identity_key.clone());
        Ok(state
            .identities
            .get(&key)
            .and_then(|id| state.documents.get(id))
            .cloned())
    }

    async fn find_document_by_hash(&self, hash: &ContentHash) -> StoreResult<Option<StoredDocument>> {
        let state = self.state.lock().await;
        Ok(state
            .hashes
            .get(hash)
            .and_then(|id| state.documents.get(id))
            .cloned())
    }

    async fn find_document_by_metadata_key(
        &self,
        key: &MetadataKey,
    ) -> StoreResult<Option<StoredDocument>> {
        let state = self.state.lock().await;
        Ok(state
            .metadata_keys
            .get(key)
            .and_then(|id| state.documents.get(id))
            .cloned())
    }

    async fn locate_document(
        &self,
        document: DocumentRowId,
    ) -> StoreResult<Option<DocumentPlacement>> {
        let state = self.state.lock().await;
        Ok(state.placement(document))
    }

    async fn find_project(&self, number: &ProjectNumber) -> StoreResult<Option<ProjectRecord>> {
        let state = self.state.lock().await;
        Ok(state
            .project_numbers
            .get(number)
            .and_then(|id| state.projects.get(id))
            .cloned())
    }

    async fn list_versions(&self, project: ProjectId) -> StoreResult<Vec<VersionRecord>> {
        let state = self.state.lock().await;
        let mut versions: Vec<VersionRecord> = state
            .versions
            .values()
            .filter(|v| v.project_id == project)
            .cloned()
            .collect();
        versions.sort_by_key(|v| v.sequence);
        Ok(versions)
    }

    async fn update_project_status(
        &self,
        number: &ProjectNumber,
        status: ProjectStatus,
    ) -> StoreResult<ProjectRecord> {
        let mut state = self.state.lock().await;
        let id = *state
            .project_numbers
            .get(number)
            .ok_or_else(|| StoreError::NotFound(format!("project {number}")))?;
        let project = state
            .projects
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("project {number}")))?;

        if !project.status.can_transition_to(status) {
            return Err(StoreError::Conflict(format!(
                "project {number} cannot move from {} to {status}",
                project.status
            )));
        }
        project.status = status;
        Ok(project.clone())
    }

    async fn stats(&self) -> StoreResult<StoreStats> {
        let state = self.state.lock().await;
        Ok(StoreStats {
            projects: state.projects.len(),
            documents: state.documents.len(),
            versions: state.versions.len(),
        })
    }

    async fn begin_unit_of_work(&self) -> StoreResult<Box<dyn UnitOfWork>> {
        let guard = self.state.clone().lock_owned().await;
        let staged = Staged::over(&guard);
        Ok(Box::new(MemoryUnitOfWork { guard, staged }))
    }
}

struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<MemoryState>,
    staged: Staged,
}

impl MemoryUnitOfWork {
    fn project_exists(&self, id: ProjectId) -> bool {
        self.guard.projects.contains_key(&id) || self.staged.projects.iter().any(|p| p.id == id)
    }

    fn document_exists(&self, id: DocumentRowId) -> bool {
        self.guard.documents.contains_key(&id) || self.staged.documents.iter().any(|d| d.id == id)
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn upsert_project(
        &mut self,
        number: &ProjectNumber,
        defaults: &NewProject,
    ) -> StoreResult<(ProjectId, bool)> {
        if let Some(id) = self.guard.project_numbers.get(number) {
            return Ok((*id, false));
        }
        if let Some(project) = self.staged.projects.iter().find(|p| &p.number == number) {
            return Ok((project.id, false));
        }

        self.staged.last_project_id += 1;
        let id = ProjectId(self.staged.last_project_id);
        self.staged.projects.push(ProjectRecord {
            id,
            number: number.clone(),
            title: defaults.title.clone(),
            authors: defaults.authors.clone(),
            legislative_period: defaults.legislative_period.clone(),
            status: ProjectStatus::Active,
            created_at: Utc::now(),
        });
        Ok((id, true))
    }

    async fn next_version_sequence(&mut self, project: ProjectId) -> StoreResult<u32> {
        let committed = self
            .guard
            .latest_sequence
            .get(&project)
            .copied()
            .unwrap_or(0);
        let staged = self
            .staged
            .versions
            .iter()
            .filter(|v| v.project_id == project)
            .map(|v| v.sequence)
            .max()
            .unwrap_or(0);
        Ok(committed.max(staged) + 1)
    }

    async fn insert_document(&mut self, document: &NewDocument) -> StoreResult<DocumentRowId> {
        let key = (document.source.clone(), document.identity_key.clone());
        let staged_duplicate = self
            .staged
            .documents
            .iter()
            .any(|d| d.source == document.source && d.identity_key == document.identity_key);
        if staged_duplicate || self.guard.identities.contains_key(&key) {
            return Err(StoreError::Conflict(format!(
                "document {}:{} already exists",
                document.source, document.identity_key
            )));
        }

        self.staged.last_document_id += 1;
        let id = DocumentRowId(self.staged.last_document_id);
        self.staged
            .documents
            .push(StoredDocument::from_new(id, document));
        Ok(id)
    }

    async fn insert_version(&mut self, version: &NewVersion) -> StoreResult<VersionId> {
        if !self.project_exists(version.project_id) {
            return Err(StoreError::Conflict(format!(
                "version references missing project {}",
                version.project_id
            )));
        }
        if !self.document_exists(version.document_id) {
            return Err(StoreError::Conflict(format!(
                "version references missing document {}",
                version.document_id
            )));
        }
        let document_taken = self.guard.placements.contains_key(&version.document_id)
            || self
                .staged
                .versions
                .iter()
                .any(|v| v.document_id == version.document_id);
        if document_taken {
            return Err(StoreError::Conflict(format!(
                "document {} already has a version",
                version.document_id
            )));
        }
        let sequence_taken = self
            .guard
            .sequences
            .contains(&(version.project_id, version.sequence))
            || self
                .staged
                .versions
                .iter()
                .any(|v| v.project_id == version.project_id && v.sequence == version.sequence);
        if sequence_taken {
            return Err(StoreError::Conflict(format!(
                "project {} already has version {}",
                version.project_id, version.sequence
            )));
        }

        self.staged.last_version_id += 1;
        let id = VersionId(self.staged.last_version_id);
        self.staged.versions.push(VersionRecord {
            id,
            project_id: version.project_id,
            document_id: version.document_id,
            sequence: version.sequence,
            raw_content: version.raw_content.clone(),
            change_description: version.change_description.clone(),
            version_date: version.version_date,
        });
        Ok(id)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryUnitOfWork { mut guard, staged } = *self;
        guard.apply(staged);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        // The overlay is discarded with the guard.
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn defaults() -> NewProject {
        NewProject {
            title: "t".into(),
            authors: None,
            legislative_period: "2023-2027".into(),
        }
    }

    fn new_document(key: &str, hash: &str) -> NewDocument {
        NewDocument {
            source: SourceTag::new("senado"),
            identity_key: IdentityKey::new(key),
            content_hash: ContentHash::from_stored(hash),
            metadata_key: MetadataKey::from_stored(format!("m-{key}")),
            title: "t".into(),
            url: String::new(),
            published_at: Utc::now(),
            kind: "PL".into(),
        }
    }

    #[tokio::test]
    async fn staged_rows_are_invisible_until_commit() {
        let store = MemoryStore::new();
        let mut uow = store.begin_unit_of_work().await.unwrap();
        let number = ProjectNumber::new("SENADO-1");

        let (project, created) = uow.upsert_project(&number, &defaults()).await.unwrap();
        assert!(created);
        // A second upsert in the same unit sees the staged project.
        assert_eq!(uow.upsert_project(&number, &defaults()).await.unwrap(), (project, false));

        let first = uow.insert_document(&new_document("1", "h")).await.unwrap();
        let second = uow.insert_document(&new_document("2", "h")).await.unwrap();
        assert!(matches!(
            uow.insert_document(&new_document("1", "x")).await,
            Err(StoreError::Conflict(_))
        ));

        for (document_id, sequence) in [(first, 1), (second, 2)] {
            assert_eq!(uow.next_version_sequence(project).await.unwrap(), sequence);
            uow.insert_version(&NewVersion {
                project_id: project,
                document_id,
                sequence,
                raw_content: None,
                change_description: None,
                version_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            })
            .await
            .unwrap();
        }
        uow.commit().await.unwrap();

        // The hash index keeps the earliest document.
        let by_hash = store
            .find_document_by_hash(&ContentHash::from_stored("h"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_hash.id, first);
        assert_eq!(store.locate_document(second).await.unwrap().unwrap().sequence, 2);

        let mut uow = store.begin_unit_of_work().await.unwrap();
        assert_eq!(uow.next_version_sequence(project).await.unwrap(), 3);
        uow.rollback().await.unwrap();
        assert_eq!(
            store.stats().await.unwrap(),
            StoreStats {
                projects: 1,
                documents: 2,
                versions: 2,
            }
        );
    }
}
