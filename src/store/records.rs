use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::error::StoreError;
use crate::document::{Document, Fingerprint};
use crate::types::identifiers::{
    ContentHash, DocumentRowId, IdentityKey, MetadataKey, ProjectId, ProjectNumber, SourceTag,
    VersionId,
};

/// Lifecycle of a project. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Active,
    Archived,
    Withdrawn,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Active => "active",
            ProjectStatus::Archived => "archived",
            ProjectStatus::Withdrawn => "withdrawn",
        }
    }

    /// Active -> Archived -> Withdrawn, skipping allowed, no reversal.
    /// Re-applying the current status is a no-op and allowed.
    pub fn can_transition_to(&self, next: ProjectStatus) -> bool {
        next >= *self
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(ProjectStatus::Active),
            "archived" => Ok(ProjectStatus::Archived),
            "withdrawn" => Ok(ProjectStatus::Withdrawn),
            other => Err(StoreError::Backend(format!("unknown project status '{other}'"))),
        }
    }
}

/// Attributes used when a project is created by look-up-or-create.
/// Ignored when the project already exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProject {
    pub title: String,
    pub authors: Option<String>,
    pub legislative_period: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub id: ProjectId,
    pub number: ProjectNumber,
    pub title: String,
    pub authors: Option<String>,
    pub legislative_period: String,
    pub status: ProjectStatus,
    pub created_at: DateTime<Utc>,
}

/// The persisted projection of a [`Document`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDocument {
    pub source: SourceTag,
    pub identity_key: IdentityKey,
    pub content_hash: ContentHash,
    pub metadata_key: MetadataKey,
    pub title: String,
    pub url: String,
    pub published_at: DateTime<Utc>,
    pub kind: String,
}

impl NewDocument {
    pub fn from_document(document: &Document, fingerprint: &Fingerprint) -> Self {
        NewDocument {
            source: document.source.clone(),
            identity_key: fingerprint.identity_key.clone(),
            content_hash: fingerprint.content_hash.clone(),
            metadata_key: fingerprint.metadata_key.clone(),
            title: document.title.clone(),
            url: document.url.clone(),
            published_at: document.published_at,
            kind: document.kind.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub id: DocumentRowId,
    pub source: SourceTag,
    pub identity_key: IdentityKey,
    pub content_hash: ContentHash,
    pub metadata_key: MetadataKey,
    pub title: String,
    pub url: String,
    pub published_at: DateTime<Utc>,
    pub kind: String,
}

impl StoredDocument {
    pub(crate) fn from_new(id: DocumentRowId, new: &NewDocument) -> Self {
        StoredDocument {
            id,
            source: new.source.clone(),
            identity_key: new.identity_key.clone(),
            content_hash: new.content_hash.clone(),
            metadata_key: new.metadata_key.clone(),
            title: new.title.clone(),
            url: new.url.clone(),
            published_at: new.published_at,
            kind: new.kind.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVersion {
    pub project_id: ProjectId,
    pub document_id: DocumentRowId,
    pub sequence: u32,
    pub raw_content: Option<String>,
    pub change_description: Option<String>,
    pub version_date: NaiveDate,
}

/// Immutable snapshot linking one document to one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub id: VersionId,
    pub project_id: ProjectId,
    pub document_id: DocumentRowId,
    pub sequence: u32,
    pub raw_content: Option<String>,
    pub change_description: Option<String>,
    pub version_date: NaiveDate,
}

/// Where a persisted document sits in the project history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentPlacement {
    pub document_id: DocumentRowId,
    pub project_id: ProjectId,
    pub project_number: ProjectNumber,
    pub sequence: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub projects: usize,
    pub documents: usize,
    pub versions: usize,
}
