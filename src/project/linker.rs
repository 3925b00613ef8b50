use serde::{Deserialize, Serialize};
use tracing::debug;

use super::policy::PolicyRegistry;
use crate::dedup::Verdict;
use crate::document::Document;
use crate::error::IngestError;
use crate::store::{NewProject, UnitOfWork};
use crate::types::identifiers::{ProjectId, ProjectNumber};

/// The project (and slot in its history) a document resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectLink {
    pub project_id: ProjectId,
    pub project_number: ProjectNumber,
    pub sequence: u32,
    pub is_new_project: bool,
}

/// Resolves documents to projects and allocates version numbers.
pub struct ProjectLinker<'a> {
    policies: &'a PolicyRegistry,
}

impl<'a> ProjectLinker<'a> {
    pub fn new(policies: &'a PolicyRegistry) -> Self {
        Self { policies }
    }

    /// Derive the project number without touching the store.
    pub fn project_number(&self, document: &Document) -> Result<ProjectNumber, IngestError> {
        self.policies
            .get(&document.source)?
            .derive(&document.source, &document.identity_key)
    }

    /// The link already on file for an exact duplicate, `None` for any other verdict.
    pub fn existing_link(verdict: &Verdict) -> Result<Option<ProjectLink>, IngestError> {
        let Verdict::ExactDuplicate { placement, existing, .. } = verdict else {
            return Ok(None);
        };
        let placement = placement.as_ref().ok_or_else(|| {
            IngestError::Store(format!(
                "document {}:{} is persisted without a version",
                existing.source, existing.identity_key
            ))
        })?;
        Ok(Some(ProjectLink {
            project_id: placement.project_id,
            project_number: placement.project_number.clone(),
            sequence: placement.sequence,
            is_new_project: false,
        }))
    }

    /// Resolve the project for `document` and the sequence its version gets.
    ///
    /// For exact duplicates the existing placement is returned and nothing is
    /// written. Otherwise look-up-or-create and sequence allocation run inside
    /// `uow`, so they commit or roll back with the version insert.
    pub async fn resolve_project(
        &self,
        uow: &mut dyn UnitOfWork,
        document: &Document,
        verdict: &Verdict,
    ) -> Result<ProjectLink, IngestError> {
        if let Some(link) = Self::existing_link(verdict)? {
            return Ok(link);
        }

        let policy = self.policies.get(&document.source)?;
        let number = policy.derive(&document.source, &document.identity_key)?;
        let defaults = NewProject {
            title: document.title.clone(),
            authors: document.authors.clone(),
            legislative_period: policy.legislative_period(document.publication_day()),
        };

        let (project_id, is_new_project) = uow.upsert_project(&number, &defaults).await?;
        let sequence = uow.next_version_sequence(project_id).await?;

        debug!(
            document = %document.label(),
            project_number = %number,
            sequence,
            is_new_project,
            "linked document to project"
        );

        Ok(ProjectLink {
            project_id,
            project_number: number,
            sequence,
            is_new_project,
        })
    }
}
