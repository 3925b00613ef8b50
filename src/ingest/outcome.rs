use serde::{Deserialize, Serialize};

use crate::dedup::{Verdict, VerdictKind};
use crate::document::Document;
use crate::error::IngestError;
use crate::project::ProjectLink;
use crate::types::identifiers::{ProjectId, ProjectNumber};

/// Per-document pipeline state. `Persisted`, `Skipped` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentState {
    Fetched,
    Fingerprinted,
    Classified,
    Linked,
    Persisted,
    Skipped,
    Failed,
    /// The batch was cancelled before this document started.
    NotStarted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutcomeStatus {
    New,
    Duplicate,
    Error,
    NotStarted,
}

/// Why a document did not end up `Persisted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    ExactDuplicate,
    /// Identity already persisted, but the incoming content differs.
    IdentityContentChanged,
    /// A concurrent writer persisted the identity between classification and commit.
    LateDuplicate,
    InvalidDocument,
    StoreUnavailable,
    ConstraintViolation,
    StoreError,
    Cancelled,
}

impl ReasonCode {
    fn for_error(err: &IngestError) -> Self {
        match err {
            IngestError::InvalidDocument(_) => ReasonCode::InvalidDocument,
            IngestError::StoreUnavailable(_) => ReasonCode::StoreUnavailable,
            IngestError::ConstraintViolation(_) => ReasonCode::ConstraintViolation,
            IngestError::Configuration(_) | IngestError::Store(_) => ReasonCode::StoreError,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    /// `source:identity_key`
    pub document: String,
    pub status: OutcomeStatus,
    pub state: DocumentState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<VerdictKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<ProjectId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_number: Option<ProjectNumber>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_seq: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_new_project: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<ReasonCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub attempts: u32,
}

impl Outcome {
    fn base(document: &Document, status: OutcomeStatus, state: DocumentState) -> Self {
        Outcome {
            document: document.label(),
            status,
            state,
            verdict: None,
            project_id: None,
            project_number: None,
            version_seq: None,
            is_new_project: None,
            reason: None,
            detail: None,
            attempts: 0,
        }
    }

    fn with_link(mut self, link: ProjectLink) -> Self {
        self.project_id = Some(link.project_id);
        self.project_number = Some(link.project_number);
        self.version_seq = Some(link.sequence);
        self.is_new_project = Some(link.is_new_project);
        self
    }

    pub(crate) fn persisted(document: &Document, verdict: &Verdict, link: ProjectLink) -> Self {
        let mut outcome = Self::base(document, OutcomeStatus::New, DocumentState::Persisted);
        outcome.verdict = Some(verdict.kind());
        outcome.with_link(link)
    }

    pub(crate) fn skipped(document: &Document, verdict: &Verdict, link: ProjectLink) -> Self {
        let mut outcome = Self::base(document, OutcomeStatus::Duplicate, DocumentState::Skipped);
        outcome.verdict = Some(verdict.kind());
        outcome.reason = Some(match verdict {
            Verdict::ExactDuplicate {
                content_changed: true,
                ..
            } => ReasonCode::IdentityContentChanged,
            _ => ReasonCode::ExactDuplicate,
        });
        outcome.with_link(link)
    }

    pub(crate) fn late_duplicate(document: &Document, link: ProjectLink, detail: String) -> Self {
        let mut outcome = Self::base(document, OutcomeStatus::Duplicate, DocumentState::Skipped);
        outcome.verdict = Some(VerdictKind::ExactDuplicate);
        outcome.reason = Some(ReasonCode::LateDuplicate);
        outcome.detail = Some(detail);
        outcome.with_link(link)
    }

    pub(crate) fn failed(document: &Document, err: &IngestError, attempts: u32) -> Self {
        let mut outcome = Self::base(document, OutcomeStatus::Error, DocumentState::Failed);
        outcome.reason = Some(ReasonCode::for_error(err));
        outcome.detail = Some(err.to_string());
        outcome.attempts = attempts;
        outcome
    }

    pub(crate) fn not_started(document: &Document) -> Self {
        let mut outcome =
            Self::base(document, OutcomeStatus::NotStarted, DocumentState::NotStarted);
        outcome.reason = Some(ReasonCode::Cancelled);
        outcome
    }

    pub(crate) fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn is_persisted(&self) -> bool {
        self.state == DocumentState::Persisted
    }
}

/// Tally of one `ingest_all` run.
///
/// `processed + skipped + failed + not_started == total`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub not_started: usize,
    pub total: usize,
    /// Persisted documents whose content matched another identity.
    pub content_duplicates: usize,
    pub outcomes: Vec<Outcome>,
}

impl BatchReport {
    pub(crate) fn from_outcomes(outcomes: Vec<Outcome>) -> Self {
        let mut report = BatchReport {
            total: outcomes.len(),
            ..BatchReport::default()
        };
        for outcome in &outcomes {
            match outcome.state {
                DocumentState::Persisted => {
                    report.processed += 1;
                    if outcome.verdict == Some(VerdictKind::ContentDuplicate) {
                        report.content_duplicates += 1;
                    }
                }
                DocumentState::Skipped => report.skipped += 1,
                DocumentState::NotStarted => report.not_started += 1,
                _ => report.failed += 1,
            }
        }
        report.outcomes = outcomes;
        report
    }

    pub fn was_cancelled(&self) -> bool {
        self.not_started > 0
    }

    /// Outcomes that did not persist, each with its reason code.
    pub fn exceptions(&self) -> impl Iterator<Item = &Outcome> {
        self.outcomes.iter().filter(|o| !o.is_persisted())
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
