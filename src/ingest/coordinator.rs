use std::sync::Arc;

use futures::stream::{self, StreamExt, TryStreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::outcome::{BatchReport, DocumentState, Outcome};
use super::retry::RetryPolicy;
use crate::config::IngestConfig;
use crate::dedup::{DuplicateResolver, Verdict};
use crate::document::{fingerprint, Document, Fingerprint};
use crate::error::IngestError;
use crate::project::{PolicyRegistry, ProjectLink, ProjectLinker};
use crate::store::{NewDocument, NewVersion, ProjectStore};

/// Drives documents through classify -> link -> persist.
///
/// Each document is one unit of work: project look-up-or-create, sequence
/// allocation, document insert and version insert commit together or not at
/// all. Serialization of concurrent writers is left to the store, so several
/// coordinators (or processes) may share one store.
pub struct IngestionCoordinator {
    store: Arc<dyn ProjectStore>,
    policies: PolicyRegistry,
    config: Arc<IngestConfig>,
    retry: RetryPolicy,
}

impl IngestionCoordinator {
    pub fn new(
        store: Arc<dyn ProjectStore>,
        policies: PolicyRegistry,
        config: Arc<IngestConfig>,
    ) -> Self {
        let retry = RetryPolicy::from_config(&config.retry);
        Self {
            store,
            policies,
            config,
            retry,
        }
    }

    /// Replace the backoff derived from the config.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn store(&self) -> &Arc<dyn ProjectStore> {
        &self.store
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Ingest one document.
    ///
    /// Per-document failures come back as an `Error` outcome; only systemic
    /// errors (misconfiguration) are returned as `Err`.
    pub async fn ingest(&self, document: &Document) -> Result<Outcome, IngestError> {
        debug!(document = %document.label(), state = ?DocumentState::Fetched, "ingesting");

        let fingerprint = match fingerprint(document) {
            Ok(fp) => fp,
            Err(err) => {
                warn!(document = %document.label(), error = %err, "rejected document");
                return Ok(Outcome::failed(document, &err, 1));
            }
        };
        debug!(
            document = %document.label(),
            state = ?DocumentState::Fingerprinted,
            content_hash = fingerprint.content_hash.as_str(),
            "fingerprinted"
        );

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.attempt(document, &fingerprint).await {
                Ok(outcome) => return Ok(outcome.with_attempts(attempt)),
                Err(err) if err.is_systemic() => return Err(err),
                Err(err) if err.is_retryable() && self.retry.should_retry(attempt) => {
                    let delay = self.retry.delay_after(attempt);
                    warn!(
                        document = %document.label(),
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "retrying document"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    warn!(document = %document.label(), attempt, error = %err, "document failed");
                    return Ok(Outcome::failed(document, &err, attempt));
                }
            }
        }
    }

    /// One full classify -> link -> persist pass. Retries always start here
    /// because a failed pass left nothing behind.
    async fn attempt(
        &self,
        document: &Document,
        fingerprint: &Fingerprint,
    ) -> Result<Outcome, IngestError> {
        let resolver = DuplicateResolver::new(self.store.as_ref());
        let verdict = resolver.classify(document, fingerprint).await?;
        debug!(
            document = %document.label(),
            state = ?DocumentState::Classified,
            verdict = ?verdict.kind(),
            "classified"
        );

        if let Some(link) = ProjectLinker::existing_link(&verdict)? {
            return Ok(Outcome::skipped(document, &verdict, link));
        }

        match self.persist(document, fingerprint, &verdict).await {
            Ok(link) => {
                info!(
                    document = %document.label(),
                    project_number = %link.project_number,
                    sequence = link.sequence,
                    verdict = ?verdict.kind(),
                    "persisted"
                );
                Ok(Outcome::persisted(document, &verdict, link))
            }
            Err(IngestError::ConstraintViolation(detail)) => {
                // The store's constraint is the authoritative dedup guard; see
                // whether a concurrent writer now owns this identity.
                let late = resolver.classify(document, fingerprint).await?;
                match ProjectLinker::existing_link(&late)? {
                    Some(link) => {
                        info!(document = %document.label(), "late duplicate after write conflict");
                        Ok(Outcome::late_duplicate(document, link, detail))
                    }
                    None => Err(IngestError::ConstraintViolation(detail)),
                }
            }
            Err(err) => Err(err),
        }
    }

    async fn persist(
        &self,
        document: &Document,
        fingerprint: &Fingerprint,
        verdict: &Verdict,
    ) -> Result<ProjectLink, IngestError> {
        let linker = ProjectLinker::new(&self.policies);
        let mut uow = self.store.begin_unit_of_work().await?;

        let written: Result<ProjectLink, IngestError> = async {
            let link = linker
                .resolve_project(uow.as_mut(), document, verdict)
                .await?;
            debug!(document = %document.label(), state = ?DocumentState::Linked, "linked");

            let document_id = uow
                .insert_document(&NewDocument::from_document(document, fingerprint))
                .await?;
            uow.insert_version(&NewVersion {
                project_id: link.project_id,
                document_id,
                sequence: link.sequence,
                raw_content: document.content.clone(),
                change_description: change_description(document, verdict, &link),
                version_date: document.publication_day(),
            })
            .await?;
            Ok(link)
        }
        .await;

        match written {
            Ok(link) => {
                uow.commit().await?;
                Ok(link)
            }
            Err(err) => {
                if let Err(rollback_err) = uow.rollback().await {
                    warn!(document = %document.label(), error = %rollback_err, "rollback failed");
                }
                Err(err)
            }
        }
    }

    /// Ingest a batch; see [`IngestionCoordinator::ingest_all_with_cancel`].
    pub async fn ingest_all(&self, documents: Vec<Document>) -> Result<BatchReport, IngestError> {
        self.ingest_all_with_cancel(documents, &CancellationToken::new())
            .await
    }

    /// Ingest a batch with up to `max_concurrency` documents in flight.
    ///
    /// A failing document never aborts the batch. The batch itself fails only
    /// when the store is unreachable at startup or a source has no
    /// project-number policy. Once `cancel` fires, documents that have not
    /// started are reported as not started; in-flight documents finish.
    pub async fn ingest_all_with_cancel(
        &self,
        documents: Vec<Document>,
        cancel: &CancellationToken,
    ) -> Result<BatchReport, IngestError> {
        self.store.health_check().await?;
        // Blank source tags are malformed input; `ingest` rejects them per document.
        for document in documents.iter().filter(|d| !d.source.as_str().trim().is_empty()) {
            self.policies.get(&document.source)?;
        }

        info!(
            documents = documents.len(),
            max_concurrency = self.config.max_concurrency,
            "starting batch"
        );

        let documents = &documents;
        let outcomes: Vec<Outcome> = stream::iter(0..documents.len())
            .map(|index| async move {
                let document = &documents[index];
                if cancel.is_cancelled() {
                    return Ok(Outcome::not_started(document));
                }
                self.ingest(document).await
            })
            .buffered(self.config.max_concurrency.max(1))
            .try_collect()
            .await?;

        let report = BatchReport::from_outcomes(outcomes);
        info!(
            processed = report.processed,
            skipped = report.skipped,
            failed = report.failed,
            not_started = report.not_started,
            content_duplicates = report.content_duplicates,
            total = report.total,
            "batch finished"
        );
        Ok(report)
    }
}

fn change_description(document: &Document, verdict: &Verdict, link: &ProjectLink) -> Option<String> {
    match verdict {
        Verdict::ContentDuplicate { original } => Some(format!(
            "republishes content of {}:{}",
            original.source, original.identity_key
        )),
        _ if link.sequence > 1 => Some(format!("new document {}", document.label())),
        _ => None,
    }
}
