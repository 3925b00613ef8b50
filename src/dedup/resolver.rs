use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::document::{Document, Fingerprint};
use crate::error::IngestError;
use crate::store::{DocumentPlacement, ProjectStore, StoredDocument};
use crate::types::identifiers::DocumentRowId;

/// Coarse classification, as reported in outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerdictKind {
    New,
    ExactDuplicate,
    ContentDuplicate,
}

/// Result of classifying one fingerprint against persisted state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Nothing persisted matches. `metadata_match` is the advisory
    /// title/date/source signal and never blocks ingestion.
    New {
        metadata_match: Option<DocumentRowId>,
    },
    /// Same `(source, identity_key)` is already persisted.
    ExactDuplicate {
        existing: StoredDocument,
        placement: Option<DocumentPlacement>,
        content_changed: bool,
    },
    /// Another identity already carries this content. Still persisted.
    ContentDuplicate { original: StoredDocument },
}

impl Verdict {
    pub fn kind(&self) -> VerdictKind {
        match self {
            Verdict::New { .. } => VerdictKind::New,
            Verdict::ExactDuplicate { .. } => VerdictKind::ExactDuplicate,
            Verdict::ContentDuplicate { .. } => VerdictKind::ContentDuplicate,
        }
    }

    pub fn is_exact_duplicate(&self) -> bool {
        matches!(self, Verdict::ExactDuplicate { .. })
    }
}

/// Classifies documents against committed store state.
///
/// Checks run in fixed priority order, first match wins:
/// identity, then content hash, then metadata key (advisory).
/// The check is not atomic with the later write; the store's unique
/// constraints remain the final guard.
pub struct DuplicateResolver<'a> {
    store: &'a dyn ProjectStore,
}

impl<'a> DuplicateResolver<'a> {
    pub fn new(store: &'a dyn ProjectStore) -> Self {
        Self { store }
    }

    pub async fn classify(
        &self,
        document: &Document,
        fingerprint: &Fingerprint,
    ) -> Result<Verdict, IngestError> {
        // 1. Identity
        if let Some(existing) = self
            .store
            .find_document(&document.source, &fingerprint.identity_key)
            .await?
        {
            let placement = self.store.locate_document(existing.id).await?;
            let content_changed = !fingerprint.content_hash.is_empty_sentinel()
                && existing.content_hash != fingerprint.content_hash;

            if content_changed {
                warn!(
                    document = %document.label(),
                    "identity already persisted with different content; skipping"
                );
            } else {
                debug!(document = %document.label(), "exact duplicate");
            }

            return Ok(Verdict::ExactDuplicate {
                existing,
                placement,
                content_changed,
            });
        }

        // 2. Content, skipped for the empty-content sentinel
        if !fingerprint.content_hash.is_empty_sentinel() {
            if let Some(original) = self
                .store
                .find_document_by_hash(&fingerprint.content_hash)
                .await?
            {
                info!(
                    document = %document.label(),
                    original = %format!("{}:{}", original.source, original.identity_key),
                    "content duplicate under a new identity"
                );
                return Ok(Verdict::ContentDuplicate { original });
            }
        }

        // 3. Metadata, advisory only
        let metadata_match = self
            .store
            .find_document_by_metadata_key(&fingerprint.metadata_key)
            .await?
            .map(|m| {
                info!(
                    document = %document.label(),
                    candidate = %format!("{}:{}", m.source, m.identity_key),
                    "low-confidence metadata match, ingesting as new"
                );
                m.id
            });

        Ok(Verdict::New { metadata_match })
    }
}
