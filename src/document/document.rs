use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::extensions::Extensions;
use crate::types::identifiers::{IdentityKey, SourceTag};

/// A legislative document as it arrives from a fetch.
///
/// Ephemeral: only its persisted projection (document row + version) outlives
/// a run. The pipeline reads the base fields only; anything source-specific
/// lives in `extensions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub source: SourceTag,
    pub identity_key: IdentityKey,
    pub title: String,
    pub url: String,
    pub published_at: DateTime<Utc>,
    /// Absent until a later enrichment pass fetches the full text.
    pub content: Option<String>,
    pub kind: String,
    pub authors: Option<String>,
    #[serde(default, skip_serializing_if = "Extensions::is_empty")]
    pub extensions: Extensions,
}

impl Document {
    pub fn new(
        source: SourceTag,
        identity_key: IdentityKey,
        title: impl Into<String>,
        url: impl Into<String>,
        published_at: DateTime<Utc>,
        kind: impl Into<String>,
    ) -> Self {
        Document {
            source,
            identity_key,
            title: title.into(),
            url: url.into(),
            published_at,
            content: None,
            kind: kind.into(),
            authors: None,
            extensions: Extensions::new(),
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_authors(mut self, authors: impl Into<String>) -> Self {
        self.authors = Some(authors.into());
        self
    }

    pub fn with_extensions(mut self, extensions: Extensions) -> Self {
        self.extensions.merge(extensions);
        self
    }

    pub fn publication_day(&self) -> NaiveDate {
        self.published_at.date_naive()
    }

    /// `source:identity_key`, used in logs and outcomes.
    pub fn label(&self) -> String {
        format!("{}:{}", self.source, self.identity_key)
    }
}
