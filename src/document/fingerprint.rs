use serde::{Deserialize, Serialize};

use super::document::Document;
use crate::error::IngestError;
use crate::types::identifiers::{ContentHash, IdentityKey, MetadataKey};

/// Identity, content and metadata signals derived from one document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint {
    pub identity_key: IdentityKey,
    pub content_hash: ContentHash,
    pub metadata_key: MetadataKey,
}

/// Compute the fingerprint of a document.
///
/// Pure and deterministic: the same document yields the same fingerprint in
/// every process. Fails only when the document has no identity key or no
/// source tag.
pub fn fingerprint(document: &Document) -> Result<Fingerprint, IngestError> {
    if document.identity_key.is_blank() {
        return Err(IngestError::invalid(format!(
            "document from source '{}' has no identity key",
            document.source
        )));
    }
    if document.source.as_str().trim().is_empty() {
        return Err(IngestError::invalid(format!(
            "document '{}' has no source tag",
            document.identity_key
        )));
    }

    let content_hash = match document.content.as_deref() {
        Some(content) if !content.trim().is_empty() => ContentHash::from_content(content),
        _ => ContentHash::empty(),
    };

    let day = document.publication_day().format("%Y-%m-%d").to_string();
    let metadata_key = MetadataKey::from_parts(&normalize_title(&document.title), &day, &document.source);

    Ok(Fingerprint {
        identity_key: document.identity_key.clone(),
        content_hash,
        metadata_key,
    })
}

/// Lowercase, whitespace collapsed.
pub fn normalize_title(title: &str) -> String {
    title
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
