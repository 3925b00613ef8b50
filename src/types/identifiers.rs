use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Which institution or feed produced a document (`"senado"`, `"camara"`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceTag(String);

impl SourceTag {
    pub fn new(tag: impl Into<String>) -> Self {
        SourceTag(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Source-assigned document key. Only unique together with its [`SourceTag`].
///
/// Surrounding whitespace is stripped on construction, so `" 123"` and `"123"`
/// name the same document everywhere (store, dedup, project numbers).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String")]
pub struct IdentityKey(String);

impl IdentityKey {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        if key.trim().len() == key.len() {
            return IdentityKey(key);
        }
        IdentityKey(key.trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for IdentityKey {
    fn from(key: String) -> Self {
        IdentityKey::new(key)
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Digest of normalized document content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    /// Sentinel recorded for documents whose content has not been fetched yet.
    pub const EMPTY: &'static str = "empty";

    pub fn from_content(content: &str) -> Self {
        let normalized = normalize_content(content);

        let mut hasher = Sha256::new();
        hasher.update(normalized.as_bytes());

        let hash = hasher.finalize();
        let hex = hex::encode(hash);

        ContentHash(format!("sha256:{hex}"))
    }

    pub fn empty() -> Self {
        ContentHash(Self::EMPTY.to_string())
    }

    /// Wrap a hash previously produced by [`ContentHash::from_content`], e.g. read back from a store.
    pub fn from_stored(raw: impl Into<String>) -> Self {
        ContentHash(raw.into())
    }

    pub fn is_empty_sentinel(&self) -> bool {
        self.0 == Self::EMPTY
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Content normalization: runs of whitespace collapse to one space, ends are trimmed.
/// Case is preserved.
fn normalize_content(content: &str) -> String {
    content.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Composite of normalized title, publication day and source tag.
/// Advisory only; never proof of identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataKey(String);

impl MetadataKey {
    /// ASCII unit separator, not expected in titles or tags.
    pub const DELIMITER: char = '\u{1f}';

    pub fn from_parts(normalized_title: &str, day: &str, source: &SourceTag) -> Self {
        let d = Self::DELIMITER;
        MetadataKey(format!("{normalized_title}{d}{day}{d}{}", source.as_str()))
    }

    pub fn from_stored(raw: impl Into<String>) -> Self {
        MetadataKey(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Source-namespaced project key, e.g. `"SENADO-123"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectNumber(String);

impl ProjectNumber {
    pub fn new(number: impl Into<String>) -> Self {
        ProjectNumber(number.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

row_id!(
    /// Store-assigned project row id.
    ProjectId
);
row_id!(
    /// Store-assigned document row id.
    DocumentRowId
);
row_id!(VersionId);
