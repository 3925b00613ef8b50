pub mod document;
pub mod extensions;
pub mod fingerprint;

pub use crate::types::identifiers::{ContentHash, IdentityKey, MetadataKey, SourceTag};
pub use document::Document;
pub use extensions::{ExtensionValue, Extensions};
pub use fingerprint::{fingerprint, normalize_title, Fingerprint};
