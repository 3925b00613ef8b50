pub mod identifiers;

pub use identifiers::{
    ContentHash, DocumentRowId, IdentityKey, MetadataKey, ProjectId, ProjectNumber, SourceTag,
    VersionId,
};
