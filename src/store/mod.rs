pub mod contract;
pub mod error;
pub mod factory;
pub mod memory;
pub mod records;
pub mod sqlite;

pub use contract::{ProjectStore, UnitOfWork};
pub use error::{StoreError, StoreResult};
pub use factory::open;
pub use memory::MemoryStore;
pub use records::{
    DocumentPlacement, NewDocument, NewProject, NewVersion, ProjectRecord, ProjectStatus,
    StoreStats, StoredDocument, VersionRecord,
};
pub use sqlite::SqliteStore;
