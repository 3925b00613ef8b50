//! Idempotent ingestion and deduplication of legislative documents.
//!
//! `legis-ingest` fingerprints documents fetched from legislative sources,
//! classifies them against what is already stored (new, exact duplicate,
//! content duplicate), links each new document to a legislative project and
//! persists it as the project's next version. Each document is written in a
//! single unit of work, so re-running a batch never duplicates anything.

pub mod config;
pub mod dedup;
pub mod document;
pub mod error;
pub mod fetch;
pub mod ingest;
pub mod logging;
pub mod project;
pub mod sources;
pub mod store;
pub mod types;

pub use config::{IngestConfig, RetryConfig, StoreConfig};
pub use document::{fingerprint, Document, Fingerprint};
pub use error::IngestError;
pub use ingest::{BatchReport, IngestionCoordinator, Outcome, OutcomeStatus, ReasonCode};
pub use project::PolicyRegistry;
pub use store::{MemoryStore, ProjectStore, SqliteStore};
