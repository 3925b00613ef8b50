use std::sync::Arc;

use tracing::info;

use super::contract::ProjectStore;
use super::memory::MemoryStore;
use super::sqlite::SqliteStore;
use crate::config::StoreConfig;
use crate::error::IngestError;

/// Build the configured backend once at startup. Callers only ever see the
/// [`ProjectStore`] trait object.
pub fn open(config: &StoreConfig) -> Result<Arc<dyn ProjectStore>, IngestError> {
    match config {
        StoreConfig::Memory => {
            info!(backend = "memory", "opening project store");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreConfig::Sqlite { path } => {
            info!(backend = "sqlite", path = %path.display(), "opening project store");
            let store = SqliteStore::open(path)?;
            Ok(Arc::new(store))
        }
    }
}
