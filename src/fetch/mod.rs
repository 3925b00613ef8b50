pub mod dates;

use async_trait::async_trait;

use crate::document::Document;
use crate::error::IngestError;

pub use dates::{parse_date, parse_timestamp, DateRange};

/// Producer of raw documents for one source.
///
/// Finite and restartable: fetching the same range twice yields the same
/// records, which is what makes re-running a batch safe.
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    async fn fetch(&self, range: &DateRange) -> Result<Vec<Document>, IngestError>;
}

/// Serves a fixed record set, filtered by publication day.
#[derive(Debug, Clone, Default)]
pub struct StaticFetcher {
    documents: Vec<Document>,
}

impl StaticFetcher {
    pub fn new(documents: Vec<Document>) -> Self {
        Self { documents }
    }
}

#[async_trait]
impl DocumentFetcher for StaticFetcher {
    async fn fetch(&self, range: &DateRange) -> Result<Vec<Document>, IngestError> {
        Ok(self
            .documents
            .iter()
            .filter(|d| range.contains(d.publication_day()))
            .cloned()
            .collect())
    }
}
