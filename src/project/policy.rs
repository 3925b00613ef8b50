use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate};

use crate::error::IngestError;
use crate::types::identifiers::{IdentityKey, ProjectNumber, SourceTag};

/// First year of the legislature the four-year cycle is anchored to.
const LEGISLATURE_ANCHOR_YEAR: i32 = 2023;
const LEGISLATURE_YEARS: i32 = 4;

/// Source-specific rule mapping a document identity to its project number.
pub trait ProjectNumberPolicy: Send + Sync {
    fn derive(&self, source: &SourceTag, key: &IdentityKey) -> Result<ProjectNumber, IngestError>;

    /// Legislature a document published on `date` belongs to, e.g. `"2023-2027"`.
    fn legislative_period(&self, date: NaiveDate) -> String {
        let offset = (date.year() - LEGISLATURE_ANCHOR_YEAR).div_euclid(LEGISLATURE_YEARS);
        let start = LEGISLATURE_ANCHOR_YEAR + offset * LEGISLATURE_YEARS;
        format!("{start}-{}", start + LEGISLATURE_YEARS)
    }
}

impl<F> ProjectNumberPolicy for F
where
    F: Fn(&SourceTag, &IdentityKey) -> Result<ProjectNumber, IngestError> + Send + Sync,
{
    fn derive(&self, source: &SourceTag, key: &IdentityKey) -> Result<ProjectNumber, IngestError> {
        self(source, key)
    }
}

/// `PREFIX-<key>`, optionally dropping a revision suffix so that `123.2`
/// files under the same project as `123`.
#[derive(Debug, Clone)]
pub struct PrefixPolicy {
    prefix: String,
    revision_separator: Option<char>,
}

impl PrefixPolicy {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            revision_separator: None,
        }
    }

    pub fn with_revision_separator(mut self, separator: char) -> Self {
        self.revision_separator = Some(separator);
        self
    }
}

impl ProjectNumberPolicy for PrefixPolicy {
    fn derive(&self, source: &SourceTag, key: &IdentityKey) -> Result<ProjectNumber, IngestError> {
        let raw = key.as_str();
        let base = match self.revision_separator {
            Some(sep) => raw.split(sep).next().unwrap_or(raw),
            None => raw,
        };

        if base.is_empty() {
            return Err(IngestError::invalid(format!(
                "cannot derive project number for {source}:{key}: empty key"
            )));
        }
        if let Some(bad) = base
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '/')))
        {
            return Err(IngestError::invalid(format!(
                "cannot derive project number for {source}:{key}: unexpected character {bad:?}"
            )));
        }

        Ok(ProjectNumber::new(format!("{}-{base}", self.prefix)))
    }
}

/// Per-source policies injected into the coordinator.
#[derive(Clone, Default)]
pub struct PolicyRegistry {
    policies: HashMap<SourceTag, Arc<dyn ProjectNumberPolicy>>,
}

impl PolicyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Senate and Chamber of Deputies feeds.
    pub fn brazil() -> Self {
        Self::new()
            .with(SourceTag::new("senado"), PrefixPolicy::new("SENADO"))
            .with(SourceTag::new("camara"), PrefixPolicy::new("CAMARA"))
    }

    pub fn with(mut self, source: SourceTag, policy: impl ProjectNumberPolicy + 'static) -> Self {
        self.policies.insert(source, Arc::new(policy));
        self
    }

    pub fn contains(&self, source: &SourceTag) -> bool {
        self.policies.contains_key(source)
    }

    /// A missing policy is misconfiguration, not bad input.
    pub fn get(&self, source: &SourceTag) -> Result<&dyn ProjectNumberPolicy, IngestError> {
        self.policies
            .get(source)
            .map(|p| p.as_ref())
            .ok_or_else(|| {
                IngestError::configuration(format!("no project-number policy for source '{source}'"))
            })
    }
}
