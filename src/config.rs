use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::IngestError;

// Key point:
// Built once at process start
// Passed by reference into the coordinator
// Nothing reads the environment after construction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub store: StoreConfig,
    pub max_concurrency: usize,
    pub retry: RetryConfig,
    pub log_filter: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StoreConfig {
    Memory,
    Sqlite { path: PathBuf },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per document, including the first.
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
        }
    }
}

impl RetryConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::Memory,
            max_concurrency: 5,
            retry: RetryConfig::default(),
            log_filter: "info".into(),
        }
    }
}

impl IngestConfig {
    /// Read `LEGIS_*` variables from the process environment.
    pub fn from_env() -> Result<Self, IngestError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, IngestError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(backend) = lookup("LEGIS_STORE") {
            config.store = match backend.trim().to_lowercase().as_str() {
                "memory" | "mock" => StoreConfig::Memory,
                "sqlite" => {
                    let path = lookup("LEGIS_SQLITE_PATH").ok_or_else(|| {
                        IngestError::configuration("LEGIS_STORE=sqlite requires LEGIS_SQLITE_PATH")
                    })?;
                    StoreConfig::Sqlite {
                        path: PathBuf::from(path),
                    }
                }
                other => {
                    return Err(IngestError::configuration(format!(
                        "LEGIS_STORE must be 'memory' or 'sqlite', got '{other}'"
                    )))
                }
            };
        }

        if let Some(raw) = lookup("LEGIS_MAX_CONCURRENCY") {
            config.max_concurrency = parse_setting("LEGIS_MAX_CONCURRENCY", &raw)?;
        }
        if let Some(raw) = lookup("LEGIS_RETRY_ATTEMPTS") {
            config.retry.max_attempts = parse_setting("LEGIS_RETRY_ATTEMPTS", &raw)?;
        }
        if let Some(raw) = lookup("LEGIS_RETRY_DELAY_MS") {
            config.retry.base_delay_ms = parse_setting("LEGIS_RETRY_DELAY_MS", &raw)?;
        }
        if let Some(raw) = lookup("LEGIS_RETRY_MAX_DELAY_MS") {
            config.retry.max_delay_ms = parse_setting("LEGIS_RETRY_MAX_DELAY_MS", &raw)?;
        }
        if let Some(filter) = lookup("LEGIS_LOG") {
            config.log_filter = filter;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(json: &str) -> Result<Self, IngestError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| IngestError::configuration(format!("invalid config JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), IngestError> {
        if self.max_concurrency == 0 {
            return Err(IngestError::configuration("max_concurrency must be at least 1"));
        }
        if self.retry.max_attempts == 0 {
            return Err(IngestError::configuration("retry.max_attempts must be at least 1"));
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err(IngestError::configuration(
                "retry.base_delay_ms must not exceed retry.max_delay_ms",
            ));
        }
        Ok(())
    }
}

fn parse_setting<T: FromStr>(key: &str, raw: &str) -> Result<T, IngestError> {
    raw.trim()
        .parse()
        .map_err(|_| IngestError::configuration(format!("{key} has invalid value '{raw}'")))
}
