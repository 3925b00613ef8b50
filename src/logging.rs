use tracing_subscriber::EnvFilter;

use crate::error::IngestError;

/// Install a global fmt subscriber using `filter` (EnvFilter syntax, e.g.
/// `"info,legis_ingest=debug"`).
///
/// Returns `Ok(false)` when a subscriber is already installed, so callers and
/// tests can invoke it more than once.
pub fn init(filter: &str) -> Result<bool, IngestError> {
    let filter = EnvFilter::try_new(filter)
        .map_err(|e| IngestError::configuration(format!("invalid log filter '{filter}': {e}")))?;

    Ok(tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_ok())
}
