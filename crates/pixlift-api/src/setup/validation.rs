//! Configuration validation
//!
//! Validates critical configuration values at startup to catch misconfigurations early.

use anyhow::{anyhow, Result};
use pixlift_core::Config;

/// Validate critical configuration values
///
/// Runs the config's own checks, then warns about settings that are legal but suspicious.
pub fn validate_config(config: &Config) -> Result<()> {
    config.validate()?;

    let poll_budget = config
        .poll_budget()
        .ok_or_else(|| anyhow!("Enhancement poll budget is out of range"))?;
    let long_budget = config
        .base
        .outbound_timeout
        .checked_mul(10)
        .map_or(false, |limit| poll_budget > limit);
    if long_budget {
        tracing::warn!(
            poll_budget_secs = poll_budget.as_secs(),
            "Enhancement poll budget is very long - requests may be held open for minutes"
        );
    }

    if config.uploads.max_file_size_bytes > 12 * 1024 * 1024 {
        tracing::warn!(
            max_file_size_bytes = config.uploads.max_file_size_bytes,
            "Upload limit exceeds what remove.bg accepts (12 MB); large uploads will be rejected upstream"
        );
    }

    Ok(())
}
