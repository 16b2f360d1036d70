//! Service initialization and application state setup

use crate::state::AppState;
use anyhow::Context;
use pixlift_core::Config;
use pixlift_services::EnhancementPipeline;
use pixlift_storage::{LocalStorage, Storage};
use std::sync::Arc;

/// Build storage and the processing pipeline from configuration.
pub async fn initialize_services(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let storage: Arc<dyn Storage> = Arc::new(
        LocalStorage::new(
            &config.uploads.upload_dir,
            config.uploads.public_base_url.clone(),
        )
        .await
        .context("Failed to initialize artifact storage")?,
    );

    tracing::info!(
        upload_dir = %config.uploads.upload_dir,
        public_base_url = %config.uploads.public_base_url,
        "Artifact storage initialized"
    );

    let pipeline = EnhancementPipeline::from_config(config, storage.clone())
        .context("Failed to initialize processing pipeline")?;

    tracing::info!(
        remove_bg_api_url = %config.remove_bg.api_url,
        replicate_api_base = %config.replicate.api_base,
        poll_interval_ms = config.replicate.poll_interval.as_millis() as u64,
        poll_max_attempts = config.replicate.poll_max_attempts,
        "Processing pipeline initialized"
    );

    let state = AppState::new(config.clone(), pipeline, storage);
    if state.expose_trace {
        tracing::warn!(
            environment = %config.environment(),
            "Development mode - error traces are included in API responses"
        );
    }

    Ok(Arc::new(state))
}
