//! Processing pipeline: validate, remove background, store artifact, enhance, poll.

use std::sync::Arc;
use std::time::Instant;

use pixlift_core::{
    AppError, BackgroundRemovalResult, Config, ProcessingResult, UploadLimits, UploadedImage,
};
use pixlift_storage::Storage;

use crate::poll::{wait_for_output, PollPolicy};
use crate::remove_bg::{BackgroundRemover, RemoveBgClient};
use crate::replicate::{ImageEnhancer, ReplicateClient};

const ARTIFACT_CONTENT_TYPE: &str = "image/png";

/// Sequences the two external services for a single upload.
///
/// Stages short-circuit on the first failure. Once the background-removed artifact has been
/// written, any later failure deletes it before the error is returned.
#[derive(Clone)]
pub struct EnhancementPipeline {
    limits: UploadLimits,
    remover: Arc<dyn BackgroundRemover>,
    enhancer: Arc<dyn ImageEnhancer>,
    storage: Arc<dyn Storage>,
    poll_policy: PollPolicy,
}

impl EnhancementPipeline {
    pub fn new(
        limits: UploadLimits,
        remover: Arc<dyn BackgroundRemover>,
        enhancer: Arc<dyn ImageEnhancer>,
        storage: Arc<dyn Storage>,
        poll_policy: PollPolicy,
    ) -> Self {
        Self {
            limits,
            remover,
            enhancer,
            storage,
            poll_policy,
        }
    }

    /// Build the pipeline with the real remove.bg and Replicate clients.
    pub fn from_config(config: &Config, storage: Arc<dyn Storage>) -> anyhow::Result<Self> {
        let timeout = config.base.outbound_timeout;
        let remover = RemoveBgClient::new(&config.remove_bg, timeout)?;
        let enhancer = ReplicateClient::new(&config.replicate, timeout)?;

        Ok(Self::new(
            UploadLimits::from(&config.uploads),
            Arc::new(remover),
            Arc::new(enhancer),
            storage,
            PollPolicy::from(&config.replicate),
        ))
    }

    #[tracing::instrument(
        skip(self, image),
        fields(filename = %image.filename, content_type = %image.content_type, size_bytes = image.size())
    )]
    pub async fn run(&self, image: UploadedImage) -> Result<ProcessingResult, AppError> {
        let start = Instant::now();

        self.limits.validate(&image)?;

        let cutout = self.remover.remove_background(&image).await?;
        // The upload is no longer needed once the cut-out exists.
        drop(image);
        let artifact = BackgroundRemovalResult::new(cutout);

        let removed_bg_url = match self
            .storage
            .upload_with_key(&artifact.filename, artifact.data.clone(), ARTIFACT_CONTENT_TYPE)
            .await
        {
            Ok(url) => url,
            Err(e) => {
                self.discard_artifact(&artifact.filename).await;
                return Err(e.into());
            }
        };

        match self.enhance(&artifact).await {
            Ok((prediction_id, enhanced_url)) => {
                let processing_time_ms = start.elapsed().as_millis() as u64;
                tracing::info!(
                    prediction_id = %prediction_id,
                    removed_bg_url = %removed_bg_url,
                    enhanced_url = %enhanced_url,
                    processing_time_ms,
                    "Image processed"
                );
                Ok(ProcessingResult::succeeded(
                    removed_bg_url,
                    enhanced_url,
                    prediction_id,
                    processing_time_ms,
                ))
            }
            Err(e) => {
                self.discard_artifact(&artifact.filename).await;
                Err(e)
            }
        }
    }

    async fn enhance(
        &self,
        artifact: &BackgroundRemovalResult,
    ) -> Result<(String, String), AppError> {
        let job = self.enhancer.submit(&artifact.data).await?;
        let output = wait_for_output(self.enhancer.as_ref(), &job, &self.poll_policy).await?;
        Ok((job.id, output))
    }

    /// Best-effort removal of a temporary artifact; failures are logged, not returned.
    async fn discard_artifact(&self, key: &str) {
        match self.storage.delete(key).await {
            Ok(()) => tracing::debug!(key = %key, "Discarded artifact of failed run"),
            Err(e) => tracing::warn!(key = %key, error = %e, "Failed to discard artifact"),
        }
    }
}
