//! Application state shared by all handlers.

use pixlift_core::{AppError, Config};
use pixlift_services::EnhancementPipeline;
use pixlift_storage::Storage;
use std::sync::Arc;

use crate::error::HttpAppError;

/// Immutable per-process state. Handlers receive it as `State<Arc<AppState>>`.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub pipeline: EnhancementPipeline,
    pub storage: Arc<dyn Storage>,
    /// Attach error chains to error responses. Fixed at startup from the configured environment.
    pub expose_trace: bool,
}

impl AppState {
    pub fn new(config: Config, pipeline: EnhancementPipeline, storage: Arc<dyn Storage>) -> Self {
        let expose_trace = config.is_development();
        Self {
            config,
            pipeline,
            storage,
            expose_trace,
        }
    }

    pub fn http_error(&self, error: AppError) -> HttpAppError {
        HttpAppError::new(error, self.expose_trace)
    }
}
