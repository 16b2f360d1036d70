//! Pixlift Core Library
//!
//! This crate provides the domain models, error taxonomy, configuration, and upload
//! validation shared by the storage, services, and API crates.

pub mod config;
pub mod error;
pub mod models;
pub mod validation;

// Re-export commonly used types
pub use config::{BaseConfig, Config, LogFormat, RemoveBgConfig, ReplicateConfig, UploadConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{
    BackgroundRemovalResult, EnhancementJob, JobSnapshot, JobStatus, ProcessingResult,
    UploadedImage,
};
pub use validation::UploadLimits;
