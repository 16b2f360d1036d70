//! Pixlift Services Library
//!
//! Clients for the two external collaborators (remove.bg and Replicate), the job poll
//! loop, and the pipeline that sequences them.

pub mod pipeline;
pub mod poll;
pub mod remove_bg;
pub mod replicate;

pub use pipeline::EnhancementPipeline;
pub use poll::{wait_for_output, PollPolicy};
pub use remove_bg::{BackgroundRemover, RemoveBgClient};
pub use replicate::{ImageEnhancer, ReplicateClient};
