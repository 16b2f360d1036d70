//! Pixlift Storage Library
//!
//! Artifact storage for intermediate pipeline results. Keys are flat file names such as
//! `removed_<uuid>.png`; they must not contain `..` or a leading `/`.

pub mod local;
pub mod traits;

pub use local::LocalStorage;
pub use traits::{Storage, StorageError, StorageResult};
