//! Telemetry initialization
//!
//! Sets up the global `tracing` subscriber for the process.

mod init_basic;

pub use init_basic::{init_telemetry, shutdown_telemetry};
