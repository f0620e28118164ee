//! # lobby-common
//!
//! Shared utilities: sync configuration, the error taxonomy surfaced to the
//! UI layer, and tracing setup.

pub mod config;
pub mod error;
pub mod telemetry;

// Re-export commonly used types at crate root
pub use config::{ConfigError, SyncConfig};
pub use error::{ErrorKind, Notice, Operation, SyncError, SyncResult};
pub use telemetry::{
    init_tracing, init_tracing_with_config, try_init_tracing, try_init_tracing_with_config,
    TracingConfig, TracingError,
};
