//! Logging setup for otelprep.
//!
//! otelprep is a short-lived, synchronous tool, so its observability stops at
//! structured logs written to stderr via `tracing`. This crate owns the
//! subscriber configuration and the mapping of user-facing log levels.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod logging;

pub use error::TelemetryError;
pub use logging::{create_env_filter, init_logging, LogConfig, LogLevel};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
