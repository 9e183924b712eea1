//! Structured logging for otelprep.
//!
//! Wraps the `tracing-subscriber` setup used by the binary: JSON lines by
//! default, a human-readable layout on request, and a level taken from the
//! resolved configuration unless `RUST_LOG` says otherwise.
//!
//! # Example
//!
//! ```rust,ignore
//! use otelprep_telemetry::{init_logging, LogConfig, LogLevel};
//!
//! let config = LogConfig {
//!     level: LogLevel::from_user("WARNING"),
//!     ..LogConfig::default()
//! };
//! init_logging(&config)?;
//!
//! tracing::info!(path = "otel-config.yml", "Patched collector configuration");
//! ```

use std::fmt;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::error::TelemetryError;
use crate::TelemetryResult;

/// Log verbosity for otelprep itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Everything, including patched document dumps.
    Debug,
    /// Progress messages.
    #[default]
    Info,
    /// Dropped instances and other recoverable problems.
    Warn,
    /// Fatal problems only.
    Error,
}

impl LogLevel {
    /// Map a user-supplied level name to a level.
    ///
    /// Accepts `DEBUG`, `INFO`, `WARNING`/`WARN`, `ERROR` and `CRITICAL`
    /// in any case. Anything else falls back to [`LogLevel::Info`].
    pub fn from_user(value: &str) -> Self {
        match value.trim().to_uppercase().as_str() {
            "DEBUG" => Self::Debug,
            "WARNING" | "WARN" => Self::Warn,
            "ERROR" | "CRITICAL" => Self::Error,
            _ => Self::Info,
        }
    }

    /// The directive understood by `EnvFilter`.
    pub fn as_directive(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_directive())
    }
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Whether logging is enabled.
    pub enabled: bool,

    /// Default verbosity.
    pub level: LogLevel,

    /// Whether to output JSON format.
    pub json_format: bool,

    /// Whether to include file/line info.
    pub file_line_info: bool,

    /// Whether to include target (module path).
    pub include_target: bool,

    /// Let a `RUST_LOG` directive replace `level`.
    pub respect_rust_log: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: LogLevel::Info,
            json_format: true,
            file_line_info: false,
            include_target: true,
            respect_rust_log: true,
        }
    }
}

impl LogConfig {
    /// Human-readable output with source locations, for local runs.
    #[must_use]
    pub fn development() -> Self {
        Self {
            level: LogLevel::Debug,
            json_format: false,
            file_line_info: true,
            ..Self::default()
        }
    }

    /// Replace the level, keeping everything else.
    #[must_use]
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }
}

/// Initializes the logging subsystem.
///
/// Can only succeed once per process; a second call returns
/// `TelemetryError::LoggingInit`.
pub fn init_logging(config: &LogConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let filter = build_filter(config)?;

    if config.json_format {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_file(config.file_line_info)
            .with_line_number(config.file_line_info)
            .with_target(config.include_target)
            .with_writer(std::io::stderr)
            .with_filter(filter);

        tracing_subscriber::registry()
            .with(fmt_layer)
            .try_init()
            .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_file(config.file_line_info)
            .with_line_number(config.file_line_info)
            .with_target(config.include_target)
            .with_writer(std::io::stderr)
            .with_filter(filter);

        tracing_subscriber::registry()
            .with(fmt_layer)
            .try_init()
            .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
    }

    Ok(())
}

fn build_filter(config: &LogConfig) -> TelemetryResult<EnvFilter> {
    if config.respect_rust_log {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return Ok(filter);
        }
    }
    create_env_filter(config.level.as_directive())
}

/// Creates an env filter from a string.
///
/// # Arguments
///
/// * `filter` - Filter string (e.g., "info", "otelprep_patch=debug,warn")
pub fn create_env_filter(filter: &str) -> TelemetryResult<EnvFilter> {
    EnvFilter::try_new(filter).map_err(|e| TelemetryError::InvalidFilter {
        filter: filter.to_string(),
        reason: e.to_string(),
    })
}
