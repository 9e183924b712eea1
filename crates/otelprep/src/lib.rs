//! otelprep - OpenTelemetry collector preparation
//!
//! otelprep runs once before an OpenTelemetry collector starts. It reads a
//! configuration file plus environment overrides, validates them, and
//! patches the collector's documents in place so the collector ships
//! postgres (and optionally CloudWatch) metrics to a Logz.io listener.
//!
//! # Pipeline
//!
//! ```text
//! config.yml + env ──► ConfigResolver ──► ResolvedConfig
//!                                              │
//!        otel-config.yml ──► DocumentPatcher ◄─┘
//!        cloudwatch.yml  ──►       │
//!                                  ▼
//!                       documents rewritten in place
//!                       handoff.env for the log shipper and exporter
//! ```
//!
//! # Example Usage
//!
//! ```bash
//! # Multi-instance postgres with the default file locations
//! $ otelprep --profile postgres-multi
//!
//! # Override the token and region from the environment
//! $ TOKEN=... LOGZIO_REGION=eu otelprep --config /etc/otelprep/config.yml
//!
//! # Validate only, printing a redacted summary
//! $ otelprep --profile rds --check
//! ```
//!
//! Target documents are rewritten without locking. Run at most one otelprep
//! process per set of target documents.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod runner;

pub use error::{RunError, RunResult};
pub use runner::{
    AuxiliaryStatus, RunOptions, RunReport, Runner, DEFAULT_AUXILIARY_PATH,
    DEFAULT_COLLECTOR_PATH, DEFAULT_CONFIG_PATH, DEFAULT_FRAGMENTS_PATH, DEFAULT_HANDOFF_PATH,
};

/// otelprep version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
