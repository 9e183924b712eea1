//! Configuration resolution for otelprep.
//!
//! This crate turns one configuration file plus the process environment into
//! a validated [`ResolvedConfig`]:
//! - YAML, JSON and TOML configuration files
//! - Per-field environment variable overrides
//! - Built-in defaults for every optional field
//! - Validation of regions, tokens, intervals, listeners and ports
//!
//! # Overview
//!
//! A [`Profile`] says which sections a deployment needs. The
//! [`ConfigResolver`] reads exactly those sections:
//!
//! - [`TelemetryTarget`] - where metrics are shipped and with which token
//! - [`MonitoredInstance`] - one postgres instance to scrape
//! - [`AuxiliaryExporter`] - CloudWatch-style exporter settings
//! - [`LogShipping`] - log shipper settings, handed on as environment
//!   variables through [`ResolvedConfig::handoff_vars`]
//!
//! # Example
//!
//! ```no_run
//! use otelprep_config::{ConfigResolver, Environment, Profile};
//!
//! # fn main() -> Result<(), otelprep_config::ConfigError> {
//! let env = Environment::from_process();
//! let config = ConfigResolver::new(Profile::RDS).resolve("config.yml", &env)?;
//!
//! println!("Shipping to: {}", config.listener_url());
//! # Ok(())
//! # }
//! ```
//!
//! # Environment Variable Overrides
//!
//! A variable that is set and non-empty replaces the file value of its
//! field, for example:
//!
//! - `LOGZIO_REGION=eu` overrides `otel.logzio_region`
//! - `PG_INSTANCES='[{"pg_host": "db1", ...}]'` replaces `pg.instances`
//!
//! [`sources::PRECEDENCE`] lists every field.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod env;
mod error;
mod profile;
mod resolver;
mod schema;
mod secret;
pub mod sources;
pub mod validate;

pub use env::{render_dotenv, Environment};
pub use error::{ConfigError, REDACTED};
pub use profile::{InstanceMode, Profile};
pub use resolver::{tool_log_level, ConfigResolver};
pub use schema::{
    listener_url, log_listener_url, AuxiliaryExporter, AuxiliarySummary, AwsCredentials,
    ConfigSummary, DroppedInstance, InstanceSummary, LogBuffer, LogShipping, LogShippingSummary,
    MonitoredInstance, ResolvedConfig, ScrapeSettings, ScrapeSummary, TelemetryTarget,
    LISTENER_PORT, LOG_LISTENER_PORT,
};
pub use secret::Secret;
pub use validate::RegionCode;
