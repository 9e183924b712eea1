//! Resolved configuration types.
//!
//! These are the validated, fully-defaulted values the patcher works from.
//! They are produced by [`crate::ConfigResolver`] and never contain
//! unchecked input.

use serde::Serialize;

use crate::validate::RegionCode;
use crate::{ConfigError, Profile, Secret};

/// Port of every Logz.io listener.
pub const LISTENER_PORT: u16 = 8053;

/// Port of the Logz.io log listener.
pub const LOG_LISTENER_PORT: u16 = 8071;

/// Build the remote write endpoint for a region.
///
/// A non-empty custom listener replaces the derived URL entirely.
///
/// ```
/// use otelprep_config::{listener_url, RegionCode};
///
/// assert_eq!(listener_url(RegionCode::Eu, ""), "https://listener-eu.logz.io:8053");
/// assert_eq!(listener_url(RegionCode::Us, ""), "https://listener.logz.io:8053");
/// assert_eq!(listener_url(RegionCode::Eu, "http://local:3000"), "http://local:3000");
/// ```
pub fn listener_url(region: RegionCode, custom_listener: &str) -> String {
    if custom_listener.is_empty() {
        format!(
            "https://listener{}.logz.io:{LISTENER_PORT}",
            region.listener_segment()
        )
    } else {
        custom_listener.to_string()
    }
}

/// Default log listener for a region.
///
/// ```
/// use otelprep_config::{log_listener_url, RegionCode};
///
/// assert_eq!(log_listener_url(RegionCode::Uk), "https://listener-uk.logz.io:8071");
/// ```
pub fn log_listener_url(region: RegionCode) -> String {
    format!(
        "https://listener{}.logz.io:{LOG_LISTENER_PORT}",
        region.listener_segment()
    )
}

/// Where and how the collector ships metrics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryTarget {
    /// Listener region code.
    pub region_code: RegionCode,
    /// Custom listener URL, empty when unset.
    pub custom_listener: String,
    /// Shipping token.
    pub token: Secret,
    /// Remote write timeout in seconds.
    pub remote_timeout_secs: u64,
    /// The collector's own log level.
    pub log_level: String,
    /// Value of the `p8s_logzio_name` external label.
    pub external_label_name: String,
    /// otelprep's own log level.
    pub tool_log_level: String,
    /// Interval at which the collector scrapes the auxiliary exporter.
    pub scrape_interval_secs: u64,
}

impl TelemetryTarget {
    /// The remote write endpoint.
    pub fn listener_url(&self) -> String {
        listener_url(self.region_code, &self.custom_listener)
    }
}

pub(crate) fn default_remote_timeout() -> u64 {
    120
}

pub(crate) fn default_scrape_interval() -> u64 {
    300
}

pub(crate) fn default_scrape_timeout() -> u64 {
    60
}

pub(crate) fn default_log_level() -> String {
    "info".to_string()
}

pub(crate) fn default_database() -> String {
    "postgres".to_string()
}

pub(crate) fn default_cloudwatch_window() -> u64 {
    300
}

pub(crate) fn default_namespaces() -> Vec<String> {
    vec!["RDS".to_string()]
}

pub(crate) fn default_log_type() -> String {
    "postgres".to_string()
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self {
            buffer_type: "file".to_string(),
            path: "/var/log/fluentd-buffers/postgres.buffer".to_string(),
            overflow_action: "block".to_string(),
            chunk_limit_size: "2M".to_string(),
            queue_limit_length: "6".to_string(),
            flush_interval: "5s".to_string(),
            retry_max_interval: "30".to_string(),
            retry_forever: true,
            flush_thread_count: "2".to_string(),
            slow_flush_log_threshold: "20.0".to_string(),
        }
    }
}

/// Scrape cadence of the per-instance exporters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrapeSettings {
    /// Scrape interval in seconds.
    pub interval_secs: u64,
    /// Scrape timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        Self {
            interval_secs: default_scrape_interval(),
            timeout_secs: default_scrape_timeout(),
        }
    }
}

/// One database whose exporter the collector runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitoredInstance {
    /// Host name or address.
    pub host: String,
    /// TCP port.
    pub port: u16,
    /// Login user.
    pub user: String,
    /// Login password.
    pub password: Secret,
    /// Database name.
    pub database: String,
    /// Constant labels attached to every series, in declaration order.
    pub extra_labels: Vec<(String, String)>,
}

impl MonitoredInstance {
    /// `user@host:port/database`, which identifies the instance without
    /// its password.
    pub fn identity(&self) -> String {
        format!("{}@{}:{}/{}", self.user, self.host, self.port, self.database)
    }
}

/// Static AWS credentials for the auxiliary exporter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwsCredentials {
    /// Access key id.
    pub access_key_id: Secret,
    /// Secret access key.
    pub secret_access_key: Secret,
}

/// Settings of the CloudWatch-style auxiliary exporter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuxiliaryExporter {
    /// AWS region.
    pub region: String,
    /// Metric period in seconds.
    pub period_secs: u64,
    /// Query range in seconds.
    pub range_secs: u64,
    /// Query delay in seconds.
    pub delay_secs: u64,
    /// Role to assume, empty when unset.
    pub role_arn: String,
    /// Resource identifiers to select, de-duplicated.
    pub target_identifiers: Vec<String>,
    /// Namespaces whose fragments are merged.
    pub namespaces: Vec<String>,
    /// The exporter document is hand-authored and must not be patched.
    pub custom_document: bool,
    /// Static credentials, when both halves are given.
    pub credentials: Option<AwsCredentials>,
}

/// Settings of the log shipper that runs next to the collector.
///
/// otelprep does not configure the shipper itself. The values are handed to
/// it as environment variables, see [`ResolvedConfig::handoff_vars`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogShipping {
    /// Log shipping token.
    pub token: Secret,
    /// Log listener URL.
    pub listener: String,
    /// Log type attached to every record.
    pub log_type: String,
    /// Buffering and retry behaviour.
    pub buffer: LogBuffer,
}

/// Buffer settings of the log shipper, passed through verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogBuffer {
    /// Buffer plugin type.
    pub buffer_type: String,
    /// Buffer file path.
    pub path: String,
    /// What the buffer does when full.
    pub overflow_action: String,
    /// Maximum chunk size, with unit.
    pub chunk_limit_size: String,
    /// Maximum number of queued chunks.
    pub queue_limit_length: String,
    /// Flush interval, with unit.
    pub flush_interval: String,
    /// Upper bound of the retry back-off.
    pub retry_max_interval: String,
    /// Retry failed flushes without limit.
    pub retry_forever: bool,
    /// Number of flush threads.
    pub flush_thread_count: String,
    /// Slow flush warning threshold in seconds.
    pub slow_flush_log_threshold: String,
}

/// An instance entry that was rejected during resolution.
#[derive(Debug)]
pub struct DroppedInstance {
    /// Position of the entry in its source list.
    pub index: usize,
    /// Host, when the entry named one.
    pub host: Option<String>,
    /// Why it was rejected. Always [`ConfigError::InstanceDropped`].
    pub error: ConfigError,
}

/// The validated configuration of one run.
#[derive(Debug)]
pub struct ResolvedConfig {
    pub(crate) profile: Profile,
    pub(crate) telemetry: TelemetryTarget,
    pub(crate) scrape: Option<ScrapeSettings>,
    pub(crate) instances: Vec<MonitoredInstance>,
    pub(crate) auxiliary: Option<AuxiliaryExporter>,
    pub(crate) log_shipping: Option<LogShipping>,
    pub(crate) dropped_instances: Vec<DroppedInstance>,
}

impl ResolvedConfig {
    /// The profile this configuration was resolved for.
    pub fn profile(&self) -> Profile {
        self.profile
    }

    /// Shipping settings.
    pub fn telemetry(&self) -> &TelemetryTarget {
        &self.telemetry
    }

    /// Exporter scrape cadence, when the profile monitors instances.
    pub fn scrape(&self) -> Option<&ScrapeSettings> {
        self.scrape.as_ref()
    }

    /// Instances that passed validation, in source order.
    pub fn instances(&self) -> &[MonitoredInstance] {
        &self.instances
    }

    /// Auxiliary exporter settings, when the profile has one.
    pub fn auxiliary(&self) -> Option<&AuxiliaryExporter> {
        self.auxiliary.as_ref()
    }

    /// Log shipper settings, when the profile ships logs.
    pub fn log_shipping(&self) -> Option<&LogShipping> {
        self.log_shipping.as_ref()
    }

    /// Variables for the processes started after otelprep.
    ///
    /// The log shipper and the auxiliary exporter read their settings from
    /// the environment. Values are returned in clear text, secrets included.
    pub fn handoff_vars(&self) -> Vec<(&'static str, String)> {
        let mut vars = Vec::new();
        if let Some(logs) = &self.log_shipping {
            let buffer = &logs.buffer;
            vars.extend([
                ("LOGZIO_LOG_TOKEN", logs.token.expose().to_string()),
                ("LOGZIO_LOG_LISTENER", logs.listener.clone()),
                ("LOGZIO_TYPE", logs.log_type.clone()),
                ("BUFFER_TYPE", buffer.buffer_type.clone()),
                ("BUFFER_PATH", buffer.path.clone()),
                ("OVERFLOW_ACTION", buffer.overflow_action.clone()),
                ("CHUNK_LIMIT_SIZE", buffer.chunk_limit_size.clone()),
                ("QUEUE_LIMIT_LENGTH", buffer.queue_limit_length.clone()),
                ("FLUSH_INTERVAL", buffer.flush_interval.clone()),
                ("RETRY_MAX_INTERVAL", buffer.retry_max_interval.clone()),
                ("RETRY_FOREVER", buffer.retry_forever.to_string()),
                ("FLUSH_THREAD_COUNT", buffer.flush_thread_count.clone()),
                ("SLOW_FLUSH_LOG_THRESHOLD", buffer.slow_flush_log_threshold.clone()),
            ]);
        }
        if let Some(credentials) = self.auxiliary.as_ref().and_then(|a| a.credentials.as_ref()) {
            vars.push(("AWS_ACCESS_KEY_ID", credentials.access_key_id.expose().to_string()));
            vars.push((
                "AWS_SECRET_ACCESS_KEY",
                credentials.secret_access_key.expose().to_string(),
            ));
        }
        vars
    }

    /// Entries that were rejected and left out.
    pub fn dropped_instances(&self) -> &[DroppedInstance] {
        &self.dropped_instances
    }

    /// The remote write endpoint.
    pub fn listener_url(&self) -> String {
        self.telemetry.listener_url()
    }

    /// A printable view with every secret left out.
    pub fn summary(&self) -> ConfigSummary {
        ConfigSummary {
            profile: self.profile.name(),
            listener_url: self.listener_url(),
            region_code: self.telemetry.region_code.code(),
            external_label_name: self.telemetry.external_label_name.clone(),
            remote_timeout_secs: self.telemetry.remote_timeout_secs,
            log_level: self.telemetry.log_level.clone(),
            scrape: self.scrape.map(|s| ScrapeSummary {
                interval_secs: s.interval_secs,
                timeout_secs: s.timeout_secs,
            }),
            instances: self
                .instances
                .iter()
                .map(|i| InstanceSummary {
                    host: i.host.clone(),
                    port: i.port,
                    user: i.user.clone(),
                    database: i.database.clone(),
                    labels: i
                        .extra_labels
                        .iter()
                        .map(|(k, v)| format!("{k}={v}"))
                        .collect(),
                })
                .collect(),
            dropped_instances: self
                .dropped_instances
                .iter()
                .map(|d| d.error.to_string())
                .collect(),
            auxiliary: self.auxiliary.as_ref().map(|a| AuxiliarySummary {
                region: a.region.clone(),
                period_secs: a.period_secs,
                range_secs: a.range_secs,
                delay_secs: a.delay_secs,
                role_arn: a.role_arn.clone(),
                target_identifiers: a.target_identifiers.clone(),
                namespaces: a.namespaces.clone(),
                custom_document: a.custom_document,
                static_credentials: a.credentials.is_some(),
            }),
            log_shipping: self.log_shipping.as_ref().map(|l| LogShippingSummary {
                listener: l.listener.clone(),
                log_type: l.log_type.clone(),
                buffer_type: l.buffer.buffer_type.clone(),
                buffer_path: l.buffer.path.clone(),
            }),
        }
    }
}

/// Redacted view of a [`ResolvedConfig`], for `--check` output.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigSummary {
    /// Profile name.
    pub profile: &'static str,
    /// Remote write endpoint.
    pub listener_url: String,
    /// Listener region code.
    pub region_code: &'static str,
    /// External label value.
    pub external_label_name: String,
    /// Remote write timeout.
    pub remote_timeout_secs: u64,
    /// Collector log level.
    pub log_level: String,
    /// Exporter scrape cadence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scrape: Option<ScrapeSummary>,
    /// Accepted instances.
    pub instances: Vec<InstanceSummary>,
    /// Rejection messages of dropped entries.
    pub dropped_instances: Vec<String>,
    /// Auxiliary exporter settings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auxiliary: Option<AuxiliarySummary>,
    /// Log shipper settings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_shipping: Option<LogShippingSummary>,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Serialize)]
pub struct ScrapeSummary {
    pub interval_secs: u64,
    pub timeout_secs: u64,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Serialize)]
pub struct InstanceSummary {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub database: String,
    pub labels: Vec<String>,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Serialize)]
pub struct AuxiliarySummary {
    pub region: String,
    pub period_secs: u64,
    pub range_secs: u64,
    pub delay_secs: u64,
    pub role_arn: String,
    pub target_identifiers: Vec<String>,
    pub namespaces: Vec<String>,
    pub custom_document: bool,
    pub static_credentials: bool,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Serialize)]
pub struct LogShippingSummary {
    pub listener: String,
    pub log_type: String,
    pub buffer_type: String,
    pub buffer_path: String,
}
