//! The precedence table and the layered lookups built on it.
//!
//! Each overridable field has one file path and at most one environment
//! variable. Precedence is evaluated per field: a non-empty environment
//! variable wins, otherwise the file value is used, otherwise the caller's
//! default applies.

use std::borrow::Cow;

use otelprep_core::{parse_str, Document, Format};
use tracing::debug;

use crate::validate::{parse_bool, split_list};
use crate::{ConfigError, Environment};

/// Where one configuration field can be read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSource {
    /// Key path in the configuration file.
    pub path: &'static [&'static str],
    /// Environment variable that overrides the file value.
    pub env: Option<&'static str>,
}

impl FieldSource {
    const fn new(path: &'static [&'static str], env: &'static str) -> Self {
        Self {
            path,
            env: Some(env),
        }
    }

    /// Dotted file path, used as the field name in errors.
    pub fn name(&self) -> String {
        self.path.join(".")
    }

    /// Field name plus its environment variable, for "missing" messages.
    pub fn label(&self) -> String {
        match self.env {
            Some(var) => format!("{} ({var})", self.name()),
            None => self.name(),
        }
    }
}

/// Every overridable field.
pub mod field {
    use super::FieldSource;

    /// Listener region code.
    pub const REGION: FieldSource = FieldSource::new(&["otel", "logzio_region"], "LOGZIO_REGION");
    /// Metrics shipping token.
    pub const TOKEN: FieldSource = FieldSource::new(&["otel", "token"], "TOKEN");
    /// Value of the `p8s_logzio_name` external label.
    pub const EXTERNAL_LABEL: FieldSource =
        FieldSource::new(&["otel", "p8s_logzio_name"], "P8S_LOGZIO_NAME");
    /// Custom listener URL.
    pub const CUSTOM_LISTENER: FieldSource =
        FieldSource::new(&["otel", "custom_listener"], "CUSTOM_LISTENER");
    /// Remote write timeout in seconds.
    pub const REMOTE_TIMEOUT: FieldSource =
        FieldSource::new(&["otel", "remote_timeout"], "REMOTE_TIMEOUT");
    /// The collector's own log level.
    pub const LOG_LEVEL: FieldSource = FieldSource::new(&["otel", "log_level"], "LOG_LEVEL");
    /// otelprep's log level.
    pub const TOOL_LOG_LEVEL: FieldSource =
        FieldSource::new(&["otel", "logzio_log_level"], "LOGZIO_LOG_LEVEL");
    /// Interval at which the collector scrapes the auxiliary exporter.
    pub const SCRAPE_INTERVAL: FieldSource =
        FieldSource::new(&["otel", "scrape_interval"], "SCRAPE_INTERVAL");

    /// Postgres exporter scrape interval.
    pub const PG_SCRAPE_INTERVAL: FieldSource =
        FieldSource::new(&["pg", "pg_scrape_interval"], "PG_SCRAPE_INTERVAL");
    /// Postgres exporter scrape timeout.
    pub const PG_SCRAPE_TIMEOUT: FieldSource =
        FieldSource::new(&["pg", "pg_scrape_timeout"], "PG_SCRAPE_TIMEOUT");
    /// Single-instance host.
    pub const PG_HOST: FieldSource = FieldSource::new(&["pg", "pg_host"], "PG_HOST");
    /// Single-instance port.
    pub const PG_PORT: FieldSource = FieldSource::new(&["pg", "pg_port"], "PG_PORT");
    /// Single-instance user.
    pub const PG_USER: FieldSource = FieldSource::new(&["pg", "pg_user"], "PG_USER");
    /// Single-instance password.
    pub const PG_PASSWORD: FieldSource = FieldSource::new(&["pg", "pg_password"], "PG_PASSWORD");
    /// Single-instance database.
    pub const PG_DATABASE: FieldSource = FieldSource::new(&["pg", "pg_db"], "PG_DATABASE");
    /// Single-instance constant labels (file only).
    pub const PG_LABELS: FieldSource = FieldSource {
        path: &["pg", "pg_labels"],
        env: None,
    };
    /// Instance list, or a YAML/JSON sequence in the environment.
    pub const PG_INSTANCES: FieldSource = FieldSource::new(&["pg", "instances"], "PG_INSTANCES");

    /// AWS region of the auxiliary exporter.
    pub const AWS_REGION: FieldSource = FieldSource::new(&["cloudwatch", "aws_region"], "AWS_REGION");
    /// CloudWatch period.
    pub const PERIOD: FieldSource = FieldSource::new(&["cloudwatch", "period_seconds"], "PERIOD_SECONDS");
    /// CloudWatch range.
    pub const RANGE: FieldSource = FieldSource::new(&["cloudwatch", "range_seconds"], "RANGE_SECONDS");
    /// CloudWatch delay.
    pub const DELAY: FieldSource = FieldSource::new(&["cloudwatch", "delay_seconds"], "DELAY_SECONDS");
    /// Role to assume.
    pub const ROLE_ARN: FieldSource = FieldSource::new(&["cloudwatch", "role_arn"], "AWS_ROLE_ARN");
    /// Resource identifiers to select.
    pub const TARGETS: FieldSource =
        FieldSource::new(&["cloudwatch", "rds_instances"], "RDS_INSTANCES");
    /// Namespace fragments to merge.
    pub const NAMESPACES: FieldSource =
        FieldSource::new(&["cloudwatch", "namespaces"], "AWS_NAMESPACES");
    /// Skip patching of a hand-authored exporter document.
    pub const CUSTOM_DOCUMENT: FieldSource =
        FieldSource::new(&["cloudwatch", "custom_config"], "CUSTOM_CONFIG");
    /// AWS access key id.
    pub const ACCESS_KEY_ID: FieldSource =
        FieldSource::new(&["cloudwatch", "aws_access_key_id"], "AWS_ACCESS_KEY_ID");
    /// AWS secret access key.
    pub const SECRET_ACCESS_KEY: FieldSource =
        FieldSource::new(&["cloudwatch", "aws_secret_access_key"], "AWS_SECRET_ACCESS_KEY");

    /// Log shipping token.
    pub const LOG_TOKEN: FieldSource =
        FieldSource::new(&["fluentd", "logzio_log_token"], "LOGZIO_LOG_TOKEN");
    /// Log listener URL.
    pub const LOG_LISTENER: FieldSource =
        FieldSource::new(&["fluentd", "logzio_log_listener"], "LOGZIO_LOG_LISTENER");
    /// Log type attached to shipped records.
    pub const LOG_TYPE: FieldSource = FieldSource::new(&["fluentd", "logzio_type"], "LOGZIO_TYPE");
    /// Buffer plugin type.
    pub const BUFFER_TYPE: FieldSource = FieldSource::new(&["fluentd", "buffer_type"], "BUFFER_TYPE");
    /// Buffer file path.
    pub const BUFFER_PATH: FieldSource = FieldSource::new(&["fluentd", "buffer_path"], "BUFFER_PATH");
    /// What the buffer does when full.
    pub const OVERFLOW_ACTION: FieldSource =
        FieldSource::new(&["fluentd", "overflow_action"], "OVERFLOW_ACTION");
    /// Maximum size of one buffer chunk.
    pub const CHUNK_LIMIT_SIZE: FieldSource =
        FieldSource::new(&["fluentd", "chunk_limit_size"], "CHUNK_LIMIT_SIZE");
    /// Maximum number of queued chunks.
    pub const QUEUE_LIMIT_LENGTH: FieldSource =
        FieldSource::new(&["fluentd", "queue_limit_length"], "QUEUE_LIMIT_LENGTH");
    /// Buffer flush interval.
    pub const FLUSH_INTERVAL: FieldSource =
        FieldSource::new(&["fluentd", "flush_interval"], "FLUSH_INTERVAL");
    /// Upper bound of the retry back-off.
    pub const RETRY_MAX_INTERVAL: FieldSource =
        FieldSource::new(&["fluentd", "retry_max_interval"], "RETRY_MAX_INTERVAL");
    /// Retry failed flushes without limit.
    pub const RETRY_FOREVER: FieldSource =
        FieldSource::new(&["fluentd", "retry_forever"], "RETRY_FOREVER");
    /// Number of flush threads.
    pub const FLUSH_THREAD_COUNT: FieldSource =
        FieldSource::new(&["fluentd", "flush_thread_count"], "FLUSH_THREAD_COUNT");
    /// Flush duration above which a warning is logged.
    pub const SLOW_FLUSH_LOG_THRESHOLD: FieldSource =
        FieldSource::new(&["fluentd", "slow_flush_log_threshold"], "SLOW_FLUSH_LOG_THRESHOLD");
}

/// The whole precedence table, in documentation order.
pub const PRECEDENCE: &[FieldSource] = &[
    field::REGION,
    field::TOKEN,
    field::EXTERNAL_LABEL,
    field::CUSTOM_LISTENER,
    field::REMOTE_TIMEOUT,
    field::LOG_LEVEL,
    field::TOOL_LOG_LEVEL,
    field::SCRAPE_INTERVAL,
    field::PG_SCRAPE_INTERVAL,
    field::PG_SCRAPE_TIMEOUT,
    field::PG_HOST,
    field::PG_PORT,
    field::PG_USER,
    field::PG_PASSWORD,
    field::PG_DATABASE,
    field::PG_INSTANCES,
    field::AWS_REGION,
    field::PERIOD,
    field::RANGE,
    field::DELAY,
    field::ROLE_ARN,
    field::TARGETS,
    field::NAMESPACES,
    field::CUSTOM_DOCUMENT,
    field::ACCESS_KEY_ID,
    field::SECRET_ACCESS_KEY,
    field::LOG_TOKEN,
    field::LOG_LISTENER,
    field::LOG_TYPE,
    field::BUFFER_TYPE,
    field::BUFFER_PATH,
    field::OVERFLOW_ACTION,
    field::CHUNK_LIMIT_SIZE,
    field::QUEUE_LIMIT_LENGTH,
    field::FLUSH_INTERVAL,
    field::RETRY_MAX_INTERVAL,
    field::RETRY_FOREVER,
    field::FLUSH_THREAD_COUNT,
    field::SLOW_FLUSH_LOG_THRESHOLD,
];

enum Raw<'a> {
    Env(&'static str, &'a str),
    File(&'a Document),
}

/// The file and environment layers of one resolution.
pub(crate) struct Layers<'a> {
    file: &'a Document,
    env: &'a Environment,
}

impl<'a> Layers<'a> {
    pub(crate) fn new(file: &'a Document, env: &'a Environment) -> Self {
        Self { file, env }
    }

    pub(crate) fn file(&self) -> &'a Document {
        self.file
    }

    fn raw(&self, field: &FieldSource) -> Option<Raw<'a>> {
        if let Some(var) = field.env {
            if let Some(value) = self.env.get(var) {
                debug!(field = %field.name(), source = "env", var, "Resolved field");
                return Some(Raw::Env(var, value));
            }
        }

        let value = self.file.get_path(field.path)?;
        debug!(field = %field.name(), source = "file", "Resolved field");
        Some(Raw::File(value))
    }

    /// A scalar field as text. Null counts as absent.
    pub(crate) fn string(&self, field: &FieldSource) -> Result<Option<String>, ConfigError> {
        match self.raw(field) {
            None | Some(Raw::File(Document::Null)) => Ok(None),
            Some(Raw::Env(_, value)) => Ok(Some(value.to_string())),
            Some(Raw::File(doc)) => doc
                .scalar_text()
                .map(Some)
                .ok_or_else(|| ConfigError::invalid_value(field.name(), doc.kind(), "expected a scalar")),
        }
    }

    /// A required, non-empty scalar field.
    pub(crate) fn required_string(&self, field: &FieldSource) -> Result<String, ConfigError> {
        self.string(field)?
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ConfigError::missing_field(field.label()))
    }

    /// An integer field. Environment text is parsed; file values must be
    /// integers, and an explicit null is rejected.
    pub(crate) fn integer(&self, field: &FieldSource) -> Result<Option<i64>, ConfigError> {
        match self.raw(field) {
            None => Ok(None),
            Some(Raw::Env(var, value)) => value.trim().parse().map(Some).map_err(|_| {
                ConfigError::invalid_value(
                    format!("{} ({var})", field.name()),
                    value,
                    "expected an integer",
                )
            }),
            Some(Raw::File(Document::Int(i))) => Ok(Some(*i)),
            Some(Raw::File(doc)) => Err(ConfigError::invalid_value(
                field.name(),
                doc.scalar_text().unwrap_or_else(|| doc.kind().to_string()),
                "expected an integer",
            )),
        }
    }

    /// A boolean field.
    pub(crate) fn boolean(&self, field: &FieldSource) -> Result<Option<bool>, ConfigError> {
        match self.raw(field) {
            None | Some(Raw::File(Document::Null)) => Ok(None),
            Some(Raw::File(Document::Bool(b))) => Ok(Some(*b)),
            Some(Raw::Env(_, value)) => parse_bool(value)
                .map(Some)
                .ok_or_else(|| ConfigError::invalid_value(field.name(), value, "expected a boolean")),
            Some(Raw::File(doc)) => doc
                .as_str()
                .and_then(parse_bool)
                .map(Some)
                .ok_or_else(|| {
                    ConfigError::invalid_value(
                        field.name(),
                        doc.scalar_text().unwrap_or_else(|| doc.kind().to_string()),
                        "expected a boolean",
                    )
                }),
        }
    }

    /// A list given either as a comma-separated string or a sequence.
    pub(crate) fn list(&self, field: &FieldSource) -> Result<Option<Vec<String>>, ConfigError> {
        match self.raw(field) {
            None | Some(Raw::File(Document::Null)) => Ok(None),
            Some(Raw::Env(_, value)) => Ok(Some(split_list(value))),
            Some(Raw::File(Document::String(value))) => Ok(Some(split_list(value))),
            Some(Raw::File(Document::Sequence(items))) => items
                .iter()
                .map(|item| {
                    item.scalar_text().ok_or_else(|| {
                        ConfigError::invalid_value(field.name(), item.kind(), "expected a list of scalars")
                    })
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Some),
            Some(Raw::File(doc)) => Err(ConfigError::invalid_value(
                field.name(),
                doc.kind(),
                "expected a comma-separated string or a list",
            )),
        }
    }

    /// A structured value. Environment text is parsed as YAML (JSON is
    /// valid YAML, so either works).
    pub(crate) fn structured(&self, field: &FieldSource) -> Result<Option<Cow<'a, Document>>, ConfigError> {
        match self.raw(field) {
            None => Ok(None),
            Some(Raw::Env(var, value)) => parse_str(value, Format::Yaml, var)
                .map(|doc| Some(Cow::Owned(doc)))
                .map_err(ConfigError::from),
            Some(Raw::File(doc)) => Ok(Some(Cow::Borrowed(doc))),
        }
    }
}
