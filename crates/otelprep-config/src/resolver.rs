//! Configuration resolution.
//!
//! This module provides the [`ConfigResolver`], which merges the
//! configuration file with the environment, applies defaults and validates
//! every field. Resolution either produces a complete [`ResolvedConfig`] or
//! fails on the first fatal error.

use std::collections::HashMap;
use std::path::Path;

use otelprep_core::{load, parse_str, Document, Format};
use tracing::{info, warn};

use crate::schema::{
    default_cloudwatch_window, default_database, default_log_level, default_log_type,
    default_namespaces, default_remote_timeout, default_scrape_interval, default_scrape_timeout,
    log_listener_url,
};
use crate::sources::{field, FieldSource, Layers};
use crate::{
    validate, AuxiliaryExporter, AwsCredentials, ConfigError, DroppedInstance, Environment,
    InstanceMode, LogBuffer, LogShipping, MonitoredInstance, Profile, RegionCode, ResolvedConfig,
    ScrapeSettings, Secret, TelemetryTarget,
};

/// Resolves configuration for one [`Profile`].
///
/// For every field, a non-empty environment variable overrides the file
/// value, which overrides the built-in default. See
/// [`crate::sources::PRECEDENCE`] for the full table.
///
/// # Example
///
/// ```
/// use otelprep_config::{ConfigResolver, Environment, Profile};
///
/// let content = r"
/// otel:
///   logzio_region: eu
///   p8s_logzio_name: staging
/// pg:
///   instances: []
/// ";
/// let env = Environment::new().with_var("TOKEN", "rDRJEidvpIbecUwshyCnGkuUjbymiHev");
///
/// let config = ConfigResolver::new(Profile::POSTGRES_MULTI)
///     .resolve_str(content, "yaml", &env)
///     .unwrap();
/// assert_eq!(config.listener_url(), "https://listener-eu.logz.io:8053");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigResolver {
    profile: Profile,
}

impl ConfigResolver {
    /// Create a resolver for `profile`.
    #[must_use]
    pub fn new(profile: Profile) -> Self {
        Self { profile }
    }

    /// The profile being resolved.
    pub fn profile(&self) -> Profile {
        self.profile
    }

    /// Resolve from a configuration file.
    ///
    /// The format is chosen by extension: `.yml`/`.yaml`, `.json` or
    /// `.toml`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - The file does not exist or cannot be read
    /// - The file is not valid for its format
    /// - A required field is missing or a value is invalid
    pub fn resolve(
        &self,
        path: impl AsRef<Path>,
        env: &Environment,
    ) -> Result<ResolvedConfig, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let document = load(path)?;
        info!(path = %path.display(), profile = %self.profile, "Loaded configuration file");
        self.resolve_document(&document, env)
    }

    /// Resolve from in-memory content in the named format.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the format is unknown, the content does not
    /// parse, or validation fails.
    pub fn resolve_str(
        &self,
        content: &str,
        format: &str,
        env: &Environment,
    ) -> Result<ResolvedConfig, ConfigError> {
        let format = Format::from_name(format)?;
        let document = parse_str(content, format, "inline configuration")?;
        self.resolve_document(&document, env)
    }

    /// Resolve from an already parsed document.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the document is not a mapping or validation
    /// fails.
    pub fn resolve_document(
        &self,
        file: &Document,
        env: &Environment,
    ) -> Result<ResolvedConfig, ConfigError> {
        if !file.is_null() && file.as_mapping().is_none() {
            return Err(ConfigError::parse_failure(
                "configuration",
                format!("top level must be a mapping, found {}", file.kind()),
            ));
        }

        let layers = Layers::new(file, env);
        let telemetry = resolve_telemetry(&layers)?;

        let (scrape, instances, dropped_instances) = match self.profile.instances() {
            InstanceMode::None => (None, Vec::new(), Vec::new()),
            InstanceMode::Single => {
                let instance = resolve_single_instance(&layers)?;
                (Some(resolve_scrape(&layers)?), vec![instance], Vec::new())
            }
            InstanceMode::List => {
                let (instances, dropped) = resolve_instance_list(&layers)?;
                (Some(resolve_scrape(&layers)?), instances, dropped)
            }
        };

        let auxiliary = if self.profile.has_auxiliary_exporter() {
            Some(resolve_auxiliary(&layers)?)
        } else {
            None
        };

        let log_shipping = if self.profile.ships_logs() {
            Some(resolve_log_shipping(&layers, telemetry.region_code)?)
        } else {
            None
        };

        info!(
            profile = %self.profile,
            instances = instances.len(),
            dropped = dropped_instances.len(),
            auxiliary = auxiliary.is_some(),
            log_shipping = log_shipping.is_some(),
            "Configuration resolved"
        );

        Ok(ResolvedConfig {
            profile: self.profile,
            telemetry,
            scrape,
            instances,
            auxiliary,
            log_shipping,
            dropped_instances,
        })
    }
}

/// The tool log level of a configuration, read before full resolution.
///
/// Logging has to be set up before the configuration is validated, so this
/// only applies the precedence rule to one field and falls back to `info`
/// when the value is absent or unusable.
pub fn tool_log_level(file: &Document, env: &Environment) -> String {
    Layers::new(file, env)
        .string(&field::TOOL_LOG_LEVEL)
        .ok()
        .flatten()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(default_log_level)
}

fn interval_or(layers: &Layers<'_>, source: &FieldSource, default: u64) -> Result<u64, ConfigError> {
    match layers.integer(source)? {
        Some(value) => validate::interval(&source.name(), value),
        None => Ok(default),
    }
}

fn string_or(layers: &Layers<'_>, source: &FieldSource, default: impl FnOnce() -> String) -> Result<String, ConfigError> {
    Ok(layers
        .string(source)?
        .filter(|s| !s.is_empty())
        .unwrap_or_else(default))
}

fn resolve_telemetry(layers: &Layers<'_>) -> Result<TelemetryTarget, ConfigError> {
    let region = string_or(layers, &field::REGION, String::new)?;
    let region_code = validate::region_code(&field::REGION.name(), &region)?;

    let token = layers.required_string(&field::TOKEN)?;
    let token = validate::token(&field::TOKEN.name(), &token)?;

    let listener = string_or(layers, &field::CUSTOM_LISTENER, String::new)?;
    let custom_listener = validate::custom_listener(&field::CUSTOM_LISTENER.name(), &listener)?;

    Ok(TelemetryTarget {
        region_code,
        custom_listener,
        token,
        remote_timeout_secs: interval_or(layers, &field::REMOTE_TIMEOUT, default_remote_timeout())?,
        log_level: string_or(layers, &field::LOG_LEVEL, default_log_level)?,
        external_label_name: layers.required_string(&field::EXTERNAL_LABEL)?,
        tool_log_level: string_or(layers, &field::TOOL_LOG_LEVEL, default_log_level)?,
        scrape_interval_secs: interval_or(layers, &field::SCRAPE_INTERVAL, default_scrape_interval())?,
    })
}

fn resolve_scrape(layers: &Layers<'_>) -> Result<ScrapeSettings, ConfigError> {
    Ok(ScrapeSettings {
        interval_secs: interval_or(layers, &field::PG_SCRAPE_INTERVAL, default_scrape_interval())?,
        timeout_secs: interval_or(layers, &field::PG_SCRAPE_TIMEOUT, default_scrape_timeout())?,
    })
}

fn resolve_single_instance(layers: &Layers<'_>) -> Result<MonitoredInstance, ConfigError> {
    let host = layers.required_string(&field::PG_HOST)?;
    let port = layers.required_string(&field::PG_PORT)?;
    let port = validate::port(&field::PG_PORT.name(), &port)?;
    let user = layers.required_string(&field::PG_USER)?;
    let password = Secret::new(layers.required_string(&field::PG_PASSWORD)?);
    let database = string_or(layers, &field::PG_DATABASE, default_database)?;

    let extra_labels = match layers.file().get_path(field::PG_LABELS.path) {
        Some(labels) => parse_labels(&field::PG_LABELS.name(), labels)?,
        None => Vec::new(),
    };

    Ok(MonitoredInstance {
        host,
        port,
        user,
        password,
        database,
        extra_labels,
    })
}

fn resolve_instance_list(
    layers: &Layers<'_>,
) -> Result<(Vec<MonitoredInstance>, Vec<DroppedInstance>), ConfigError> {
    let Some(list) = layers.structured(&field::PG_INSTANCES)? else {
        return Ok((Vec::new(), Vec::new()));
    };

    let entries = match &*list {
        Document::Null => return Ok((Vec::new(), Vec::new())),
        Document::Sequence(entries) => entries,
        other => {
            return Err(ConfigError::invalid_value(
                field::PG_INSTANCES.name(),
                other.kind(),
                "expected a list of instances",
            ))
        }
    };

    let mut instances = Vec::with_capacity(entries.len());
    let mut dropped = Vec::new();
    // Receiver keys derive from the identity, so a repeat would overwrite.
    let mut seen: HashMap<String, usize> = HashMap::new();
    for (index, entry) in entries.iter().enumerate() {
        let reason = match parse_instance(index, entry) {
            Ok(instance) => match seen.get(&instance.identity()) {
                Some(first) => format!(
                    "{} repeats {}[{first}]",
                    instance.identity(),
                    field::PG_INSTANCES.name()
                ),
                None => {
                    seen.insert(instance.identity(), index);
                    instances.push(instance);
                    continue;
                }
            },
            Err(error) => error.to_string(),
        };

        let host = entry.get("pg_host").and_then(Document::scalar_text);
        let error = ConfigError::InstanceDropped { index, reason };
        warn!(index, host = host.as_deref().unwrap_or(""), error = %error, "Dropping instance");
        dropped.push(DroppedInstance { index, host, error });
    }

    Ok((instances, dropped))
}

fn parse_instance(index: usize, entry: &Document) -> Result<MonitoredInstance, ConfigError> {
    let name = |key: &str| format!("{}[{index}].{key}", field::PG_INSTANCES.name());

    if entry.as_mapping().is_none() {
        return Err(ConfigError::invalid_value(
            format!("{}[{index}]", field::PG_INSTANCES.name()),
            entry.kind(),
            "expected a mapping",
        ));
    }

    let text = |key: &str| -> Result<Option<String>, ConfigError> {
        match entry.get(key) {
            None | Some(Document::Null) => Ok(None),
            Some(value) => value
                .scalar_text()
                .map(|s| Some(s).filter(|s| !s.is_empty()))
                .ok_or_else(|| ConfigError::invalid_value(name(key), value.kind(), "expected a scalar")),
        }
    };
    let required = |key: &str| text(key)?.ok_or_else(|| ConfigError::missing_field(name(key)));

    let host = required("pg_host")?;
    let port = validate::port(&name("pg_port"), &required("pg_port")?)?;
    let user = required("pg_user")?;
    let password = Secret::new(required("pg_password")?);
    let database = text("pg_db")?.unwrap_or_else(default_database);
    let extra_labels = match entry.get("pg_labels") {
        Some(labels) => parse_labels(&name("pg_labels"), labels)?,
        None => Vec::new(),
    };

    Ok(MonitoredInstance {
        host,
        port,
        user,
        password,
        database,
        extra_labels,
    })
}

/// Labels are either a sequence of single-key mappings or one mapping.
fn parse_labels(field: &str, labels: &Document) -> Result<Vec<(String, String)>, ConfigError> {
    let mut pairs = Vec::new();
    let mut push_all = |map: &otelprep_core::Mapping| -> Result<(), ConfigError> {
        for (key, value) in map {
            let value = value.scalar_text().ok_or_else(|| {
                ConfigError::invalid_value(format!("{field}.{key}"), value.kind(), "label values must be scalars")
            })?;
            pairs.push((key.clone(), value));
        }
        Ok(())
    };

    match labels {
        Document::Null => {}
        Document::Mapping(map) => push_all(map)?,
        Document::Sequence(items) => {
            for item in items {
                let map = item.as_mapping().ok_or_else(|| {
                    ConfigError::invalid_value(field, item.kind(), "expected key/value mappings")
                })?;
                push_all(map)?;
            }
        }
        other => {
            return Err(ConfigError::invalid_value(
                field,
                other.kind(),
                "expected a list of key/value mappings",
            ))
        }
    }

    Ok(pairs)
}

fn resolve_auxiliary(layers: &Layers<'_>) -> Result<AuxiliaryExporter, ConfigError> {
    let region = layers.required_string(&field::AWS_REGION)?;
    let region = validate::aws_region(&field::AWS_REGION.name(), &region)?;

    let targets = layers
        .list(&field::TARGETS)?
        .ok_or_else(|| ConfigError::missing_field(field::TARGETS.label()))?;
    let target_identifiers = validate::identifiers(&field::TARGETS.name(), targets)?;

    let namespaces = match layers.list(&field::NAMESPACES)? {
        Some(items) if !items.is_empty() => validate::identifiers(&field::NAMESPACES.name(), items)?,
        _ => default_namespaces(),
    };

    Ok(AuxiliaryExporter {
        region,
        period_secs: interval_or(layers, &field::PERIOD, default_cloudwatch_window())?,
        range_secs: interval_or(layers, &field::RANGE, default_cloudwatch_window())?,
        delay_secs: interval_or(layers, &field::DELAY, default_cloudwatch_window())?,
        role_arn: string_or(layers, &field::ROLE_ARN, String::new)?,
        target_identifiers,
        namespaces,
        custom_document: layers.boolean(&field::CUSTOM_DOCUMENT)?.unwrap_or(false),
        credentials: resolve_credentials(layers)?,
    })
}

fn resolve_credentials(layers: &Layers<'_>) -> Result<Option<AwsCredentials>, ConfigError> {
    let access_key_id = layers.string(&field::ACCESS_KEY_ID)?.filter(|s| !s.is_empty());
    let secret_access_key = layers
        .string(&field::SECRET_ACCESS_KEY)?
        .filter(|s| !s.is_empty());

    match (access_key_id, secret_access_key) {
        (Some(id), Some(secret)) => Ok(Some(AwsCredentials {
            access_key_id: Secret::new(id),
            secret_access_key: Secret::new(secret),
        })),
        (None, None) => Ok(None),
        (Some(_), None) => Err(ConfigError::invalid_secret(
            field::ACCESS_KEY_ID.label(),
            "given without AWS_SECRET_ACCESS_KEY",
        )),
        (None, Some(_)) => Err(ConfigError::invalid_secret(
            field::SECRET_ACCESS_KEY.label(),
            "given without AWS_ACCESS_KEY_ID",
        )),
    }
}

fn resolve_log_shipping(layers: &Layers<'_>, region: RegionCode) -> Result<LogShipping, ConfigError> {
    let token = Secret::new(layers.required_string(&field::LOG_TOKEN)?);

    let listener = string_or(layers, &field::LOG_LISTENER, String::new)?;
    let listener = if listener.is_empty() {
        log_listener_url(region)
    } else {
        validate::custom_listener(&field::LOG_LISTENER.name(), &listener)?
    };

    let defaults = LogBuffer::default();
    let buffer = LogBuffer {
        buffer_type: string_or(layers, &field::BUFFER_TYPE, || defaults.buffer_type)?,
        path: string_or(layers, &field::BUFFER_PATH, || defaults.path)?,
        overflow_action: string_or(layers, &field::OVERFLOW_ACTION, || defaults.overflow_action)?,
        chunk_limit_size: string_or(layers, &field::CHUNK_LIMIT_SIZE, || defaults.chunk_limit_size)?,
        queue_limit_length: string_or(layers, &field::QUEUE_LIMIT_LENGTH, || {
            defaults.queue_limit_length
        })?,
        flush_interval: string_or(layers, &field::FLUSH_INTERVAL, || defaults.flush_interval)?,
        retry_max_interval: string_or(layers, &field::RETRY_MAX_INTERVAL, || {
            defaults.retry_max_interval
        })?,
        retry_forever: layers
            .boolean(&field::RETRY_FOREVER)?
            .unwrap_or(defaults.retry_forever),
        flush_thread_count: string_or(layers, &field::FLUSH_THREAD_COUNT, || {
            defaults.flush_thread_count
        })?,
        slow_flush_log_threshold: string_or(layers, &field::SLOW_FLUSH_LOG_THRESHOLD, || {
            defaults.slow_flush_log_threshold
        })?,
    };

    Ok(LogShipping {
        token,
        listener,
        log_type: string_or(layers, &field::LOG_TYPE, default_log_type)?,
        buffer,
    })
}
