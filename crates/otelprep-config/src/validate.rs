//! Field validators.
//!
//! Each validator checks one kind of value and reports failures as
//! [`ConfigError::InvalidValue`] naming the field it was given. They are
//! public so the rules can be exercised on their own.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;

use crate::{ConfigError, Secret};

/// Granularity, in seconds, that every interval-like field must respect.
pub const INTERVAL_GRANULARITY_SECS: u64 = 60;

/// Length of a shipping token.
pub const TOKEN_LENGTH: usize = 32;

/// AWS regions the auxiliary exporter can read from.
pub const AWS_REGIONS: &[&str] = &[
    "us-east-1",
    "us-east-2",
    "us-west-1",
    "us-west-2",
    "af-south-1",
    "ap-east-1",
    "ap-south-1",
    "ap-south-2",
    "ap-northeast-1",
    "ap-northeast-2",
    "ap-northeast-3",
    "ap-southeast-1",
    "ap-southeast-2",
    "ap-southeast-3",
    "ap-southeast-4",
    "ca-central-1",
    "eu-central-1",
    "eu-central-2",
    "eu-west-1",
    "eu-west-2",
    "eu-west-3",
    "eu-south-1",
    "eu-south-2",
    "eu-north-1",
    "il-central-1",
    "me-south-1",
    "me-central-1",
    "sa-east-1",
];

/// Listener region code.
///
/// `Unset` (the empty string) and `Us` both route to the default listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegionCode {
    /// No region given.
    #[default]
    Unset,
    /// Australia.
    Au,
    /// Canada.
    Ca,
    /// Europe (Frankfurt).
    Eu,
    /// Netherlands.
    Nl,
    /// United Kingdom.
    Uk,
    /// United States, the default region.
    Us,
    /// West US 2 (Azure).
    Wa,
}

impl RegionCode {
    /// Every accepted code except `Unset`.
    pub const ALL: [RegionCode; 7] = [
        Self::Au,
        Self::Ca,
        Self::Eu,
        Self::Nl,
        Self::Uk,
        Self::Us,
        Self::Wa,
    ];

    /// The code as written in configuration.
    pub fn code(self) -> &'static str {
        match self {
            Self::Unset => "",
            Self::Au => "au",
            Self::Ca => "ca",
            Self::Eu => "eu",
            Self::Nl => "nl",
            Self::Uk => "uk",
            Self::Us => "us",
            Self::Wa => "wa",
        }
    }

    /// Subdomain segment injected into the listener host name.
    pub fn listener_segment(self) -> String {
        match self {
            Self::Unset | Self::Us => String::new(),
            other => format!("-{}", other.code()),
        }
    }
}

impl FromStr for RegionCode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Self::Unset);
        }
        Self::ALL.into_iter().find(|r| r.code() == s).ok_or(())
    }
}

impl fmt::Display for RegionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Validate a listener region code; the empty string is accepted.
pub fn region_code(field: &str, value: &str) -> Result<RegionCode, ConfigError> {
    value.parse().map_err(|()| {
        let valid: Vec<_> = RegionCode::ALL.iter().map(|r| r.code()).collect();
        ConfigError::invalid_value(
            field,
            value,
            format!("expected one of {} or empty", valid.join(", ")),
        )
    })
}

/// Validate a shipping token.
///
/// A token is exactly 32 ASCII letters with at least one lowercase and one
/// uppercase letter.
pub fn token(field: &str, value: &str) -> Result<Secret, ConfigError> {
    let reason = if value.chars().count() != TOKEN_LENGTH {
        Some("must be exactly 32 characters")
    } else if !value.chars().all(|c| c.is_ascii_alphabetic()) {
        Some("must contain only letters")
    } else if !value.chars().any(|c| c.is_ascii_lowercase())
        || !value.chars().any(|c| c.is_ascii_uppercase())
    {
        Some("must mix lowercase and uppercase letters")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(ConfigError::invalid_secret(field, reason)),
        None => Ok(Secret::new(value)),
    }
}

/// Validate an interval: a positive multiple of 60 seconds.
pub fn interval(field: &str, value: i64) -> Result<u64, ConfigError> {
    u64::try_from(value)
        .ok()
        .filter(|v| *v > 0 && v % INTERVAL_GRANULARITY_SECS == 0)
        .ok_or_else(|| {
            ConfigError::invalid_value(
                field,
                value.to_string(),
                "must be a positive multiple of 60 seconds",
            )
        })
}

fn listener_pattern() -> &'static Regex {
    static LISTENER: OnceLock<Regex> = OnceLock::new();
    LISTENER.get_or_init(|| {
        Regex::new(
            r"^(http|https)://(([a-z0-9]|[a-z0-9][a-z0-9\-]*[a-z0-9])\.)*([a-z0-9]|[a-z0-9][a-z0-9\-]*[a-z0-9])(:[0-9]+)?$",
        )
        .expect("listener pattern is valid")
    })
}

/// Validate a custom listener URL: `http(s)://host[:port]` with no path.
///
/// The empty string means "no custom listener" and is accepted.
pub fn custom_listener(field: &str, value: &str) -> Result<String, ConfigError> {
    if value.is_empty() || listener_pattern().is_match(value) {
        Ok(value.to_string())
    } else {
        Err(ConfigError::invalid_value(
            field,
            value,
            "expected http(s)://<hostname>[:port] without a path",
        ))
    }
}

/// Validate a TCP port.
pub fn port(field: &str, value: &str) -> Result<u16, ConfigError> {
    value
        .trim()
        .parse::<u16>()
        .ok()
        .filter(|p| *p != 0)
        .ok_or_else(|| ConfigError::invalid_value(field, value, "expected a port between 1 and 65535"))
}

/// Validate an AWS region name.
pub fn aws_region(field: &str, value: &str) -> Result<String, ConfigError> {
    if AWS_REGIONS.contains(&value) {
        Ok(value.to_string())
    } else {
        Err(ConfigError::invalid_value(field, value, "not a supported AWS region"))
    }
}

/// Split a comma-separated list, dropping whitespace and empty items.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|item| item.chars().filter(|c| !c.is_whitespace()).collect::<String>())
        .filter(|item| !item.is_empty())
        .collect()
}

/// De-duplicate identifiers, keeping first-seen order.
///
/// An empty result is an error: at least one identifier is required.
pub fn identifiers<I>(field: &str, items: I) -> Result<Vec<String>, ConfigError>
where
    I: IntoIterator<Item = String>,
{
    let mut unique: Vec<String> = Vec::new();
    for item in items {
        let item = item.trim().to_string();
        if !item.is_empty() && !unique.contains(&item) {
            unique.push(item);
        }
    }

    if unique.is_empty() {
        return Err(ConfigError::invalid_value(
            field,
            "",
            "at least one identifier is required",
        ));
    }
    Ok(unique)
}

/// Parse a boolean from a string.
pub fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
