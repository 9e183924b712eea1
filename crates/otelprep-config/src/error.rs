//! Configuration error types.

use std::path::PathBuf;

use otelprep_core::DocumentError;
use thiserror::Error;

/// Placeholder printed instead of a sensitive value.
pub const REDACTED: &str = "<redacted>";

/// Errors that can occur during configuration resolution.
///
/// Every variant except [`ConfigError::InstanceDropped`] aborts the run.
/// `InstanceDropped` is only ever recorded as a diagnostic on the resolved
/// configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found.
    #[error("configuration file not found: {}", path.display())]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// Failed to read configuration file.
    #[error("failed to read configuration file {}: {source}", path.display())]
    ReadError {
        /// Path to the file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration document is not syntactically valid.
    #[error("failed to parse configuration {source_name}: {message}")]
    ParseFailure {
        /// File path or environment variable holding the document.
        source_name: String,
        /// Parser message.
        message: String,
    },

    /// Missing required field.
    #[error("missing required configuration field: {field}")]
    MissingField {
        /// The missing field, with its environment variable when it has one.
        field: String,
    },

    /// Invalid configuration value.
    #[error("invalid value for {field}: '{value}' ({reason})")]
    InvalidValue {
        /// The field with the invalid value.
        field: String,
        /// The offending value, or a placeholder for secrets.
        value: String,
        /// Explanation of why the value is invalid.
        reason: String,
    },

    /// A monitored instance entry was rejected and left out.
    #[error("instance #{index} dropped: {reason}")]
    InstanceDropped {
        /// Position of the entry in its source list.
        index: usize,
        /// Why the entry was rejected.
        reason: String,
    },
}

impl ConfigError {
    /// Create a new file not found error.
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Create a new parse failure.
    pub fn parse_failure(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ParseFailure {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Create a new missing field error.
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Create a new invalid value error.
    pub fn invalid_value(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid value error that does not echo the value.
    pub fn invalid_secret(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::invalid_value(field, REDACTED, reason)
    }

    /// Whether this error aborts resolution.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::InstanceDropped { .. })
    }
}

impl From<DocumentError> for ConfigError {
    fn from(err: DocumentError) -> Self {
        match err {
            DocumentError::Io { path, source } if source.kind() == std::io::ErrorKind::NotFound => {
                Self::FileNotFound { path }
            }
            DocumentError::Io { path, source } => Self::ReadError { path, source },
            DocumentError::Parse {
                source_name,
                message,
                ..
            } => Self::ParseFailure {
                source_name,
                message,
            },
            other => Self::parse_failure("configuration", other.to_string()),
        }
    }
}
