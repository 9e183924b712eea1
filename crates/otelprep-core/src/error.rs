//! Document error types.

use std::path::PathBuf;

use thiserror::Error;

use crate::Format;

/// Errors raised while loading, navigating or writing a [`Document`](crate::Document).
#[derive(Debug, Error)]
pub enum DocumentError {
    /// A key path the caller expected to exist is absent.
    #[error("missing key path `{path}` in document")]
    MissingPath {
        /// Dotted key path that could not be resolved.
        path: String,
    },

    /// A key path exists but holds the wrong kind of value.
    #[error("expected {expected} at `{path}`, found {found}")]
    TypeMismatch {
        /// Dotted key path of the offending value.
        path: String,
        /// Kind the caller required.
        expected: &'static str,
        /// Kind actually present.
        found: &'static str,
    },

    /// The document text is not syntactically valid.
    #[error("failed to parse {format} document {source_name}: {message}")]
    Parse {
        /// File path or other label of the input.
        source_name: String,
        /// Format the parser expected.
        format: Format,
        /// Parser message.
        message: String,
    },

    /// The document could not be rendered back to text.
    #[error("failed to serialize {format} document: {message}")]
    Serialize {
        /// Output format.
        format: Format,
        /// Serializer message.
        message: String,
    },

    /// The file extension or format name is not one we can read.
    #[error("unsupported document format: {0}")]
    UnsupportedFormat(String),

    /// Reading or writing a document file failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// File being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl DocumentError {
    /// Create a missing path error from path segments.
    pub fn missing_path(path: &[&str]) -> Self {
        Self::MissingPath {
            path: path.join("."),
        }
    }

    /// Create a type mismatch error from path segments.
    pub fn type_mismatch(path: &[&str], expected: &'static str, found: &'static str) -> Self {
        Self::TypeMismatch {
            path: path.join("."),
            expected,
            found,
        }
    }

    /// Create an I/O error for the given file.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
