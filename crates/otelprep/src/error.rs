//! Error types for a full otelprep run.

use otelprep_config::ConfigError;
use otelprep_core::DocumentError;
use otelprep_patch::PatchError;
use thiserror::Error;

/// Errors that end a run.
#[derive(Debug, Error)]
pub enum RunError {
    /// The configuration could not be resolved. No document was touched.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A target document could not be read, parsed or written.
    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    /// A target document does not have the expected shape.
    #[error("Patch error: {0}")]
    Patch(#[from] PatchError),
}

impl RunError {
    /// Whether the failure happened before any document was opened.
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

/// Result type for runs.
pub type RunResult<T> = Result<T, RunError>;
