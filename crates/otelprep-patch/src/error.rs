//! Patch error types.

use otelprep_core::DocumentError;
use thiserror::Error;

/// Errors raised while patching a target document.
///
/// All of them are fatal: the target file is left as it was.
#[derive(Error, Debug)]
pub enum PatchError {
    /// The template lacks a key path the patch writes under, or holds the
    /// wrong kind of value there.
    #[error("template error: {0}")]
    Template(#[from] DocumentError),

    /// A namespace fragment is not shaped like a list of metric entries.
    #[error("invalid fragment for namespace {namespace}: {reason}")]
    InvalidFragment {
        /// Namespace whose fragment is malformed.
        namespace: String,
        /// What is wrong with it.
        reason: String,
    },

    /// No free port could be obtained for an exporter.
    #[error("failed to allocate an exporter port: {0}")]
    PortAllocation(#[source] std::io::Error),

    /// The auxiliary document was patched for a profile without one.
    #[error("profile {profile} has no auxiliary exporter")]
    NoAuxiliaryExporter {
        /// Profile name.
        profile: String,
    },
}

impl PatchError {
    /// Create a new invalid fragment error.
    pub fn invalid_fragment(namespace: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidFragment {
            namespace: namespace.into(),
            reason: reason.into(),
        }
    }
}
