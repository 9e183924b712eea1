//! Read, resolve, patch, write.

use std::path::{Path, PathBuf};

use otelprep_config::{render_dotenv, ConfigError, ConfigResolver, Environment, Profile, ResolvedConfig};
use otelprep_core::{load, read_text, render, write_text, Document, TargetFile};
use otelprep_patch::{AuxiliaryOutcome, DocumentPatcher, EphemeralPorts, PortAllocator};
use tracing::{debug, info, Level};

use crate::RunResult;

/// Default configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "./config_files/config.yml";
/// Default collector document.
pub const DEFAULT_COLLECTOR_PATH: &str = "./config_files/otel-config.yml";
/// Default auxiliary exporter document.
pub const DEFAULT_AUXILIARY_PATH: &str = "./config_files/cloudwatch.yml";
/// Default namespace fragments.
pub const DEFAULT_FRAGMENTS_PATH: &str = "./config_files/namespaces.yml";
/// Default `.env` file for the processes started after otelprep.
pub const DEFAULT_HANDOFF_PATH: &str = "./config_files/handoff.env";

/// Paths and profile of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Deployment profile.
    pub profile: Profile,
    /// Configuration file.
    pub config_path: PathBuf,
    /// Collector document, rewritten in place.
    pub collector_path: PathBuf,
    /// Auxiliary exporter document, rewritten in place.
    pub auxiliary_path: PathBuf,
    /// Namespace fragments, read only.
    pub fragments_path: PathBuf,
    /// Variables for the log shipper and the auxiliary exporter, replaced
    /// when there are any.
    pub handoff_path: PathBuf,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            profile: Profile::default(),
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
            collector_path: PathBuf::from(DEFAULT_COLLECTOR_PATH),
            auxiliary_path: PathBuf::from(DEFAULT_AUXILIARY_PATH),
            fragments_path: PathBuf::from(DEFAULT_FRAGMENTS_PATH),
            handoff_path: PathBuf::from(DEFAULT_HANDOFF_PATH),
        }
    }
}

impl RunOptions {
    /// Set the profile.
    #[must_use]
    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.profile = profile;
        self
    }

    /// Set the configuration file.
    #[must_use]
    pub fn with_config(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = path.into();
        self
    }

    /// Set the collector document.
    #[must_use]
    pub fn with_collector(mut self, path: impl Into<PathBuf>) -> Self {
        self.collector_path = path.into();
        self
    }

    /// Set the auxiliary exporter document.
    #[must_use]
    pub fn with_auxiliary(mut self, path: impl Into<PathBuf>) -> Self {
        self.auxiliary_path = path.into();
        self
    }

    /// Set the namespace fragments file.
    #[must_use]
    pub fn with_fragments(mut self, path: impl Into<PathBuf>) -> Self {
        self.fragments_path = path.into();
        self
    }

    /// Set the hand-off `.env` file.
    #[must_use]
    pub fn with_handoff(mut self, path: impl Into<PathBuf>) -> Self {
        self.handoff_path = path.into();
        self
    }
}

/// What happened to the auxiliary exporter document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuxiliaryStatus {
    /// Patched and rewritten.
    Patched,
    /// Hand-authored, left unchanged.
    Bypassed,
}

/// Summary of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Receivers written to the collector document.
    pub receivers: usize,
    /// Instance entries that were dropped during resolution.
    pub dropped_instances: usize,
    /// Auxiliary exporter result, when the profile has one.
    pub auxiliary: Option<AuxiliaryStatus>,
    /// Variables written to the hand-off file.
    pub handoff_vars: usize,
}

enum PendingAuxiliary {
    Patch(TargetFile, Document),
    Bypass(PathBuf, String),
}

/// Drives one run: read the configuration, resolve it, patch the target
/// documents and write them back.
///
/// Target documents are rewritten in place without locking, so two runs
/// against the same documents must not overlap.
#[derive(Debug)]
pub struct Runner {
    options: RunOptions,
    env: Environment,
}

impl Runner {
    /// Create a runner over an environment snapshot.
    pub fn new(options: RunOptions, env: Environment) -> Self {
        Self { options, env }
    }

    /// The run options.
    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// The environment snapshot.
    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Read and parse the configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RunError::Config`] if the file is missing or does
    /// not parse.
    pub fn load_config(&self) -> RunResult<Document> {
        let path = &self.options.config_path;
        if !path.exists() {
            return Err(ConfigError::file_not_found(path).into());
        }
        Ok(load(path).map_err(ConfigError::from)?)
    }

    /// Resolve a parsed configuration file for the run's profile.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RunError::Config`] on the first fatal field error.
    pub fn resolve(&self, input: &Document) -> RunResult<ResolvedConfig> {
        info!(
            path = %self.options.config_path.display(),
            profile = %self.options.profile,
            "Resolving configuration"
        );
        let config = ConfigResolver::new(self.options.profile).resolve_document(input, &self.env)?;
        Ok(config)
    }

    /// Load, resolve and apply with OS-assigned exporter ports.
    ///
    /// # Errors
    ///
    /// Returns the first error of any stage. Resolution errors leave every
    /// document untouched.
    pub fn run(&self) -> RunResult<RunReport> {
        let input = self.load_config()?;
        let config = self.resolve(&input)?;
        self.apply(&config)
    }

    /// Patch and rewrite the target documents with OS-assigned ports.
    ///
    /// # Errors
    ///
    /// See [`Runner::apply_with_ports`].
    pub fn apply(&self, config: &ResolvedConfig) -> RunResult<RunReport> {
        self.apply_with_ports(config, EphemeralPorts)
    }

    /// Patch and rewrite the target documents.
    ///
    /// Every document is patched in memory before the first one is written,
    /// so a template or fragment error leaves all of them unchanged. A
    /// hand-authored auxiliary document is only read, never opened for
    /// writing.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RunError::Document`] if a target cannot be read,
    /// parsed or written, and [`crate::RunError::Patch`] if it does not have
    /// the expected shape.
    pub fn apply_with_ports<P: PortAllocator>(
        &self,
        config: &ResolvedConfig,
        ports: P,
    ) -> RunResult<RunReport> {
        let mut patcher = DocumentPatcher::with_ports(config, ports);

        let mut collector = TargetFile::open(&self.options.collector_path)?;
        let template = collector.read_document()?;
        let patched_collector = patcher.patch_collector(template)?;

        let auxiliary = match config.auxiliary() {
            None => None,
            Some(aux) if aux.custom_document => Some(self.bypass_auxiliary()?),
            Some(_) => {
                // Opened for writing only once the document is known to be patched.
                let template = load(&self.options.auxiliary_path)?;
                let fragments = load(&self.options.fragments_path)?;
                match patcher.patch_auxiliary(template, &fragments)? {
                    AuxiliaryOutcome::Patched(document) => {
                        let target = TargetFile::open(&self.options.auxiliary_path)?;
                        Some(PendingAuxiliary::Patch(target, document))
                    }
                    AuxiliaryOutcome::Bypassed => Some(self.bypass_auxiliary()?),
                }
            }
        };

        let handoff = config.handoff_vars();

        collector.rewrite(&patched_collector)?;
        log_document(collector.path(), &patched_collector, collector.format());
        info!(path = %collector.path().display(), "Collector document ready");

        let status = match auxiliary {
            None => None,
            Some(PendingAuxiliary::Patch(mut target, document)) => {
                target.rewrite(&document)?;
                log_document(target.path(), &document, target.format());
                info!(path = %target.path().display(), "Auxiliary exporter document ready");
                Some(AuxiliaryStatus::Patched)
            }
            Some(PendingAuxiliary::Bypass(path, content)) => {
                info!(
                    path = %path.display(),
                    content = %content,
                    "Using hand-authored auxiliary exporter document"
                );
                Some(AuxiliaryStatus::Bypassed)
            }
        };

        if !handoff.is_empty() {
            let path = &self.options.handoff_path;
            write_text(path, &render_dotenv(&handoff))?;
            let names: Vec<&str> = handoff.iter().map(|(name, _)| *name).collect();
            info!(path = %path.display(), vars = ?names, "Hand-off variables written");
        }

        Ok(RunReport {
            receivers: patcher.receivers_written(),
            dropped_instances: config.dropped_instances().len(),
            auxiliary: status,
            handoff_vars: handoff.len(),
        })
    }

    fn bypass_auxiliary(&self) -> RunResult<PendingAuxiliary> {
        let path = self.options.auxiliary_path.clone();
        let content = read_text(&path)?;
        Ok(PendingAuxiliary::Bypass(path, content))
    }
}

/// Patched documents carry credentials, so they are only logged at debug.
fn log_document(path: &Path, document: &Document, format: otelprep_core::Format) {
    if !tracing::enabled!(Level::DEBUG) {
        return;
    }
    match render(document, format) {
        Ok(content) => debug!(path = %path.display(), content = %content, "Patched document"),
        Err(e) => debug!(path = %path.display(), error = %e, "Patched document could not be rendered"),
    }
}
