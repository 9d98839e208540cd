//! Shared state for command execution.

use crate::output::TerminalSink;
use anyhow::{Context as _, Result};
use git2::Repository;
use gitsync_config::{CliOverrides, ConfigLoader, SyncConfig};
use gitsync_transport::{ConfigSecrets, SyncClient};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Arguments used to build a [`Context`].
#[derive(Debug, Clone, Default)]
pub struct ContextArgs {
    pub working_dir: Option<PathBuf>,
    pub verbosity: u8,
    pub quiet: bool,
    pub no_interaction: bool,
    pub ssh_key: Option<PathBuf>,
    pub no_agent: bool,
}

/// Resolved configuration plus the global flags every command needs.
#[derive(Debug)]
pub struct Context {
    pub working_dir: PathBuf,
    pub config: SyncConfig,
    pub quiet: bool,
    /// Report credential offers and transfer progress.
    pub verbose: bool,
}

impl Context {
    pub fn new(args: &ContextArgs) -> Result<Self> {
        let working_dir = match &args.working_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir().context("Failed to read the current directory")?,
        };

        let mut loader = ConfigLoader::new(&working_dir)?;
        let mut config = loader.resolve()?;
        CliOverrides {
            ssh_key: args.ssh_key.clone(),
            no_agent: args.no_agent,
            no_interaction: args.no_interaction,
            verbose: args.verbosity > 0,
            mirror_exclude: Vec::new(),
        }
        .apply_to(&mut config);
        config.validate()?;
        debug!(sources = ?loader.applied_sources(), "configuration resolved");

        let verbose = !args.quiet
            && config
                .verbose
                .unwrap_or_else(|| console::Term::stderr().is_term());

        Ok(Self {
            working_dir,
            config,
            quiet: args.quiet,
            verbose,
        })
    }

    /// Open the repository containing the working directory.
    pub fn open_repo(&self) -> Result<Repository> {
        Repository::discover(&self.working_dir).with_context(|| {
            format!(
                "Not a git repository (or any parent): {}",
                self.working_dir.display()
            )
        })
    }

    /// Resolve `path` against the working directory.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.working_dir.join(path)
        }
    }

    /// Progress sink honouring `--quiet`.
    pub fn sink(&self) -> TerminalSink {
        TerminalSink::new(self.quiet)
    }

    /// Client wired to the configured secrets and `sink`.
    pub fn client<'a>(&self, secrets: &'a ConfigSecrets, sink: &'a TerminalSink) -> SyncClient<'a> {
        SyncClient::new(self.config.clone())
            .with_secrets(secrets)
            .with_sink(sink)
            .verbose(self.verbose)
    }

    /// Secrets held by the configuration and environment.
    pub fn secrets(&self) -> ConfigSecrets {
        ConfigSecrets::from_config(&self.config)
    }
}
