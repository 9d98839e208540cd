//! Configuration loader with hierarchical merging.

use crate::env::EnvConfig;
use crate::error::{ConfigError, Result};
use crate::types::{ConfigFile, SyncConfig};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Project-local configuration file name.
pub const PROJECT_CONFIG_FILE: &str = ".gitsync.json";

/// Global configuration file name.
pub const GLOBAL_CONFIG_FILE: &str = "config.json";

/// Configuration source in hierarchy order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigSource {
    /// Built-in defaults.
    Defaults = 0,
    /// User global configuration.
    Global = 1,
    /// Project-local configuration.
    Project = 2,
    /// Environment variables.
    Environment = 3,
    /// CLI arguments.
    Cli = 4,
}

impl ConfigSource {
    /// Get description for display.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Defaults => "built-in defaults",
            Self::Global => "global configuration",
            Self::Project => "project configuration",
            Self::Environment => "environment variables",
            Self::Cli => "command-line arguments",
        }
    }
}

/// Configuration loader.
#[derive(Debug)]
pub struct ConfigLoader {
    /// Project (repository work tree) directory.
    project_dir: PathBuf,
    /// Environment snapshot.
    env_config: EnvConfig,
    /// Sources that contributed to the last resolution.
    applied: Vec<ConfigSource>,
}

impl ConfigLoader {
    /// Create a loader reading the process environment.
    ///
    /// # Errors
    /// Returns error if an environment variable is malformed.
    pub fn new(project_dir: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self::with_env(project_dir, EnvConfig::from_env()?))
    }

    /// Create a loader with an explicit environment snapshot.
    #[must_use]
    pub fn with_env(project_dir: impl Into<PathBuf>, env_config: EnvConfig) -> Self {
        Self {
            project_dir: project_dir.into(),
            env_config,
            applied: Vec::new(),
        }
    }

    /// Directory holding the global configuration.
    #[must_use]
    pub fn global_dir(&self) -> Option<PathBuf> {
        self.env_config.home.clone().or_else(|| {
            directories::ProjectDirs::from("", "", "gitsync")
                .map(|dirs| dirs.config_dir().to_path_buf())
        })
    }

    /// Path of the global configuration file.
    #[must_use]
    pub fn global_config_path(&self) -> Option<PathBuf> {
        self.global_dir().map(|dir| dir.join(GLOBAL_CONFIG_FILE))
    }

    /// Path of the project configuration file.
    #[must_use]
    pub fn project_config_path(&self) -> PathBuf {
        self.env_config
            .config
            .clone()
            .unwrap_or_else(|| self.project_dir.join(PROJECT_CONFIG_FILE))
    }

    /// Load a configuration file.
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed.
    pub fn load_file(path: &Path) -> Result<ConfigFile> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        sonic_rs::from_str(&content).map_err(|e| ConfigError::json(path, &e))
    }

    /// Load an optional file: a missing file is skipped, a broken one is an error.
    fn load_optional(path: &Path) -> Result<Option<ConfigFile>> {
        match Self::load_file(path) {
            Ok(file) => Ok(Some(file)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Build the resolved configuration by merging all sources.
    ///
    /// # Errors
    /// Returns error if a present file is invalid or validation fails.
    pub fn resolve(&mut self) -> Result<SyncConfig> {
        let mut config = SyncConfig::default();
        self.applied = vec![ConfigSource::Defaults];

        // Layer 1: Global config
        if let Some(path) = self.global_config_path()
            && let Some(global) = Self::load_optional(&path)?
        {
            debug!(path = %path.display(), "applying global configuration");
            config.apply_file(&global);
            self.applied.push(ConfigSource::Global);
        }

        // Layer 2: Project config
        let project_path = self.project_config_path();
        if let Some(project) = Self::load_optional(&project_path)? {
            debug!(path = %project_path.display(), "applying project configuration");
            config.apply_file(&project);
            self.applied.push(ConfigSource::Project);
        }

        // Layer 3: Environment variables
        self.env_config.apply_to(&mut config);
        self.applied.push(ConfigSource::Environment);

        config.validate()?;
        Ok(config)
    }

    /// Sources applied during the last [`resolve`](Self::resolve).
    #[must_use]
    pub fn applied_sources(&self) -> &[ConfigSource] {
        &self.applied
    }

    /// Get environment configuration.
    #[must_use]
    pub const fn env(&self) -> &EnvConfig {
        &self.env_config
    }

    /// Get project directory.
    #[must_use]
    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }
}

/// CLI configuration overrides.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    /// Explicit private key.
    pub ssh_key: Option<PathBuf>,
    /// Disable the ssh-agent.
    pub no_agent: bool,
    /// Non-interactive mode.
    pub no_interaction: bool,
    /// Verbose output.
    pub verbose: bool,
    /// Extra mirror exclusion patterns.
    pub mirror_exclude: Vec<String>,
}

impl CliOverrides {
    /// Apply CLI overrides to a resolved configuration.
    pub fn apply_to(&self, config: &mut SyncConfig) {
        if let Some(ref key) = self.ssh_key {
            config.ssh.key = Some(key.clone());
        }
        if self.no_agent {
            config.ssh.use_agent = false;
        }
        if self.no_interaction {
            config.negotiation.interactive = false;
        }
        if self.verbose {
            config.verbose = Some(true);
        }
        config
            .mirror
            .exclude
            .extend(self.mirror_exclude.iter().cloned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn loader_for(project: &Path, home: &Path) -> ConfigLoader {
        let env = EnvConfig {
            home: Some(home.to_path_buf()),
            ..EnvConfig::default()
        };
        ConfigLoader::with_env(project, env)
    }

    #[test]
    fn config_loader_paths() {
        let loader = loader_for(Path::new("/tmp/project"), Path::new("/tmp/home"));
        assert_eq!(
            loader.project_config_path(),
            PathBuf::from("/tmp/project/.gitsync.json")
        );
        assert_eq!(
            loader.global_config_path(),
            Some(PathBuf::from("/tmp/home/config.json"))
        );
    }

    #[test]
    fn missing_files_yield_defaults() {
        let project = TempDir::new().unwrap();
        let home = TempDir::new().unwrap();
        let mut loader = loader_for(project.path(), home.path());

        let config = loader.resolve().unwrap();
        assert_eq!(config.negotiation.max_attempts, 8);
        assert_eq!(
            loader.applied_sources(),
            &[ConfigSource::Defaults, ConfigSource::Environment]
        );
    }

    #[test]
    fn project_overrides_global() {
        let project = TempDir::new().unwrap();
        let home = TempDir::new().unwrap();
        std::fs::write(
            home.path().join("config.json"),
            r#"{ "negotiation": { "max-attempts": 4, "interactive": false } }"#,
        )
        .unwrap();
        std::fs::write(
            project.path().join(".gitsync.json"),
            r#"{ "negotiation": { "max-attempts": 2 } }"#,
        )
        .unwrap();

        let mut loader = loader_for(project.path(), home.path());
        let config = loader.resolve().unwrap();

        assert_eq!(config.negotiation.max_attempts, 2);
        assert!(!config.negotiation.interactive);
        assert!(loader.applied_sources().contains(&ConfigSource::Global));
        assert!(loader.applied_sources().contains(&ConfigSource::Project));
    }

    #[test]
    fn broken_file_is_reported() {
        let project = TempDir::new().unwrap();
        let home = TempDir::new().unwrap();
        std::fs::write(project.path().join(".gitsync.json"), "{ not json").unwrap();

        let err = loader_for(project.path(), home.path()).resolve().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidJson { .. }));
    }

    #[test]
    fn cli_overrides_apply() {
        let mut config = SyncConfig::default();
        let overrides = CliOverrides {
            no_agent: true,
            no_interaction: true,
            mirror_exclude: vec!["refs/keep-around/*".into()],
            ..Default::default()
        };
        overrides.apply_to(&mut config);

        assert!(!config.ssh.use_agent);
        assert!(!config.negotiation.interactive);
        assert_eq!(config.mirror.exclude.len(), 2);
    }

    #[test]
    fn source_ordering() {
        assert!(ConfigSource::Defaults < ConfigSource::Project);
        assert_eq!(ConfigSource::Cli.description(), "command-line arguments");
    }
}
