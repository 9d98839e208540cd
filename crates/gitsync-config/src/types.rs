//! Configuration types.

use crate::auth::Credentials;
use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default private key file names, in order of preference.
pub const DEFAULT_KEY_NAMES: &[&str] = &["id_ed25519", "id_ecdsa", "id_rsa", "id_dsa"];

/// Default mirror exclusion: synthetic pull-request refs published by hosting providers.
pub const DEFAULT_MIRROR_EXCLUDE: &[&str] = &["refs/pull/*"];

/// SSH authentication settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SshConfig {
    /// Probe the ssh-agent for identities.
    pub use_agent: bool,
    /// Keep agent identities as fallbacks behind an explicit key.
    pub agent_fallback: bool,
    /// Key file names probed inside `ssh_dir`.
    pub key_names: Vec<String>,
    /// Directory holding default keys (defaults to `~/.ssh`).
    pub ssh_dir: Option<PathBuf>,
    /// Explicit private key.
    pub key: Option<PathBuf>,
    /// Passphrase for the explicit key.
    #[serde(skip)]
    pub passphrase: Option<String>,
    /// Username used when the remote URL carries none.
    pub default_username: String,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            use_agent: true,
            agent_fallback: true,
            key_names: DEFAULT_KEY_NAMES.iter().map(|s| (*s).to_string()).collect(),
            ssh_dir: None,
            key: None,
            passphrase: None,
            default_username: "git".to_string(),
        }
    }
}

/// Credential negotiation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NegotiationConfig {
    /// Upper bound on credential offers per session.
    pub max_attempts: u32,
    /// Allow the password callback to be consulted.
    pub interactive: bool,
}

impl Default for NegotiationConfig {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            interactive: true,
        }
    }
}

/// Mirror push settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// Glob patterns of refs left out of mirror pushes.
    pub exclude: Vec<String>,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            exclude: DEFAULT_MIRROR_EXCLUDE
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        }
    }
}

/// Fully resolved gitsync configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Report negotiation and transfer progress (`None` = auto).
    pub verbose: Option<bool>,
    /// SSH settings.
    pub ssh: SshConfig,
    /// Negotiation settings.
    pub negotiation: NegotiationConfig,
    /// Mirror settings.
    pub mirror: MirrorConfig,
    /// Per-host credentials.
    pub credentials: Credentials,
}

/// SSH section of a configuration file; every field optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SshFile {
    /// Probe the ssh-agent.
    pub use_agent: Option<bool>,
    /// Keep the agent behind an explicit key.
    pub agent_fallback: Option<bool>,
    /// Default key names.
    pub key_names: Option<Vec<String>>,
    /// Default key directory.
    pub ssh_dir: Option<PathBuf>,
    /// Explicit key.
    pub key: Option<PathBuf>,
    /// Default username.
    pub default_username: Option<String>,
}

/// Negotiation section of a configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct NegotiationFile {
    /// Attempt cap.
    pub max_attempts: Option<u32>,
    /// Interactive prompts allowed.
    pub interactive: Option<bool>,
}

/// Mirror section of a configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct MirrorFile {
    /// Exclusion patterns (replace the defaults when present).
    pub exclude: Option<Vec<String>>,
}

/// On-disk configuration file (`config.json`, `.gitsync.json`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ConfigFile {
    /// Verbose flag.
    pub verbose: Option<bool>,
    /// SSH section.
    pub ssh: SshFile,
    /// Negotiation section.
    pub negotiation: NegotiationFile,
    /// Mirror section.
    pub mirror: MirrorFile,
    /// Credential table.
    pub credentials: Credentials,
}

impl SyncConfig {
    /// Layer a configuration file on top of this configuration.
    pub fn apply_file(&mut self, file: &ConfigFile) {
        if file.verbose.is_some() {
            self.verbose = file.verbose;
        }
        if let Some(use_agent) = file.ssh.use_agent {
            self.ssh.use_agent = use_agent;
        }
        if let Some(fallback) = file.ssh.agent_fallback {
            self.ssh.agent_fallback = fallback;
        }
        if let Some(ref names) = file.ssh.key_names {
            self.ssh.key_names = names.clone();
        }
        if let Some(ref dir) = file.ssh.ssh_dir {
            self.ssh.ssh_dir = Some(dir.clone());
        }
        if let Some(ref key) = file.ssh.key {
            self.ssh.key = Some(key.clone());
        }
        if let Some(ref user) = file.ssh.default_username {
            self.ssh.default_username = user.clone();
        }
        if let Some(max) = file.negotiation.max_attempts {
            self.negotiation.max_attempts = max;
        }
        if let Some(interactive) = file.negotiation.interactive {
            self.negotiation.interactive = interactive;
        }
        if let Some(ref exclude) = file.mirror.exclude {
            self.mirror.exclude = exclude.clone();
        }
        self.credentials.merge(&file.credentials);
    }

    /// Validate the configuration, collecting every problem.
    ///
    /// # Errors
    /// Returns the single problem, or `ValidationFailed` listing all of them.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if self.negotiation.max_attempts == 0 {
            errors.push(ConfigError::invalid_value(
                "negotiation.max-attempts",
                "must be at least 1",
                "set max-attempts to a positive number",
            ));
        }
        if self.ssh.default_username.trim().is_empty() {
            errors.push(ConfigError::invalid_value(
                "ssh.default-username",
                "must not be empty",
                "ssh remotes usually use 'git'",
            ));
        }
        for pattern in &self.mirror.exclude {
            if let Err(e) = glob::Pattern::new(pattern) {
                errors.push(ConfigError::invalid_value(
                    "mirror.exclude",
                    format!("'{pattern}' is not a valid pattern: {e}"),
                    "use glob syntax such as 'refs/pull/*'",
                ));
            }
        }

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            count => Err(ConfigError::ValidationFailed {
                count,
                errors: errors.iter().map(ToString::to_string).collect(),
            }),
        }
    }

    /// Resolve the directory holding default SSH keys.
    #[must_use]
    pub fn ssh_dir(&self) -> Option<PathBuf> {
        self.ssh.ssh_dir.clone().or_else(|| {
            directories::BaseDirs::new().map(|dirs| dirs.home_dir().join(".ssh"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults() {
        let config = SyncConfig::default();
        assert!(config.ssh.use_agent);
        assert!(config.ssh.agent_fallback);
        assert_eq!(config.ssh.key_names[0], "id_ed25519");
        assert_eq!(config.negotiation.max_attempts, 8);
        assert_eq!(config.mirror.exclude, vec!["refs/pull/*".to_string()]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn file_layer_overrides_only_present_fields() {
        let file: ConfigFile = sonic_rs::from_str(
            r#"{ "ssh": { "use-agent": false }, "negotiation": { "max-attempts": 3 } }"#,
        )
        .unwrap();
        let mut config = SyncConfig::default();
        config.apply_file(&file);

        assert!(!config.ssh.use_agent);
        assert!(config.ssh.agent_fallback);
        assert_eq!(config.negotiation.max_attempts, 3);
        assert!(config.negotiation.interactive);
    }

    #[test]
    fn validate_collects_errors() {
        let mut config = SyncConfig::default();
        config.negotiation.max_attempts = 0;
        config.mirror.exclude = vec!["refs/[pull".to_string()];

        match config.validate() {
            Err(ConfigError::ValidationFailed { count, .. }) => assert_eq!(count, 2),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn validate_single_error() {
        let mut config = SyncConfig::default();
        config.ssh.default_username = "  ".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "ssh.default-username"
        ));
    }
}
