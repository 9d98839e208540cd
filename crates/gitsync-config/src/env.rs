//! Environment variable configuration support.

use crate::auth::TokenEntry;
use crate::error::{ConfigError, Result};
use crate::types::SyncConfig;
use std::path::PathBuf;

/// Environment variables understood by gitsync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncEnvVar {
    /// `GITSYNC_HOME` - global configuration directory.
    Home,
    /// `GITSYNC_CONFIG` - explicit configuration file.
    Config,
    /// `GITSYNC_TOKEN` - personal access token for every host.
    Token,
    /// `GITHUB_PAT` - personal access token, commonly set in CI.
    GithubPat,
    /// `GITSYNC_USERNAME` - username for password authentication.
    Username,
    /// `GITSYNC_PASSWORD` - password for password authentication.
    Password,
    /// `GITSYNC_SSH_KEY` - explicit private key path.
    SshKey,
    /// `GITSYNC_SSH_PASSPHRASE` - passphrase for the private key.
    SshPassphrase,
    /// `GITSYNC_NO_INTERACTION` - never prompt.
    NoInteraction,
    /// `GITSYNC_VERBOSE` - report negotiation and transfer progress.
    Verbose,
    /// `SSH_AUTH_SOCK` - ssh-agent socket.
    SshAuthSock,
}

impl SyncEnvVar {
    /// Get the environment variable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Home => "GITSYNC_HOME",
            Self::Config => "GITSYNC_CONFIG",
            Self::Token => "GITSYNC_TOKEN",
            Self::GithubPat => "GITHUB_PAT",
            Self::Username => "GITSYNC_USERNAME",
            Self::Password => "GITSYNC_PASSWORD",
            Self::SshKey => "GITSYNC_SSH_KEY",
            Self::SshPassphrase => "GITSYNC_SSH_PASSPHRASE",
            Self::NoInteraction => "GITSYNC_NO_INTERACTION",
            Self::Verbose => "GITSYNC_VERBOSE",
            Self::SshAuthSock => "SSH_AUTH_SOCK",
        }
    }

    /// Get the value from environment.
    #[must_use]
    pub fn get(self) -> Option<String> {
        std::env::var(self.as_str()).ok().filter(|v| !v.is_empty())
    }

    /// Check if the variable is set.
    #[must_use]
    pub fn is_set(self) -> bool {
        self.get().is_some()
    }
}

/// Parse a boolean flag (1/true/yes/on = true, 0/false/no/off = false).
#[must_use]
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Environment configuration snapshot.
#[derive(Default)]
pub struct EnvConfig {
    /// `GITSYNC_HOME` directory.
    pub home: Option<PathBuf>,
    /// Explicit configuration file.
    pub config: Option<PathBuf>,
    /// Token applied to every host.
    pub token: Option<String>,
    /// Username for password authentication.
    pub username: Option<String>,
    /// Password for password authentication.
    pub password: Option<String>,
    /// Explicit private key path.
    pub ssh_key: Option<PathBuf>,
    /// Passphrase for the private key.
    pub ssh_passphrase: Option<String>,
    /// Non-interactive mode.
    pub no_interaction: Option<bool>,
    /// Verbose mode.
    pub verbose: Option<bool>,
}

impl std::fmt::Debug for EnvConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("EnvConfig")
            .field("home", &self.home)
            .field("config", &self.config)
            .field("token", &redact(&self.token))
            .field("username", &self.username)
            .field("password", &redact(&self.password))
            .field("ssh_key", &self.ssh_key)
            .field("ssh_passphrase", &redact(&self.ssh_passphrase))
            .field("no_interaction", &self.no_interaction)
            .field("verbose", &self.verbose)
            .finish()
    }
}

impl EnvConfig {
    /// Read configuration from the process environment.
    ///
    /// # Errors
    /// Returns error if a boolean variable holds an unrecognised value.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|var| var.get())
    }

    /// Read configuration through an arbitrary lookup function.
    ///
    /// # Errors
    /// Returns error if a boolean variable holds an unrecognised value.
    pub fn from_lookup(lookup: impl Fn(SyncEnvVar) -> Option<String>) -> Result<Self> {
        let flag = |var: SyncEnvVar| -> Result<Option<bool>> {
            match lookup(var) {
                None => Ok(None),
                Some(raw) => parse_bool(&raw).map(Some).ok_or_else(|| ConfigError::EnvError {
                    var: var.as_str().to_string(),
                    message: format!("expected a boolean, got '{raw}'"),
                }),
            }
        };

        Ok(Self {
            home: lookup(SyncEnvVar::Home).map(PathBuf::from),
            config: lookup(SyncEnvVar::Config).map(PathBuf::from),
            token: lookup(SyncEnvVar::Token).or_else(|| lookup(SyncEnvVar::GithubPat)),
            username: lookup(SyncEnvVar::Username),
            password: lookup(SyncEnvVar::Password),
            ssh_key: lookup(SyncEnvVar::SshKey).map(PathBuf::from),
            ssh_passphrase: lookup(SyncEnvVar::SshPassphrase),
            no_interaction: flag(SyncEnvVar::NoInteraction)?,
            verbose: flag(SyncEnvVar::Verbose)?,
        })
    }

    /// Apply environment overrides to a configuration.
    ///
    /// A token from the environment applies to every host and is stored as a
    /// `*` wildcard entry, so explicit per-host tokens from files still win.
    pub fn apply_to(&self, config: &mut SyncConfig) {
        if let Some(ref token) = self.token {
            config.credentials.tokens.insert(
                "*".to_string(),
                TokenEntry {
                    token: token.clone(),
                    username: self.username.clone(),
                },
            );
        }
        if self.username.is_some() {
            config.credentials.username = self.username.clone();
        }
        if self.password.is_some() {
            config.credentials.password = self.password.clone();
        }
        if let Some(ref key) = self.ssh_key {
            config.ssh.key = Some(key.clone());
        }
        if self.ssh_passphrase.is_some() {
            config.ssh.passphrase = self.ssh_passphrase.clone();
        }
        if let Some(no_interaction) = self.no_interaction {
            config.negotiation.interactive = !no_interaction;
        }
        if let Some(verbose) = self.verbose {
            config.verbose = Some(verbose);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(SyncEnvVar, &str)]) -> impl Fn(SyncEnvVar) -> Option<String> {
        let map: HashMap<SyncEnvVar, String> = pairs
            .iter()
            .map(|(k, v)| (*k, (*v).to_string()))
            .collect();
        move |var| map.get(&var).cloned()
    }

    #[test]
    fn env_var_names() {
        assert_eq!(SyncEnvVar::Home.as_str(), "GITSYNC_HOME");
        assert_eq!(SyncEnvVar::GithubPat.as_str(), "GITHUB_PAT");
        assert_eq!(SyncEnvVar::SshAuthSock.as_str(), "SSH_AUTH_SOCK");
    }

    #[test]
    fn parse_bool_variants() {
        assert_eq!(parse_bool("Yes"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn github_pat_used_when_token_unset() {
        let env = EnvConfig::from_lookup(lookup_from(&[(SyncEnvVar::GithubPat, "ghp_x")])).unwrap();
        assert_eq!(env.token.as_deref(), Some("ghp_x"));
    }

    #[test]
    fn invalid_flag_is_rejected() {
        let err = EnvConfig::from_lookup(lookup_from(&[(SyncEnvVar::NoInteraction, "sometimes")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::EnvError { ref var, .. } if var == "GITSYNC_NO_INTERACTION"));
    }

    #[test]
    fn apply_overrides() {
        let env = EnvConfig::from_lookup(lookup_from(&[
            (SyncEnvVar::Token, "tok"),
            (SyncEnvVar::NoInteraction, "1"),
            (SyncEnvVar::SshKey, "/keys/id_test"),
        ]))
        .unwrap();
        let mut config = SyncConfig::default();
        env.apply_to(&mut config);

        assert!(!config.negotiation.interactive);
        assert_eq!(config.ssh.key, Some(PathBuf::from("/keys/id_test")));
        assert_eq!(
            config.credentials.token_for("example.org").map(|t| t.token.as_str()),
            Some("tok")
        );
    }

    #[test]
    fn debug_redacts_secrets() {
        let env = EnvConfig::from_lookup(lookup_from(&[(SyncEnvVar::Password, "hunter2")])).unwrap();
        let rendered = format!("{env:?}");
        assert!(!rendered.contains("hunter2"));
    }
}
