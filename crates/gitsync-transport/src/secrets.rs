//! Secrets and the injectable secret provider.

use gitsync_config::{Credentials, SyncConfig};
use std::fmt;
use std::path::PathBuf;
use zeroize::Zeroizing;

/// A passphrase, password or token. Zeroed on drop, never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(Zeroizing<String>);

impl Secret {
    /// Wrap a secret value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(Zeroizing::new(value.into()))
    }

    /// Expose the secret value.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

impl From<String> for Secret {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// What the negotiator needs a secret for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretRequest {
    /// Passphrase for an encrypted private key.
    Passphrase {
        /// Key file, if the key came from disk.
        key: Option<PathBuf>,
    },
    /// Password for username/password authentication.
    Password {
        /// Host identifier.
        host: String,
        /// Username the password belongs to.
        username: String,
    },
    /// Personal access token.
    Token {
        /// Host identifier.
        host: String,
    },
}

impl SecretRequest {
    /// Human-readable prompt.
    #[must_use]
    pub fn prompt(&self) -> String {
        match self {
            Self::Passphrase { key: Some(path) } => {
                format!("Enter passphrase for key '{}'", path.display())
            }
            Self::Passphrase { key: None } => "Enter passphrase for private key".to_string(),
            Self::Password { host, username } => format!("Password for '{username}@{host}'"),
            Self::Token { host } => format!("Personal access token for '{host}'"),
        }
    }
}

impl fmt::Display for SecretRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.prompt())
    }
}

/// Source of secrets. Returning `None` refuses the request.
pub trait SecretProvider {
    /// Provide a secret for `request`.
    fn ask(&self, request: &SecretRequest) -> Option<Secret>;

    /// Whether answering may block on a person. Non-interactive providers are
    /// consulted even when prompting is disabled.
    fn is_interactive(&self) -> bool {
        true
    }
}

impl<F> SecretProvider for F
where
    F: Fn(&SecretRequest) -> Option<Secret>,
{
    fn ask(&self, request: &SecretRequest) -> Option<Secret> {
        self(request)
    }
}

/// Provider that refuses every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSecrets;

impl SecretProvider for NoSecrets {
    fn ask(&self, _request: &SecretRequest) -> Option<Secret> {
        None
    }

    fn is_interactive(&self) -> bool {
        false
    }
}

/// Non-interactive provider backed by configuration and environment values.
#[derive(Debug, Clone, Default)]
pub struct ConfigSecrets {
    passphrase: Option<Secret>,
    credentials: Credentials,
}

impl ConfigSecrets {
    /// Collect the secrets held by a resolved configuration.
    #[must_use]
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            passphrase: config.ssh.passphrase.as_deref().map(Secret::new),
            credentials: config.credentials.clone(),
        }
    }
}

impl SecretProvider for ConfigSecrets {
    fn ask(&self, request: &SecretRequest) -> Option<Secret> {
        match request {
            SecretRequest::Passphrase { .. } => self.passphrase.clone(),
            SecretRequest::Password { host, username } => self
                .credentials
                .basic_for(host)
                .filter(|basic| &basic.username == username)
                .map(|basic| Secret::new(basic.password.as_str()))
                .or_else(|| self.credentials.password.as_deref().map(Secret::new)),
            SecretRequest::Token { host } => self
                .credentials
                .token_for(host)
                .map(|entry| Secret::new(entry.token.as_str())),
        }
    }

    fn is_interactive(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gitsync_config::{HttpBasicCredentials, TokenEntry};
    use pretty_assertions::assert_eq;

    #[test]
    fn debug_is_redacted() {
        let secret = Secret::new("hunter2");
        assert_eq!(format!("{secret:?}"), "Secret(<redacted>)");
        assert_eq!(secret.expose(), "hunter2");
    }

    #[test]
    fn closures_are_providers() {
        let provider = |req: &SecretRequest| match req {
            SecretRequest::Password { username, .. } if username == "alice" => {
                Some(Secret::from("pw"))
            }
            _ => None,
        };
        let request = SecretRequest::Password {
            host: "example.org".into(),
            username: "alice".into(),
        };
        assert_eq!(provider.ask(&request).unwrap().expose(), "pw");
        assert!(provider.ask(&SecretRequest::Passphrase { key: None }).is_none());
        assert!(NoSecrets.ask(&request).is_none());
    }

    #[test]
    fn prompts_name_the_target() {
        let req = SecretRequest::Passphrase {
            key: Some(PathBuf::from("/home/u/.ssh/id_ed25519")),
        };
        assert!(req.prompt().contains("id_ed25519"));
        let req = SecretRequest::Password {
            host: "github.com".into(),
            username: "octocat".into(),
        };
        assert_eq!(req.to_string(), "Password for 'octocat@github.com'");
    }

    #[test]
    fn config_secrets_answer_from_config() {
        let mut config = SyncConfig::default();
        config.ssh.passphrase = Some("pass".into());
        config.credentials.tokens.insert(
            "*".into(),
            TokenEntry {
                token: "any".into(),
                username: None,
            },
        );
        config.credentials.tokens.insert(
            "github.com".into(),
            TokenEntry {
                token: "gh".into(),
                username: None,
            },
        );
        let secrets = ConfigSecrets::from_config(&config);

        let token = |host: &str| {
            secrets
                .ask(&SecretRequest::Token { host: host.into() })
                .map(|s| s.expose().to_string())
        };
        assert_eq!(token("github.com").as_deref(), Some("gh"));
        assert_eq!(token("gitlab.com").as_deref(), Some("any"));
        assert_eq!(
            secrets
                .ask(&SecretRequest::Passphrase { key: None })
                .unwrap()
                .expose(),
            "pass"
        );
        assert!(
            secrets
                .ask(&SecretRequest::Password {
                    host: "x".into(),
                    username: "y".into()
                })
                .is_none()
        );
    }

    #[test]
    fn config_secrets_password_prefers_matching_basic_entry() {
        let mut config = SyncConfig::default();
        config.credentials.password = Some("fallback".into());
        config.credentials.http_basic.insert(
            "git.example.org".into(),
            HttpBasicCredentials {
                username: "ci".into(),
                password: "basic".into(),
            },
        );
        let secrets = ConfigSecrets::from_config(&config);
        let password = |user: &str| {
            secrets
                .ask(&SecretRequest::Password {
                    host: "git.example.org".into(),
                    username: user.into(),
                })
                .map(|s| s.expose().to_string())
        };
        assert_eq!(password("ci").as_deref(), Some("basic"));
        assert_eq!(password("someone").as_deref(), Some("fallback"));
    }
}
