//! Per-host credential table.
//!
//! Entries are keyed by host identifier (`github.com`, `git.example.org:8443`)
//! or by a `*` wildcard pattern (`*.example.org`, `*`). An exact host key
//! always wins; among wildcards the longest suffix wins.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// HTTP Basic credentials.
#[derive(Clone, Serialize, Deserialize)]
pub struct HttpBasicCredentials {
    /// Username.
    pub username: String,
    /// Password.
    pub password: String,
}

impl std::fmt::Debug for HttpBasicCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBasicCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Personal access token entry.
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenEntry {
    /// Token value.
    pub token: String,
    /// Username to pair with the token (hosts differ on what they expect).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl std::fmt::Debug for TokenEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenEntry")
            .field("token", &"<redacted>")
            .field("username", &self.username)
            .finish()
    }
}

/// Credential configuration.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Credentials {
    /// HTTP Basic credentials by host.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub http_basic: BTreeMap<String, HttpBasicCredentials>,

    /// Tokens by host.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub tokens: BTreeMap<String, TokenEntry>,

    /// Fallback username for password prompts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Fallback password handed to the password callback.
    #[serde(skip)]
    pub password: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("http_basic", &self.http_basic)
            .field("tokens", &self.tokens)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Credentials {
    /// Find the token configured for a host.
    #[must_use]
    pub fn token_for(&self, host: &str) -> Option<&TokenEntry> {
        lookup(&self.tokens, host)
    }

    /// Find the HTTP Basic credentials configured for a host.
    #[must_use]
    pub fn basic_for(&self, host: &str) -> Option<&HttpBasicCredentials> {
        lookup(&self.http_basic, host)
    }

    /// Merge another credential table into this one (other wins).
    pub fn merge(&mut self, other: &Self) {
        for (host, entry) in &other.http_basic {
            self.http_basic.insert(host.clone(), entry.clone());
        }
        for (host, entry) in &other.tokens {
            self.tokens.insert(host.clone(), entry.clone());
        }
        if other.username.is_some() {
            self.username = other.username.clone();
        }
        if other.password.is_some() {
            self.password = other.password.clone();
        }
    }
}

fn lookup<'a, T>(entries: &'a BTreeMap<String, T>, host: &str) -> Option<&'a T> {
    let host = host.to_ascii_lowercase();
    if let Some(entry) = entries.get(&host) {
        return Some(entry);
    }

    entries
        .iter()
        .filter_map(|(pattern, entry)| {
            let suffix = pattern.strip_prefix('*')?;
            host.ends_with(&suffix.to_ascii_lowercase())
                .then_some((suffix.len(), entry))
        })
        .max_by_key(|(len, _)| *len)
        .map(|(_, entry)| entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn token(value: &str) -> TokenEntry {
        TokenEntry {
            token: value.to_string(),
            username: None,
        }
    }

    fn table() -> Credentials {
        let mut creds = Credentials::default();
        creds.tokens.insert("github.com".into(), token("exact"));
        creds.tokens.insert("*.corp.example".into(), token("corp"));
        creds.tokens.insert("*".into(), token("any"));
        creds
    }

    #[rstest]
    #[case("github.com", "exact")]
    #[case("GitHub.com", "exact")]
    #[case("git.corp.example", "corp")]
    #[case("gitlab.com", "any")]
    fn token_lookup_precedence(#[case] host: &str, #[case] expected: &str) {
        let creds = table();
        assert_eq!(creds.token_for(host).unwrap().token, expected);
    }

    #[test]
    fn missing_basic_entry() {
        assert!(table().basic_for("github.com").is_none());
    }

    #[test]
    fn merge_overrides() {
        let mut base = table();
        let mut other = Credentials::default();
        other.tokens.insert("github.com".into(), token("override"));
        other.username = Some("octocat".into());
        base.merge(&other);

        assert_eq!(base.token_for("github.com").unwrap().token, "override");
        assert_eq!(base.username.as_deref(), Some("octocat"));
    }

    #[test]
    fn parses_kebab_case_json() {
        let json = r#"{
            "http-basic": { "git.example.org": { "username": "u", "password": "p" } },
            "tokens": { "github.com": { "token": "t", "username": "x-access-token" } }
        }"#;
        let creds: Credentials = sonic_rs::from_str(json).unwrap();
        assert_eq!(creds.basic_for("git.example.org").unwrap().username, "u");
        assert_eq!(
            creds.token_for("github.com").unwrap().username.as_deref(),
            Some("x-access-token")
        );
    }

    #[test]
    fn debug_never_prints_secrets() {
        let rendered = format!("{:?}", table());
        assert!(!rendered.contains("exact"));
    }
}
