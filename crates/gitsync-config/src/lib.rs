//! Layered configuration for gitsync.
//!
//! Resolution order (later wins):
//!
//! 1. Built-in defaults
//! 2. Global `config.json` (`$GITSYNC_HOME` or the platform config directory)
//! 3. Project `.gitsync.json` (or `$GITSYNC_CONFIG`)
//! 4. Environment variables (`GITSYNC_*`, `GITHUB_PAT`)
//! 5. Command-line overrides
//!
//! ```no_run
//! use gitsync_config::ConfigLoader;
//!
//! # fn main() -> gitsync_config::Result<()> {
//! let mut loader = ConfigLoader::new(".")?;
//! let config = loader.resolve()?;
//! println!("max attempts: {}", config.negotiation.max_attempts);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod env;
pub mod error;
pub mod loader;
pub mod types;

pub use auth::{Credentials, HttpBasicCredentials, TokenEntry};
pub use env::{EnvConfig, SyncEnvVar, parse_bool};
pub use error::{ConfigError, Result};
pub use loader::{CliOverrides, ConfigLoader, ConfigSource};
pub use types::{
    ConfigFile, DEFAULT_KEY_NAMES, DEFAULT_MIRROR_EXCLUDE, MirrorConfig, NegotiationConfig,
    SshConfig, SyncConfig,
};
