//! Error taxonomy and the bridge from libgit2 failures.
//!
//! Every libgit2 call in this crate returns `Result<T, git2::Error>`, and the
//! error value already carries the native code, class and message. Bridging
//! therefore happens at the call site with [`NativeResultExt::bail_if`], which
//! attaches a context label and produces an inspectable [`SyncError::Native`].

// False positive warnings from thiserror macro expansion
#![allow(unused_assignments)]

use crate::negotiator::CredentialKind;
use crate::session::{ProgressSink, SessionEvent};
use git2::{ErrorClass, ErrorCode};
use gitsync_config::ConfigError;
use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;
use tracing::warn;

/// Errors raised by gitsync operations.
#[derive(Error, Debug, Diagnostic)]
pub enum SyncError {
    /// The remote URL could not be parsed.
    #[error("invalid remote url '{url}': {reason}")]
    #[diagnostic(code(gitsync::invalid_remote_url))]
    InvalidRemoteUrl {
        /// The offending URL.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// No remote was named and none could be inferred.
    #[error("no remote configured: the current branch tracks no remote and 'origin' does not exist")]
    #[diagnostic(
        code(gitsync::no_remote),
        help("add one with `git remote add origin <url>` or name the remote explicitly")
    )]
    NoRemoteConfigured,

    /// Every credential candidate was rejected or unavailable.
    #[error(
        "authentication failed for {host} after {attempts} attempt(s) (tried: {})",
        format_kinds(.tried)
    )]
    #[diagnostic(
        code(gitsync::auth_exhausted),
        help("load a key into ssh-agent, set GITSYNC_SSH_KEY, or configure a token for this host")
    )]
    AuthenticationExhausted {
        /// Host identifier.
        host: String,
        /// Number of credentials offered.
        attempts: u32,
        /// Credential kinds offered, in order.
        tried: Vec<CredentialKind>,
    },

    /// A libgit2 call failed.
    #[error("{context}: {message} ({class:?}/{code:?})")]
    #[diagnostic(code(gitsync::native))]
    Native {
        /// Categorised error code.
        code: ErrorCode,
        /// Error domain.
        class: ErrorClass,
        /// Raw libgit2 return value.
        raw_code: i32,
        /// libgit2 message.
        message: String,
        /// Operation or phase that failed.
        context: String,
    },

    /// The upstream ref is still missing after fetching.
    #[error("upstream '{upstream}' not found after fetch")]
    #[diagnostic(code(gitsync::upstream_missing))]
    UpstreamMissingAfterFetch {
        /// Upstream shorthand (e.g. `origin/main`).
        upstream: String,
    },

    /// Rebasing onto the upstream stopped on a conflict.
    #[error("rebase onto '{upstream}' stopped on conflicts in: {}", .paths.join(", "))]
    #[diagnostic(
        code(gitsync::rebase_conflict),
        help("the rebase was aborted; resolve the divergence manually or pull with a merge")
    )]
    RebaseConflict {
        /// Upstream being rebased onto.
        upstream: String,
        /// Conflicting paths.
        paths: Vec<String>,
    },

    /// The current branch has no upstream.
    #[error("branch '{branch}' has no upstream configured")]
    #[diagnostic(
        code(gitsync::no_upstream),
        help("push with set_upstream or configure branch.<name>.merge")
    )]
    NoUpstream {
        /// Branch name.
        branch: String,
    },

    /// Merging the upstream produced conflicts.
    #[error("merge conflicts in: {}", .paths.join(", "))]
    #[diagnostic(
        code(gitsync::merge_conflict),
        help("resolve the conflicts and commit the result")
    )]
    MergeConflict {
        /// Conflicting paths.
        paths: Vec<String>,
    },

    /// The remote refused a reference update.
    #[error("remote rejected {reference}: {reason}")]
    #[diagnostic(code(gitsync::push_rejected))]
    PushRejected {
        /// Reference name.
        reference: String,
        /// Reason reported by the remote.
        reason: String,
    },

    /// Invalid argument.
    #[error("{message}")]
    #[diagnostic(code(gitsync::invalid_argument))]
    InvalidArgument {
        /// Description.
        message: String,
    },

    /// IO error.
    #[error("io error at {path}: {message}")]
    #[diagnostic(code(gitsync::io))]
    Io {
        /// File path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Configuration error.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

fn format_kinds(kinds: &[CredentialKind]) -> String {
    if kinds.is_empty() {
        return "nothing".to_string();
    }
    kinds
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl SyncError {
    /// Bridge a libgit2 error, labelling it with the failing operation.
    #[must_use]
    pub fn native(err: &git2::Error, context: impl Into<String>) -> Self {
        Self::Native {
            code: err.code(),
            class: err.class(),
            raw_code: err.raw_code(),
            message: err.message().to_string(),
            context: context.into(),
        }
    }

    /// Create an invalid URL error.
    #[must_use]
    pub fn invalid_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRemoteUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid argument error.
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create an IO error.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, err: &std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// Native error code, if this error came from libgit2.
    #[must_use]
    pub const fn native_code(&self) -> Option<ErrorCode> {
        match self {
            Self::Native { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Native error class, if this error came from libgit2.
    #[must_use]
    pub const fn native_class(&self) -> Option<ErrorClass> {
        match self {
            Self::Native { class, .. } => Some(*class),
            _ => None,
        }
    }

    /// Context label of a native error.
    #[must_use]
    pub fn context(&self) -> Option<&str> {
        match self {
            Self::Native { context, .. } => Some(context),
            _ => None,
        }
    }

    /// Check if this is an authentication error.
    #[must_use]
    pub const fn is_auth_error(&self) -> bool {
        matches!(
            self,
            Self::AuthenticationExhausted { .. }
                | Self::Native {
                    code: ErrorCode::Auth | ErrorCode::Certificate,
                    ..
                }
        )
    }

    /// Check if this error came from the network layer.
    #[must_use]
    pub const fn is_network_error(&self) -> bool {
        matches!(
            self,
            Self::Native {
                class: ErrorClass::Net | ErrorClass::Http | ErrorClass::Ssh | ErrorClass::Ssl,
                code,
                ..
            } if !matches!(code, ErrorCode::Auth | ErrorCode::Certificate)
        )
    }

    /// Check if this is a "not found" error.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::Native {
                code: ErrorCode::NotFound,
                ..
            } | Self::UpstreamMissingAfterFetch { .. }
        )
    }

    /// Check if this error reports conflicting local state.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::MergeConflict { .. }
                | Self::RebaseConflict { .. }
                | Self::Native {
                    code: ErrorCode::Conflict | ErrorCode::MergeConflict,
                    ..
                }
        )
    }
}

/// Result type for gitsync operations.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Bridge `Result<T, git2::Error>` into [`SyncError`].
pub trait NativeResultExt<T> {
    /// Fail with a [`SyncError::Native`] labelled `context` if the call failed.
    fn bail_if(self, context: &str) -> Result<T>;
}

impl<T> NativeResultExt<T> for std::result::Result<T, git2::Error> {
    fn bail_if(self, context: &str) -> Result<T> {
        self.map_err(|e| SyncError::native(&e, context))
    }
}

/// Bridge lookups that may return nothing into [`SyncError`].
pub trait NativeOptionExt<T> {
    /// Fail with a not-found [`SyncError::Native`] labelled `context` on `None`.
    fn bail_if_null(self, context: &str) -> Result<T>;
}

impl<T> NativeOptionExt<T> for Option<T> {
    fn bail_if_null(self, context: &str) -> Result<T> {
        self.ok_or_else(|| {
            let err = git2::Error::new(
                ErrorCode::NotFound,
                ErrorClass::Invalid,
                format!("{context} returned nothing"),
            );
            SyncError::native(&err, context)
        })
    }
}

/// Report a recoverable libgit2 condition without aborting.
pub fn warn_native(err: &git2::Error, sink: &dyn ProgressSink) {
    warn!(class = ?err.class(), code = ?err.code(), "libgit2 warning: {}", err.message());
    sink.on_event(&SessionEvent::Warning {
        message: err.message().to_string(),
        class: err.class(),
    });
}
