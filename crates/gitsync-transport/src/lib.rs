//! Authenticated fetch, push, clone and ls-remote on top of libgit2.
//!
//! Every network operation runs in a [`TransportSession`] whose
//! [`CredentialNegotiator`] answers the remote's authentication challenges:
//!
//! - **SSH**: an explicit key, then ssh-agent identities, then the default
//!   `~/.ssh/id_*` key pair
//! - **HTTPS**: a configured or requested token, then a username and password
//!
//! A rejected credential kind is never offered twice in one session, so a
//! session ends after at most one offer per kind the remote advertises. The
//! kind that wins for a host is remembered for the rest of the process and
//! tried first next time.
//!
//! # Quick Start
//!
//! ```no_run
//! use gitsync_config::ConfigLoader;
//! use gitsync_transport::{ConfigSecrets, SyncClient};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigLoader::new(".")?.resolve()?;
//! let secrets = ConfigSecrets::from_config(&config);
//! let client = SyncClient::new(config).with_secrets(&secrets);
//!
//! let repo = git2::Repository::open(".")?;
//! let outcome = client.fetch(&repo, None, &[], false)?;
//! println!("received {} objects", outcome.summary.received_objects);
//! # Ok(())
//! # }
//! ```
//!
//! # Module Structure
//!
//! - [`error`]: Error taxonomy and the libgit2 error bridge
//! - [`host`]: Remote URL parsing and host identity
//! - [`secrets`]: Secret values and providers
//! - [`keys`]: SSH identity discovery
//! - [`negotiator`]: Credential negotiation state machine
//! - [`session`]: Transport sessions and progress events
//! - [`metadata`]: Branch and remote lookups
//! - [`refspec`]: Refspec construction
//! - [`client`]: High-level operations

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod error;
pub mod host;
pub mod keys;
pub mod metadata;
pub mod negotiator;
pub mod refspec;
pub mod secrets;
pub mod session;

pub use client::{
    CloneRequest, DEFAULT_REMOTE, PullOutcome, PushRequest, SyncClient, default_clone_dir,
    resolve_remote_name,
};
pub use error::{NativeOptionExt, NativeResultExt, Result, SyncError, warn_native};
pub use host::{HostId, RemoteDescriptor, ResolvedHost, Scheme, parse_remote_url, resolve_host};
pub use keys::{
    AgentIdentity, AgentProbe, DefaultKeyProbe, ExplicitKey, KeyLocator, KeyProbe,
    SshAgentProbe, SshIdentity,
};
pub use metadata::{BranchInfo, RepoMetadata};
pub use negotiator::{
    Credential, CredentialKind, CredentialNegotiator, HostHints, KindSet, NegotiationState,
    NegotiatorOptions,
};
pub use refspec::{MirrorFilter, force_refspec, pull_request_refspec};
pub use secrets::{ConfigSecrets, NoSecrets, Secret, SecretProvider, SecretRequest};
pub use session::{
    NullSink, Operation, Phase, ProgressSink, RefUpdate, RemoteRef, SessionEvent,
    TracingSink, TransferSummary, TransportOutcome, TransportSession,
};
