//! Transport sessions.
//!
//! A [`TransportSession`] runs one fetch, push, clone or ls-remote against a
//! remote. It installs the libgit2 callbacks that route credential challenges
//! to its [`CredentialNegotiator`], tracks which phase the transfer is in so
//! failures can be labelled, and forwards progress to a [`ProgressSink`].

use crate::error::{Result, SyncError, warn_native};
use crate::negotiator::{CredentialKind, CredentialNegotiator, KindSet};
use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{
    AutotagOption, CheckoutNotificationType, Cred, CredentialType, Direction, ErrorClass,
    ErrorCode, FetchOptions, FetchPrune, Oid, PushOptions, Remote, RemoteCallbacks, Repository,
};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace};

/// Receives session events.
pub trait ProgressSink {
    /// Handle one event.
    fn on_event(&self, event: &SessionEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(&SessionEvent),
{
    fn on_event(&self, event: &SessionEvent) {
        self(event);
    }
}

/// Sink that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn on_event(&self, _event: &SessionEvent) {}
}

/// Sink that logs every event through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn on_event(&self, event: &SessionEvent) {
        info!(target: "gitsync", "{event}");
    }
}

/// Something worth telling the user about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Informational notice.
    Notice(String),
    /// Recoverable libgit2 condition.
    Warning {
        /// libgit2 message.
        message: String,
        /// Error domain.
        class: ErrorClass,
    },
    /// A credential is being offered.
    Offer {
        /// Host identifier.
        host: String,
        /// Credential kind.
        kind: CredentialKind,
        /// What is offered (key path, agent identities, username).
        detail: String,
        /// 1-based attempt number.
        attempt: u32,
    },
    /// The remote rejected a credential.
    Reject {
        /// Host identifier.
        host: String,
        /// Credential kind.
        kind: CredentialKind,
    },
    /// The remote accepted a credential.
    Accepted {
        /// Host identifier.
        host: String,
        /// Credential kind.
        kind: CredentialKind,
    },
    /// Every candidate was tried.
    Exhausted {
        /// Host identifier.
        host: String,
        /// Offers made.
        attempts: u32,
    },
    /// Fetch transfer progress.
    Transfer {
        /// Objects received so far.
        received_objects: usize,
        /// Objects expected.
        total_objects: usize,
        /// Bytes received so far.
        received_bytes: usize,
    },
    /// Message relayed from the remote.
    Sideband(String),
    /// A local reference moved during fetch.
    RefUpdated {
        /// Reference name.
        name: String,
        /// Previous target (zero when created).
        old: Oid,
        /// New target.
        new: Oid,
    },
    /// Push transfer progress.
    PushTransfer {
        /// Objects written so far.
        current: usize,
        /// Objects to write.
        total: usize,
        /// Bytes written so far.
        bytes: usize,
    },
}

impl fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Notice(message) => f.write_str(message),
            Self::Warning { message, .. } => write!(f, "warning: {message}"),
            Self::Offer {
                host,
                kind,
                detail,
                attempt,
            } => write!(f, "[{host}] trying {kind}: {detail} (attempt {attempt})"),
            Self::Reject { host, kind } => write!(f, "[{host}] {kind} rejected"),
            Self::Accepted { host, kind } => write!(f, "[{host}] authenticated with {kind}"),
            Self::Exhausted { host, attempts } => {
                write!(f, "[{host}] no credentials left after {attempts} attempt(s)")
            }
            Self::Transfer {
                received_objects,
                total_objects,
                received_bytes,
            } => write!(
                f,
                "received {received_objects}/{total_objects} objects ({received_bytes} bytes)"
            ),
            Self::Sideband(message) => write!(f, "remote: {message}"),
            Self::RefUpdated { name, old, new } if old.is_zero() => {
                write!(f, "* [new] {} {name}", short(*new))
            }
            Self::RefUpdated { name, old, new } => {
                write!(f, "{}..{} {name}", short(*old), short(*new))
            }
            Self::PushTransfer {
                current,
                total,
                bytes,
            } => write!(f, "pushed {current}/{total} objects ({bytes} bytes)"),
        }
    }
}

fn short(oid: Oid) -> String {
    let mut hex = oid.to_string();
    hex.truncate(7);
    hex
}

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Opening the connection.
    Connect,
    /// Answering authentication challenges.
    Negotiate,
    /// Moving objects and refs.
    Transfer,
}

impl Phase {
    /// Phase label used in error contexts.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Negotiate => "negotiate",
            Self::Transfer => "transfer",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reference update observed during a transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefUpdate {
    /// Reference name.
    pub name: String,
    /// Previous target (zero when created).
    pub old: Oid,
    /// New target.
    pub new: Oid,
}

/// Transfer statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferSummary {
    /// Objects received.
    pub received_objects: usize,
    /// Objects the remote sent or advertised.
    pub total_objects: usize,
    /// Objects taken from the local object database.
    pub local_objects: usize,
    /// Bytes received.
    pub received_bytes: usize,
    /// References moved by fetch.
    pub updated_refs: Vec<RefUpdate>,
    /// References the remote accepted on push.
    pub pushed_refs: Vec<String>,
}

/// A reference advertised by a remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRef {
    /// Reference name.
    pub name: String,
    /// Target object.
    pub oid: Oid,
}

/// Result of a transport operation.
#[derive(Debug, Clone, Default)]
pub struct TransportOutcome {
    /// Transfer statistics.
    pub summary: TransferSummary,
    /// Advertised references (ls-remote only).
    pub refs: Vec<RemoteRef>,
    /// Repository the operation worked on or created.
    pub path: Option<PathBuf>,
}

/// A transport operation.
#[derive(Clone, Copy)]
pub enum Operation<'r> {
    /// Fetch from a configured remote. Empty `refspecs` uses the remote's own.
    Fetch {
        /// Repository.
        repo: &'r Repository,
        /// Remote name.
        remote: &'r str,
        /// Refspecs to fetch.
        refspecs: &'r [String],
        /// Remove remote-tracking refs that no longer exist upstream.
        prune: bool,
    },
    /// Push to a configured remote.
    Push {
        /// Repository.
        repo: &'r Repository,
        /// Remote name.
        remote: &'r str,
        /// Refspecs to push.
        refspecs: &'r [String],
    },
    /// Clone into a new directory.
    Clone {
        /// Remote URL.
        url: &'r str,
        /// Destination directory.
        path: &'r Path,
        /// Branch to check out instead of the remote HEAD.
        branch: Option<&'r str>,
        /// Create a bare repository.
        bare: bool,
        /// Mirror every remote ref (implies bare).
        mirror: bool,
    },
    /// List the references a remote advertises.
    LsRemote {
        /// Repository holding the remote, if any.
        repo: Option<&'r Repository>,
        /// Configured remote name or URL.
        remote: &'r str,
    },
}

impl Operation<'_> {
    /// Operation name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Fetch { .. } => "fetch",
            Self::Push { .. } => "push",
            Self::Clone { .. } => "clone",
            Self::LsRemote { .. } => "ls-remote",
        }
    }
}

impl fmt::Debug for Operation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetch {
                remote, refspecs, prune, ..
            } => f
                .debug_struct("Fetch")
                .field("remote", remote)
                .field("refspecs", refspecs)
                .field("prune", prune)
                .finish_non_exhaustive(),
            Self::Push {
                remote, refspecs, ..
            } => f
                .debug_struct("Push")
                .field("remote", remote)
                .field("refspecs", refspecs)
                .finish_non_exhaustive(),
            Self::Clone {
                url,
                path,
                branch,
                bare,
                mirror,
            } => f
                .debug_struct("Clone")
                .field("url", url)
                .field("path", path)
                .field("branch", branch)
                .field("bare", bare)
                .field("mirror", mirror)
                .finish(),
            Self::LsRemote { remote, .. } => f
                .debug_struct("LsRemote")
                .field("remote", remote)
                .finish_non_exhaustive(),
        }
    }
}

/// One network operation and its credential negotiation.
pub struct TransportSession<'a> {
    negotiator: RefCell<CredentialNegotiator<'a>>,
    sink: &'a dyn ProgressSink,
    verbose: bool,
    phase: Cell<Phase>,
    summary: RefCell<TransferSummary>,
    rejections: RefCell<Vec<(String, String)>>,
}

impl fmt::Debug for TransportSession<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportSession")
            .field("negotiator", &self.negotiator)
            .field("phase", &self.phase.get())
            .field("verbose", &self.verbose)
            .finish_non_exhaustive()
    }
}

impl<'a> TransportSession<'a> {
    /// Create a session driven by `negotiator`.
    #[must_use]
    pub fn new(negotiator: CredentialNegotiator<'a>, sink: &'a dyn ProgressSink, verbose: bool) -> Self {
        Self {
            negotiator: RefCell::new(negotiator),
            sink,
            verbose,
            phase: Cell::new(Phase::Connect),
            summary: RefCell::new(TransferSummary::default()),
            rejections: RefCell::new(Vec::new()),
        }
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase.get()
    }

    /// Kinds offered so far.
    pub fn tried(&self) -> Vec<CredentialKind> {
        self.negotiator.borrow().tried().to_vec()
    }

    /// Run `operation`.
    ///
    /// # Errors
    /// Returns `AuthenticationExhausted` when every credential was refused,
    /// `PushRejected` when the remote declined a reference update, and a
    /// native error labelled with the failing phase otherwise.
    pub fn run(&self, operation: Operation<'_>) -> Result<TransportOutcome> {
        self.phase.set(Phase::Connect);
        debug!(operation = operation.name(), "starting transport session");

        let name = operation.name();
        let mut outcome = match operation {
            Operation::Fetch {
                repo,
                remote,
                refspecs,
                prune,
            } => self.fetch(repo, remote, refspecs, prune),
            Operation::Push {
                repo,
                remote,
                refspecs,
            } => self.push(repo, remote, refspecs),
            Operation::Clone {
                url,
                path,
                branch,
                bare,
                mirror,
            } => self.clone(url, path, branch, bare, mirror),
            Operation::LsRemote { repo, remote } => self.ls_remote(repo, remote),
        }
        .map_err(|e| self.fail(name, &e))?;

        // Nothing challenged or nothing moved; either way the remote let us through.
        self.negotiator.borrow_mut().accept();

        if let Some((reference, reason)) = self.rejections.borrow().first() {
            return Err(SyncError::PushRejected {
                reference: reference.clone(),
                reason: reason.clone(),
            });
        }

        outcome.summary = self.summary.take();
        debug!(
            operation = name,
            received = outcome.summary.received_objects,
            updated = outcome.summary.updated_refs.len(),
            "transport session finished"
        );
        Ok(outcome)
    }

    fn fetch(
        &self,
        repo: &Repository,
        name: &str,
        refspecs: &[String],
        prune: bool,
    ) -> std::result::Result<TransportOutcome, git2::Error> {
        let mut remote = repo.find_remote(name)?;
        let mut options = FetchOptions::new();
        options
            .remote_callbacks(self.callbacks())
            .download_tags(AutotagOption::Auto)
            .prune(if prune { FetchPrune::On } else { FetchPrune::Unspecified });

        let specs: Vec<&str> = refspecs.iter().map(String::as_str).collect();
        remote.fetch(&specs, Some(&mut options), None)?;
        self.record_stats(&remote);

        Ok(TransportOutcome {
            path: Some(workdir_or_path(repo)),
            ..TransportOutcome::default()
        })
    }

    fn push(
        &self,
        repo: &Repository,
        name: &str,
        refspecs: &[String],
    ) -> std::result::Result<TransportOutcome, git2::Error> {
        let mut remote = repo.find_remote(name)?;
        let mut options = PushOptions::new();
        options.remote_callbacks(self.callbacks());

        let specs: Vec<&str> = refspecs.iter().map(String::as_str).collect();
        remote.push(&specs, Some(&mut options))?;

        Ok(TransportOutcome {
            path: Some(workdir_or_path(repo)),
            ..TransportOutcome::default()
        })
    }

    fn clone(
        &self,
        url: &str,
        path: &Path,
        branch: Option<&str>,
        bare: bool,
        mirror: bool,
    ) -> std::result::Result<TransportOutcome, git2::Error> {
        let mut fetch = FetchOptions::new();
        fetch.remote_callbacks(self.callbacks());

        let mut builder = RepoBuilder::new();
        builder.bare(bare || mirror).fetch_options(fetch);
        if let Some(branch) = branch {
            builder.branch(branch);
        }
        if mirror {
            builder.remote_create(|repo, name, url| repo.remote_with_fetch(name, url, "+refs/*:refs/*"));
        } else if !bare {
            builder.with_checkout(checkout_with_warnings(self.sink));
        }

        let repo = builder.clone(url, path)?;
        if mirror {
            repo.config()?.set_bool("remote.origin.mirror", true)?;
        }
        self.record_stats(&repo.find_remote("origin")?);

        Ok(TransportOutcome {
            path: Some(workdir_or_path(&repo)),
            ..TransportOutcome::default()
        })
    }

    fn ls_remote(
        &self,
        repo: Option<&Repository>,
        remote: &str,
    ) -> std::result::Result<TransportOutcome, git2::Error> {
        let mut remote = match repo {
            Some(repo) => match repo.find_remote(remote) {
                Ok(found) => found,
                Err(e) if matches!(e.code(), ErrorCode::NotFound | ErrorCode::InvalidSpec) => {
                    repo.remote_anonymous(remote)?
                }
                Err(e) => return Err(e),
            },
            None => Remote::create_detached(remote)?,
        };

        let connection = remote.connect_auth(Direction::Fetch, Some(self.callbacks()), None)?;
        self.proceed();
        let refs = connection
            .list()?
            .iter()
            .map(|head| RemoteRef {
                name: head.name().to_string(),
                oid: head.oid(),
            })
            .collect();

        Ok(TransportOutcome {
            refs,
            path: repo.map(workdir_or_path),
            ..TransportOutcome::default()
        })
    }

    fn callbacks(&self) -> RemoteCallbacks<'_> {
        let mut callbacks = RemoteCallbacks::new();
        callbacks.credentials(move |url, username, allowed| self.on_credentials(url, username, allowed));
        callbacks.transfer_progress(move |stats| {
            self.proceed();
            if self.verbose {
                self.sink.on_event(&SessionEvent::Transfer {
                    received_objects: stats.received_objects(),
                    total_objects: stats.total_objects(),
                    received_bytes: stats.received_bytes(),
                });
            }
            true
        });
        callbacks.sideband_progress(move |data| {
            self.proceed();
            let text = String::from_utf8_lossy(data);
            let text = text.trim();
            if !text.is_empty() {
                trace!("remote: {text}");
                if self.verbose {
                    self.sink.on_event(&SessionEvent::Sideband(text.to_string()));
                }
            }
            true
        });
        callbacks.update_tips(move |name, old, new| {
            self.proceed();
            self.summary.borrow_mut().updated_refs.push(RefUpdate {
                name: name.to_string(),
                old,
                new,
            });
            if self.verbose {
                self.sink.on_event(&SessionEvent::RefUpdated {
                    name: name.to_string(),
                    old,
                    new,
                });
            }
            true
        });
        callbacks.push_transfer_progress(move |current, total, bytes| {
            self.proceed();
            if self.verbose {
                self.sink
                    .on_event(&SessionEvent::PushTransfer { current, total, bytes });
            }
        });
        callbacks.push_update_reference(move |reference, status| {
            self.proceed();
            match status {
                Some(reason) => {
                    debug!(reference, reason, "remote rejected update");
                    self.rejections
                        .borrow_mut()
                        .push((reference.to_string(), reason.to_string()));
                }
                None => self.summary.borrow_mut().pushed_refs.push(reference.to_string()),
            }
            Ok(())
        });
        callbacks
    }

    fn on_credentials(
        &self,
        url: &str,
        username_from_url: Option<&str>,
        allowed: CredentialType,
    ) -> std::result::Result<Cred, git2::Error> {
        self.phase.set(Phase::Negotiate);
        let mut negotiator = self.negotiator.borrow_mut();
        trace!(url, ?allowed, "credential challenge");

        // SSH asks for the username on its own before any key.
        if allowed == CredentialType::USERNAME {
            return Cred::username(&negotiator.ssh_username(username_from_url));
        }

        match negotiator.offer(KindSet::from_allowed(allowed)) {
            Some(credential) => credential.to_git2(),
            None => Err(git2::Error::new(
                ErrorCode::Auth,
                ErrorClass::Callback,
                format!("no credentials left to offer for {}", negotiator.host().id),
            )),
        }
    }

    /// The transport moved past authentication.
    fn proceed(&self) {
        if self.phase.get() != Phase::Transfer {
            self.phase.set(Phase::Transfer);
            self.negotiator.borrow_mut().accept();
        }
    }

    fn record_stats(&self, remote: &Remote<'_>) {
        let stats = remote.stats();
        let mut summary = self.summary.borrow_mut();
        summary.received_objects = stats.received_objects();
        summary.total_objects = stats.total_objects();
        summary.local_objects = stats.local_objects();
        summary.received_bytes = stats.received_bytes();
    }

    fn fail(&self, operation: &str, err: &git2::Error) -> SyncError {
        let phase = self.phase.get();
        // libgit2 reports refused credentials as GIT_EAUTH; anything else is not an auth verdict.
        let auth_failed = err.code() == ErrorCode::Auth;
        let mut negotiator = self.negotiator.borrow_mut();

        if negotiator.conclude_failure(auth_failed) {
            return SyncError::AuthenticationExhausted {
                host: negotiator.host().id.to_string(),
                attempts: negotiator.attempts(),
                tried: negotiator.tried().to_vec(),
            };
        }
        debug!(operation, %phase, code = ?err.code(), "transport failed: {}", err.message());
        SyncError::native(err, format!("{operation} ({phase})"))
    }
}

/// Safe checkout that reports files it refuses to overwrite.
#[must_use]
pub fn checkout_with_warnings(sink: &dyn ProgressSink) -> CheckoutBuilder<'_> {
    let mut checkout = CheckoutBuilder::new();
    checkout.safe();
    checkout.notify_on(CheckoutNotificationType::CONFLICT);
    checkout.notify(move |why, path, _baseline, _target, _workdir| {
        if why.contains(CheckoutNotificationType::CONFLICT) {
            let path = path.map(|p| p.display().to_string()).unwrap_or_default();
            let err = git2::Error::new(
                ErrorCode::Conflict,
                ErrorClass::Checkout,
                format!("Your local changes to the following file would be overwritten by checkout: {path}"),
            );
            warn_native(&err, sink);
        }
        true
    });
    checkout
}

fn workdir_or_path(repo: &Repository) -> PathBuf {
    repo.workdir().unwrap_or_else(|| repo.path()).to_path_buf()
}
