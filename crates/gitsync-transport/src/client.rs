//! High-level remote operations.
//!
//! [`SyncClient`] holds the resolved configuration and the injected secret
//! provider, progress sink and key probes. Each operation resolves the remote
//! and host, then runs a fresh [`TransportSession`] so every network call gets
//! its own credential negotiation.

use crate::error::{NativeResultExt, Result, SyncError};
use crate::host::{RemoteDescriptor, ResolvedHost, parse_remote_url, resolve_host};
use crate::keys::{AgentProbe, DefaultKeyProbe, ExplicitKey, KeyLocator, KeyProbe, SshAgentProbe};
use crate::metadata::{RepoMetadata, has_upstream, set_upstream};
use crate::negotiator::{CredentialNegotiator, HostHints, NegotiatorOptions};
use crate::refspec::{
    MirrorFilter, force_refspec, local_refnames, parse_pull_request_upstream,
    pull_request_refspec,
};
use crate::secrets::{NoSecrets, Secret, SecretProvider};
use crate::session::{
    NullSink, Operation, ProgressSink, RemoteRef, SessionEvent, TransportOutcome,
    TransportSession, checkout_with_warnings,
};
use git2::{AnnotatedCommit, ErrorCode, Index, Oid, Rebase, RebaseOptions, Repository, Signature};
use gitsync_config::SyncConfig;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace, warn};

/// Remote used when the current branch tracks none.
pub const DEFAULT_REMOTE: &str = "origin";

/// Push parameters.
#[derive(Debug, Clone, Copy)]
pub struct PushRequest<'r> {
    /// Remote name; inferred from the current branch when `None`.
    pub remote: Option<&'r str>,
    /// Refspec; the current branch when `None`.
    pub refspec: Option<&'r str>,
    /// Force the update.
    pub force: bool,
    /// Push every local ref except the configured exclusions.
    pub mirror: bool,
    /// Configure the pushed branch as upstream after a successful push.
    /// A branch that already tracks something is left as it is.
    pub set_upstream: bool,
}

impl Default for PushRequest<'_> {
    fn default() -> Self {
        Self {
            remote: None,
            refspec: None,
            force: false,
            mirror: false,
            set_upstream: true,
        }
    }
}

/// Clone parameters.
#[derive(Debug, Clone, Default)]
pub struct CloneRequest {
    /// Branch to check out.
    pub branch: Option<String>,
    /// Create a bare repository.
    pub bare: bool,
    /// Mirror every remote ref.
    pub mirror: bool,
}

/// What a pull did to the current branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullOutcome {
    /// Nothing to integrate.
    UpToDate,
    /// The branch moved forward to the upstream commit.
    FastForward {
        /// Previous tip (`None` for an unborn branch).
        from: Option<Oid>,
        /// New tip.
        to: Oid,
    },
    /// A merge commit was created.
    Merged {
        /// The merge commit.
        commit: Oid,
    },
    /// Local commits were replayed onto the upstream.
    Rebased {
        /// New tip.
        head: Oid,
    },
}

impl fmt::Display for PullOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UpToDate => f.write_str("Already up to date."),
            Self::FastForward { from: Some(from), to } => write!(f, "Fast-forward {from}..{to}"),
            Self::FastForward { from: None, to } => write!(f, "Fast-forward to {to}"),
            Self::Merged { commit } => write!(f, "Merge made, new commit {commit}"),
            Self::Rebased { head } => write!(f, "Successfully rebased, head is now {head}"),
        }
    }
}

/// Entry point for fetch, push, clone, ls-remote and pull.
pub struct SyncClient<'a> {
    config: SyncConfig,
    secrets: &'a dyn SecretProvider,
    sink: &'a dyn ProgressSink,
    agent: Box<dyn AgentProbe + 'a>,
    keys: Box<dyn KeyProbe + 'a>,
    hints: &'a HostHints,
    explicit_key: Option<ExplicitKey>,
    verbose: bool,
}

impl fmt::Debug for SyncClient<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncClient")
            .field("config", &self.config)
            .field("explicit_key", &self.explicit_key)
            .field("verbose", &self.verbose)
            .finish_non_exhaustive()
    }
}

impl<'a> SyncClient<'a> {
    /// Create a client from a resolved configuration.
    ///
    /// Secrets are refused and progress is discarded until a provider and a
    /// sink are attached.
    #[must_use]
    pub fn new(config: SyncConfig) -> Self {
        let keys = DefaultKeyProbe::new(config.ssh_dir(), config.ssh.key_names.clone());
        let explicit_key = config.ssh.key.clone().map(|key| {
            ExplicitKey::from_path(key, config.ssh.passphrase.as_deref().map(Secret::new))
        });
        let verbose = config.verbose.unwrap_or(false);
        Self {
            config,
            secrets: &NoSecrets,
            sink: &NullSink,
            agent: Box::new(SshAgentProbe),
            keys: Box::new(keys),
            hints: HostHints::global(),
            explicit_key,
            verbose,
        }
    }

    /// Answer secret requests with `secrets`.
    #[must_use]
    pub fn with_secrets(mut self, secrets: &'a dyn SecretProvider) -> Self {
        self.secrets = secrets;
        self
    }

    /// Report progress and notices to `sink`.
    #[must_use]
    pub fn with_sink(mut self, sink: &'a dyn ProgressSink) -> Self {
        self.sink = sink;
        self
    }

    /// Replace the ssh-agent probe.
    #[must_use]
    pub fn with_agent(mut self, agent: impl AgentProbe + 'a) -> Self {
        self.agent = Box::new(agent);
        self
    }

    /// Replace the default key probe.
    #[must_use]
    pub fn with_key_probe(mut self, keys: impl KeyProbe + 'a) -> Self {
        self.keys = Box::new(keys);
        self
    }

    /// Offer `key` ahead of every other SSH identity.
    #[must_use]
    pub fn with_explicit_key(mut self, key: ExplicitKey) -> Self {
        self.explicit_key = Some(key);
        self
    }

    /// Use a private hint table instead of the process-wide one.
    #[must_use]
    pub fn with_hints(mut self, hints: &'a HostHints) -> Self {
        self.hints = hints;
        self
    }

    /// Report credential offers and transfer progress.
    #[must_use]
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// The configuration in use.
    #[must_use]
    pub const fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Fetch from `remote` (inferred when `None`). Empty `refspecs` uses the
    /// remote's configured refspecs.
    pub fn fetch(
        &self,
        repo: &Repository,
        remote: Option<&str>,
        refspecs: &[String],
        prune: bool,
    ) -> Result<TransportOutcome> {
        let remote = resolve_remote_name(repo, remote, self.sink)?;
        let host = resolve_host(RemoteDescriptor::Remote {
            repo,
            name: &remote,
        })?;
        info!(remote = %remote, host = %host.id, "fetching");
        self.session_for(host).run(Operation::Fetch {
            repo,
            remote: &remote,
            refspecs,
            prune,
        })
    }

    /// Fetch pull request heads into `refs/remotes/<remote>/pr/<n>`.
    ///
    /// `pr` defaults to every pull request, `remote` to `origin`.
    pub fn fetch_pull_requests(
        &self,
        repo: &Repository,
        pr: Option<&str>,
        remote: Option<&str>,
    ) -> Result<TransportOutcome> {
        let pr = pr.unwrap_or("*");
        if pr != "*" && (pr.is_empty() || !pr.bytes().all(|b| b.is_ascii_digit())) {
            return Err(SyncError::invalid_argument(format!(
                "pull request must be a number or '*', got '{pr}'"
            )));
        }
        let remote = remote.unwrap_or(DEFAULT_REMOTE);
        let refspecs = [pull_request_refspec(pr, remote)];
        self.fetch(repo, Some(remote), &refspecs, false)
    }

    /// Push to `request.remote` (inferred when `None`).
    pub fn push(&self, repo: &Repository, request: &PushRequest<'_>) -> Result<TransportOutcome> {
        let remote = resolve_remote_name(repo, request.remote, self.sink)?;
        let branch = repo.current_branch()?;

        let refspecs = if request.mirror {
            let filter = MirrorFilter::new(&self.config.mirror.exclude)?;
            let refnames = local_refnames(repo)?;
            let refspecs = filter.refspecs(refnames.iter().map(String::as_str));
            if refspecs.is_empty() {
                return Err(SyncError::invalid_argument("no references to mirror"));
            }
            refspecs
        } else {
            let refspec = match (request.refspec, branch.refname.as_deref()) {
                (Some(refspec), _) => refspec.to_string(),
                (None, Some(refname)) => refname.to_string(),
                (None, None) => {
                    return Err(SyncError::invalid_argument(
                        "HEAD is detached; name the refspec to push",
                    ));
                }
            };
            vec![if request.force {
                force_refspec(&refspec)
            } else {
                refspec
            }]
        };

        let had_upstream = match branch.refname.as_deref() {
            Some(refname) => has_upstream(repo, refname)?,
            None => true,
        };

        let host = resolve_host(RemoteDescriptor::Remote {
            repo,
            name: &remote,
        })?;
        info!(remote = %remote, host = %host.id, refspecs = ?refspecs, "pushing");
        let outcome = self.session_for(host).run(Operation::Push {
            repo,
            remote: &remote,
            refspecs: &refspecs,
        })?;

        let track = request.set_upstream
            && !request.mirror
            && request.refspec.is_none()
            && !had_upstream;
        if track && let (Some(name), Some(refname)) = (branch.name.as_deref(), branch.refname.as_deref()) {
            set_upstream(repo, name, &remote, refname)?;
            self.notice(format!("Branch '{name}' set up to track '{remote}/{name}'."));
        }
        Ok(outcome)
    }

    /// Clone `url` into `path`, or into a directory named after the
    /// repository when `path` is `None`. Returns the repository path.
    pub fn clone(&self, url: &str, path: Option<&Path>, request: &CloneRequest) -> Result<PathBuf> {
        let host = parse_remote_url(url)?;
        let dest = match path {
            Some(path) => path.to_path_buf(),
            None => default_clone_dir(url, request.bare || request.mirror)?,
        };
        ensure_empty_destination(&dest)?;

        info!(url = %host.url, path = %dest.display(), mirror = request.mirror, "cloning");
        let outcome = self.session_for(host).run(Operation::Clone {
            url,
            path: &dest,
            branch: request.branch.as_deref(),
            bare: request.bare,
            mirror: request.mirror,
        })?;
        Ok(outcome.path.unwrap_or(dest))
    }

    /// List the references advertised by a remote.
    ///
    /// `remote` is a configured remote name or a URL. Without a repository
    /// it must be a URL.
    pub fn ls_remote(&self, repo: Option<&Repository>, remote: Option<&str>) -> Result<Vec<RemoteRef>> {
        let target = match (repo, remote) {
            (Some(repo), requested) => resolve_remote_name(repo, requested, self.sink)?,
            (None, Some(url)) => url.to_string(),
            (None, None) => {
                return Err(SyncError::invalid_argument(
                    "ls-remote needs a repository or a remote url",
                ));
            }
        };

        let host = match repo {
            Some(repo) if repo.remote_url(&target)?.is_some() => {
                resolve_host(RemoteDescriptor::Remote { repo, name: &target })?
            }
            _ => parse_remote_url(&target)?,
        };
        debug!(remote = %target, host = %host.id, "listing remote refs");
        let outcome = self.session_for(host).run(Operation::LsRemote {
            repo,
            remote: &target,
        })?;
        Ok(outcome.refs)
    }

    /// Fetch the upstream of the current branch and integrate it.
    ///
    /// Pull request upstreams (`<remote>/pr/<n>`) are fetched with the pull
    /// request refspec instead of the remote's own.
    pub fn pull(&self, repo: &Repository, remote: Option<&str>, rebase: bool) -> Result<PullOutcome> {
        let branch = repo.current_branch()?;
        if branch.is_bare {
            return Err(SyncError::invalid_argument("cannot pull into a bare repository"));
        }
        let (Some(name), Some(refname)) = (branch.name.as_deref(), branch.refname.as_deref()) else {
            return Err(SyncError::invalid_argument("HEAD is detached; check out a branch to pull"));
        };
        let Some(upstream) = branch.upstream.as_deref() else {
            return Err(SyncError::NoUpstream {
                branch: name.to_string(),
            });
        };

        match (parse_pull_request_upstream(upstream), branch.remote.as_deref()) {
            (Some((pr_remote, pr)), _) => {
                self.fetch_pull_requests(repo, Some(pr), Some(remote.unwrap_or(pr_remote)))?;
            }
            (None, Some(".")) if remote.is_none() => {
                debug!(upstream, "upstream is a local branch, nothing to fetch");
            }
            (None, tracked) => {
                self.fetch(repo, remote.or(tracked), &[], false)?;
            }
        }

        let upstream_ref = branch
            .upstream_ref
            .clone()
            .unwrap_or_else(|| format!("refs/remotes/{upstream}"));
        let reference = match repo.find_reference(&upstream_ref) {
            Ok(reference) => reference,
            Err(e) if e.code() == ErrorCode::NotFound => {
                return Err(SyncError::UpstreamMissingAfterFetch {
                    upstream: upstream.to_string(),
                });
            }
            Err(e) => return Err(e).bail_if("git_reference_lookup"),
        };
        let incoming = repo
            .reference_to_annotated_commit(&reference)
            .bail_if("git_annotated_commit_from_ref")?;
        let (analysis, _) = repo
            .merge_analysis(&[&incoming])
            .bail_if("git_merge_analysis")?;

        let outcome = if analysis.is_up_to_date() {
            PullOutcome::UpToDate
        } else if analysis.is_unborn() || analysis.is_fast_forward() {
            self.fast_forward(repo, refname, incoming.id())?
        } else if rebase {
            self.rebase_onto(repo, upstream, &incoming)?
        } else {
            self.merge_upstream(repo, upstream, &incoming)?
        };
        self.notice(outcome.to_string());
        Ok(outcome)
    }

    fn fast_forward(&self, repo: &Repository, refname: &str, target: Oid) -> Result<PullOutcome> {
        let from = repo.refname_to_id(refname).ok();
        let commit = repo.find_commit(target).bail_if("git_commit_lookup")?;
        let mut checkout = checkout_with_warnings(self.sink);
        repo.checkout_tree(commit.as_object(), Some(&mut checkout))
            .bail_if("git_checkout_tree")?;
        repo.reference(refname, target, true, &format!("pull: fast-forward to {target}"))
            .bail_if("git_reference_create")?;
        Ok(PullOutcome::FastForward { from, to: target })
    }

    fn merge_upstream(
        &self,
        repo: &Repository,
        upstream: &str,
        incoming: &AnnotatedCommit<'_>,
    ) -> Result<PullOutcome> {
        let mut checkout = checkout_with_warnings(self.sink);
        repo.merge(&[incoming], None, Some(&mut checkout))
            .bail_if("git_merge")?;

        let mut index = repo.index().bail_if("git_repository_index")?;
        if index.has_conflicts() {
            return Err(SyncError::MergeConflict {
                paths: conflict_paths(&index)?,
            });
        }

        let tree_id = index.write_tree().bail_if("git_index_write_tree")?;
        let tree = repo.find_tree(tree_id).bail_if("git_tree_lookup")?;
        let head = repo
            .head()
            .and_then(|head| head.peel_to_commit())
            .bail_if("git_reference_peel")?;
        let theirs = repo.find_commit(incoming.id()).bail_if("git_commit_lookup")?;
        let signature = signature(repo)?;
        let commit = repo
            .commit(
                Some("HEAD"),
                &signature,
                &signature,
                &format!("Merge remote-tracking branch '{upstream}'"),
                &tree,
                &[&head, &theirs],
            )
            .bail_if("git_commit_create")?;
        repo.cleanup_state().bail_if("git_repository_state_cleanup")?;
        Ok(PullOutcome::Merged { commit })
    }

    fn rebase_onto(
        &self,
        repo: &Repository,
        upstream: &str,
        incoming: &AnnotatedCommit<'_>,
    ) -> Result<PullOutcome> {
        let head = repo.head().bail_if("git_repository_head")?;
        let local = repo
            .reference_to_annotated_commit(&head)
            .bail_if("git_annotated_commit_from_ref")?;
        let mut options = RebaseOptions::new();
        let mut rebase = repo
            .rebase(Some(&local), Some(incoming), None, Some(&mut options))
            .bail_if("git_rebase_init")?;
        let signature = signature(repo)?;

        if let Err(err) = replay(repo, &mut rebase, &signature, upstream) {
            if let Err(abort) = rebase.abort() {
                warn!("failed to abort rebase: {}", abort.message());
            }
            return Err(err);
        }

        let head = repo
            .head()
            .bail_if("git_repository_head")?
            .target()
            .ok_or_else(|| SyncError::invalid_argument("HEAD does not point at a commit after rebase"))?;
        Ok(PullOutcome::Rebased { head })
    }

    fn session_for(&self, host: ResolvedHost) -> TransportSession<'_> {
        let locator =
            KeyLocator::new(self.agent.as_ref(), self.keys.as_ref()).with_config(&self.config.ssh);
        let negotiator = CredentialNegotiator::new(host, self.secrets, self.sink)
            .with_options(NegotiatorOptions::from_config(&self.config, self.verbose))
            .with_key_locator(locator, self.explicit_key.clone())
            .with_credentials(&self.config.credentials)
            .with_hints(self.hints);
        TransportSession::new(negotiator, self.sink, self.verbose)
    }

    fn notice(&self, message: String) {
        info!("{message}");
        self.sink.on_event(&SessionEvent::Notice(message));
    }
}

/// Pick the remote to talk to.
///
/// An explicit name wins. Otherwise the current branch's remote is used,
/// then `origin` with a notice. Fails with `NoRemoteConfigured` when none
/// of those exist.
pub fn resolve_remote_name(
    meta: &dyn RepoMetadata,
    requested: Option<&str>,
    sink: &dyn ProgressSink,
) -> Result<String> {
    if let Some(name) = requested {
        return Ok(name.to_string());
    }

    let branch = meta.current_branch()?;
    if let Some(remote) = branch.remote.filter(|remote| remote != ".") {
        trace!(remote = %remote, "using the remote of the current branch");
        return Ok(remote);
    }

    if meta.remote_url(DEFAULT_REMOTE)?.is_some() {
        let message = match branch.name {
            Some(name) => format!("No remote is set for branch '{name}', using default remote '{DEFAULT_REMOTE}'"),
            None => format!("HEAD is detached, using default remote '{DEFAULT_REMOTE}'"),
        };
        info!("{message}");
        sink.on_event(&SessionEvent::Notice(message));
        return Ok(DEFAULT_REMOTE.to_string());
    }

    Err(SyncError::NoRemoteConfigured)
}

/// Directory name `git clone` would pick for `url`.
pub fn default_clone_dir(url: &str, bare: bool) -> Result<PathBuf> {
    let trimmed = url.trim().trim_end_matches('/');
    let last = trimmed
        .rsplit(['/', ':', '\\'])
        .next()
        .unwrap_or(trimmed);
    let name = last.strip_suffix(".git").unwrap_or(last);
    if name.is_empty() {
        return Err(SyncError::invalid_argument(format!(
            "cannot guess a directory name from '{url}'; pass a path"
        )));
    }
    Ok(PathBuf::from(if bare {
        format!("{name}.git")
    } else {
        name.to_string()
    }))
}

fn ensure_empty_destination(path: &Path) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }
    let mut entries = std::fs::read_dir(path).map_err(|e| SyncError::io(path, &e))?;
    if entries.next().is_some() {
        return Err(SyncError::invalid_argument(format!(
            "destination path '{}' already exists and is not an empty directory",
            path.display()
        )));
    }
    Ok(())
}

fn replay(
    repo: &Repository,
    rebase: &mut Rebase<'_>,
    signature: &Signature<'_>,
    upstream: &str,
) -> Result<()> {
    while let Some(step) = rebase.next() {
        let step = step.bail_if("git_rebase_next")?;
        trace!(commit = %step.id(), "replaying");

        let index = repo.index().bail_if("git_repository_index")?;
        if index.has_conflicts() {
            return Err(SyncError::RebaseConflict {
                upstream: upstream.to_string(),
                paths: conflict_paths(&index)?,
            });
        }
        match rebase.commit(None, signature, None) {
            Ok(_) => {}
            Err(e) if e.code() == ErrorCode::Applied => trace!("already applied upstream"),
            Err(e) => return Err(e).bail_if("git_rebase_commit"),
        }
    }
    rebase.finish(Some(signature)).bail_if("git_rebase_finish")
}

fn conflict_paths(index: &Index) -> Result<Vec<String>> {
    let mut paths = Vec::new();
    for conflict in index.conflicts().bail_if("git_index_conflict_iterator_new")? {
        let conflict = conflict.bail_if("git_index_conflict_next")?;
        if let Some(entry) = conflict.our.or(conflict.their).or(conflict.ancestor) {
            paths.push(String::from_utf8_lossy(&entry.path).into_owned());
        }
    }
    paths.sort();
    paths.dedup();
    Ok(paths)
}

fn signature(repo: &Repository) -> Result<Signature<'static>> {
    repo.signature()
        .or_else(|_| Signature::now("gitsync", "gitsync@localhost"))
        .bail_if("git_signature_default")
}
