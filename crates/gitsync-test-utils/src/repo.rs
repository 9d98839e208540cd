//! Temporary git repositories for exercising transports over `file` remotes.

use anyhow::{Context, Result};
use git2::build::CheckoutBuilder;
use git2::{Commit, Oid, Repository, RepositoryInitOptions};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{TempDir, tempdir};

/// Branch every fixture repository starts on.
pub const MAIN: &str = "main";

/// Initialise a repository on `main` with a commit identity configured.
pub fn init_repo(path: &Path, bare: bool) -> Result<Repository> {
    let mut options = RepositoryInitOptions::new();
    options.bare(bare).initial_head(MAIN);
    let repo = Repository::init_opts(path, &options)
        .with_context(|| format!("Failed to init repository at {}", path.display()))?;
    configure_identity(&repo)?;
    Ok(repo)
}

fn configure_identity(repo: &Repository) -> Result<()> {
    let mut config = repo.config()?;
    config.set_str("user.name", "Test User")?;
    config.set_str("user.email", "test@example.com")?;
    Ok(())
}

/// Write `content` to `relative`, stage it and commit on HEAD.
pub fn commit_file(repo: &Repository, relative: &str, content: &str, message: &str) -> Result<Oid> {
    let workdir = repo
        .workdir()
        .context("Bare repository has no working tree")?;
    let path = workdir.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, content)?;

    let mut index = repo.index()?;
    index.add_path(Path::new(relative))?;
    index.write()?;
    let tree = repo.find_tree(index.write_tree()?)?;
    let signature = repo.signature()?;

    let parents: Vec<Commit<'_>> = match repo.head() {
        Ok(head) => vec![head.peel_to_commit()?],
        Err(_) => Vec::new(),
    };
    let parents: Vec<&Commit<'_>> = parents.iter().collect();
    Ok(repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)?)
}

/// A bare upstream repository plus a private seed clone used to author its history.
#[derive(Debug)]
pub struct RemoteFixture {
    dir: TempDir,
    upstream: PathBuf,
    seed: PathBuf,
}

impl RemoteFixture {
    /// Create an upstream with one commit on `main` containing `README.md`.
    pub fn new() -> Result<Self> {
        let dir = tempdir().context("Failed to create temp directory")?;
        let upstream = dir.path().join("upstream.git");
        let seed = dir.path().join("seed");

        init_repo(&upstream, true)?;
        let seed_repo = init_repo(&seed, false)?;
        seed_repo.remote("origin", &upstream.to_string_lossy())?;
        commit_file(&seed_repo, "README.md", "# fixture\n", "Initial commit")?;

        let fixture = Self {
            dir,
            upstream,
            seed,
        };
        fixture.push_seed(&format!("refs/heads/{MAIN}:refs/heads/{MAIN}"))?;
        Ok(fixture)
    }

    /// Root of the fixture's temporary directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Path of the bare upstream.
    #[must_use]
    pub fn upstream_path(&self) -> &Path {
        &self.upstream
    }

    /// Upstream location usable as a remote URL.
    #[must_use]
    pub fn upstream_url(&self) -> String {
        self.upstream.to_string_lossy().into_owned()
    }

    /// Open the bare upstream.
    pub fn upstream_repo(&self) -> Result<Repository> {
        Ok(Repository::open_bare(&self.upstream)?)
    }

    /// Tip of `main` on the upstream.
    pub fn upstream_head(&self) -> Result<Oid> {
        Ok(self
            .upstream_repo()?
            .refname_to_id(&format!("refs/heads/{MAIN}"))?)
    }

    /// Commit `content` to `relative` on upstream `main`.
    pub fn upstream_commit(&self, relative: &str, content: &str, message: &str) -> Result<Oid> {
        let seed = Repository::open(&self.seed)?;
        let oid = commit_file(&seed, relative, content, message)?;
        self.push_seed(&format!("refs/heads/{MAIN}:refs/heads/{MAIN}"))?;
        Ok(oid)
    }

    /// Publish a pull request head `refs/pull/<number>/head` one commit ahead of `main`.
    pub fn pull_request(&self, number: u32, relative: &str, content: &str) -> Result<Oid> {
        let seed = Repository::open(&self.seed)?;
        let branch = format!("pr-{number}");
        let main = seed.head()?.peel_to_commit()?;
        seed.branch(&branch, &main, true)?;
        seed.set_head(&format!("refs/heads/{branch}"))?;
        seed.checkout_head(Some(CheckoutBuilder::new().force()))?;

        let oid = commit_file(&seed, relative, content, &format!("Pull request #{number}"))?;
        self.push_seed(&format!("+refs/heads/{branch}:refs/pull/{number}/head"))?;

        seed.set_head(&format!("refs/heads/{MAIN}"))?;
        seed.checkout_head(Some(CheckoutBuilder::new().force()))?;
        Ok(oid)
    }

    /// Clone the upstream into `<root>/<name>` with libgit2 directly.
    pub fn clone_into(&self, name: &str) -> Result<Repository> {
        let path = self.path(name);
        let repo = Repository::clone(&self.upstream_url(), &path)
            .with_context(|| format!("Failed to clone into {}", path.display()))?;
        configure_identity(&repo)?;
        Ok(repo)
    }

    /// Path for a new repository named `name` inside the fixture.
    #[must_use]
    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn push_seed(&self, refspec: &str) -> Result<()> {
        let seed = Repository::open(&self.seed)?;
        let mut remote = seed.find_remote("origin")?;
        remote
            .push(&[refspec], None)
            .with_context(|| format!("Failed to push {refspec} to fixture upstream"))?;
        Ok(())
    }
}
