//! Repository and remote metadata consumed by the transport operations.

use crate::error::{NativeResultExt, Result};
use git2::{ErrorCode, Repository};

/// The checked-out branch and its tracking configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BranchInfo {
    /// Short branch name (`main`); `None` when HEAD is detached.
    pub name: Option<String>,
    /// Full ref name (`refs/heads/main`).
    pub refname: Option<String>,
    /// `branch.<name>.remote`.
    pub remote: Option<String>,
    /// `branch.<name>.merge` (`refs/heads/main`).
    pub merge: Option<String>,
    /// Upstream shorthand (`origin/main`).
    pub upstream: Option<String>,
    /// Upstream ref (`refs/remotes/origin/main`).
    pub upstream_ref: Option<String>,
    /// Whether the repository is bare.
    pub is_bare: bool,
}

/// Remote and branch lookups.
pub trait RepoMetadata {
    /// URL of the remote called `name`, or `None` if no such remote exists.
    fn remote_url(&self, name: &str) -> Result<Option<String>>;

    /// The checked-out branch.
    fn current_branch(&self) -> Result<BranchInfo>;
}

impl RepoMetadata for Repository {
    fn remote_url(&self, name: &str) -> Result<Option<String>> {
        match self.find_remote(name) {
            Ok(remote) => Ok(remote.url().map(str::to_string)),
            Err(e) if matches!(e.code(), ErrorCode::NotFound | ErrorCode::InvalidSpec) => Ok(None),
            Err(e) => Err(e).bail_if("git_remote_lookup"),
        }
    }

    fn current_branch(&self) -> Result<BranchInfo> {
        let head = self.find_reference("HEAD").bail_if("git_reference_lookup")?;
        let refname = head
            .symbolic_target()
            .filter(|target| target.starts_with("refs/heads/"))
            .map(str::to_string);

        let mut info = BranchInfo {
            name: refname
                .as_deref()
                .and_then(|r| r.strip_prefix("refs/heads/"))
                .map(str::to_string),
            refname: refname.clone(),
            is_bare: self.is_bare(),
            ..BranchInfo::default()
        };

        let Some(refname) = refname else {
            return Ok(info);
        };

        info.remote = optional(self.branch_upstream_remote(&refname), "git_branch_upstream_remote")?;
        if let Some(name) = info.name.as_deref() {
            info.merge = config_entry(self, &format!("branch.{name}.merge"))?;
        }
        info.upstream_ref = optional(self.branch_upstream_name(&refname), "git_branch_upstream_name")?;
        info.upstream = info.upstream_ref.as_deref().map(|r| {
            r.strip_prefix("refs/remotes/")
                .or_else(|| r.strip_prefix("refs/heads/"))
                .unwrap_or(r)
                .to_string()
        });
        Ok(info)
    }
}

/// Map "not configured" to `None`.
fn optional(
    result: std::result::Result<git2::Buf, git2::Error>,
    context: &str,
) -> Result<Option<String>> {
    match result {
        Ok(buf) => Ok(buf.as_str().map(str::to_string)),
        Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
        Err(e) => Err(e).bail_if(context),
    }
}

/// Read a string entry from the repository configuration.
fn config_entry(repo: &Repository, key: &str) -> Result<Option<String>> {
    let config = repo.config().bail_if("git_repository_config")?;
    match config.get_string(key) {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
        Err(e) => Err(e).bail_if("git_config_get_string"),
    }
}

/// Whether `refname` has a tracking branch configured.
pub fn has_upstream(repo: &Repository, refname: &str) -> Result<bool> {
    optional(repo.branch_upstream_name(refname), "git_branch_upstream_name").map(|u| u.is_some())
}

/// Configure `branch` to track `merge` on `remote`.
pub fn set_upstream(repo: &Repository, branch: &str, remote: &str, merge: &str) -> Result<()> {
    let mut config = repo.config().bail_if("git_repository_config")?;
    config
        .set_str(&format!("branch.{branch}.remote"), remote)
        .bail_if("git_config_set_string")?;
    config
        .set_str(&format!("branch.{branch}.merge"), merge)
        .bail_if("git_config_set_string")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::Signature;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn repo_with_commit() -> (TempDir, Repository) {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        {
            let sig = Signature::now("Test", "test@example.com").unwrap();
            let tree_id = repo.index().unwrap().write_tree().unwrap();
            let tree = repo.find_tree(tree_id).unwrap();
            repo.commit(Some("HEAD"), &sig, &sig, "init", &tree, &[])
                .unwrap();
        }
        (dir, repo)
    }

    fn head_name(repo: &Repository) -> String {
        repo.head().unwrap().shorthand().unwrap().to_string()
    }

    #[test]
    fn branch_without_upstream() {
        let (_dir, repo) = repo_with_commit();
        let info = repo.current_branch().unwrap();
        assert_eq!(info.name.as_deref(), Some(head_name(&repo).as_str()));
        assert_eq!(info.remote, None);
        assert_eq!(info.upstream, None);
        assert!(!info.is_bare);
    }

    #[test]
    fn unborn_branch_has_name() {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let info = repo.current_branch().unwrap();
        assert!(info.name.is_some());
        assert!(info.refname.unwrap().starts_with("refs/heads/"));
    }

    #[test]
    fn configured_upstream_is_reported() {
        let (_dir, repo) = repo_with_commit();
        let branch = head_name(&repo);
        repo.remote("origin", "https://example.org/r.git").unwrap();
        let head = repo.head().unwrap().target().unwrap();
        repo.reference(&format!("refs/remotes/origin/{branch}"), head, true, "test")
            .unwrap();
        set_upstream(&repo, &branch, "origin", &format!("refs/heads/{branch}")).unwrap();

        let info = repo.current_branch().unwrap();
        assert_eq!(info.remote.as_deref(), Some("origin"));
        assert_eq!(info.upstream, Some(format!("origin/{branch}")));
        assert_eq!(info.merge, Some(format!("refs/heads/{branch}")));
        assert!(has_upstream(&repo, &format!("refs/heads/{branch}")).unwrap());
    }

    #[test]
    fn local_upstream_reads_merge_from_config() {
        let (_dir, repo) = repo_with_commit();
        let branch = head_name(&repo);
        set_upstream(&repo, &branch, ".", "refs/heads/base").unwrap();

        let info = repo.current_branch().unwrap();
        assert_eq!(info.remote.as_deref(), Some("."));
        assert_eq!(info.merge.as_deref(), Some("refs/heads/base"));
        assert_eq!(info.upstream.as_deref(), Some("base"));
    }

    #[test]
    fn detached_head() {
        let (_dir, repo) = repo_with_commit();
        let head = repo.head().unwrap().target().unwrap();
        repo.set_head_detached(head).unwrap();
        let info = repo.current_branch().unwrap();
        assert_eq!(info.name, None);
        assert_eq!(info.refname, None);
    }

    #[test]
    fn remote_url_lookup() {
        let (_dir, repo) = repo_with_commit();
        repo.remote("origin", "git@github.com:o/r.git").unwrap();
        assert_eq!(
            repo.remote_url("origin").unwrap().as_deref(),
            Some("git@github.com:o/r.git")
        );
        assert_eq!(repo.remote_url("upstream").unwrap(), None);
    }
}
