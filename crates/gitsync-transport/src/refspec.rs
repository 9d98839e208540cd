//! Refspec construction for push, mirror and pull-request fetches.

use crate::error::{Result, SyncError};
use glob::Pattern;

/// Prefix `spec` with `+` unless it already has one.
#[must_use]
pub fn force_refspec(spec: &str) -> String {
    if spec.starts_with('+') {
        spec.to_string()
    } else {
        format!("+{spec}")
    }
}

/// `+refs/pull/<pr>/head:refs/remotes/<remote>/pr/<pr>`. `pr` may be `*`.
#[must_use]
pub fn pull_request_refspec(pr: &str, remote: &str) -> String {
    format!("+refs/pull/{pr}/head:refs/remotes/{remote}/pr/{pr}")
}

/// Split an upstream shorthand like `origin/pr/42` into `("origin", "42")`.
#[must_use]
pub fn parse_pull_request_upstream(upstream: &str) -> Option<(&str, &str)> {
    let (remote, pr) = upstream.split_once("/pr/")?;
    let valid = !remote.is_empty()
        && !remote.contains('/')
        && !pr.is_empty()
        && pr.bytes().all(|b| b.is_ascii_digit());
    valid.then_some((remote, pr))
}

/// Ref name patterns left out of mirror pushes.
#[derive(Debug, Clone, Default)]
pub struct MirrorFilter {
    patterns: Vec<Pattern>,
}

impl MirrorFilter {
    /// Compile glob patterns such as `refs/pull/*`.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|p| {
                Pattern::new(p.as_ref()).map_err(|e| {
                    SyncError::invalid_argument(format!(
                        "invalid mirror exclusion pattern '{}': {e}",
                        p.as_ref()
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// Whether `refname` is excluded.
    #[must_use]
    pub fn excludes(&self, refname: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(refname))
    }

    /// Forced one-to-one refspecs for every ref not excluded.
    pub fn refspecs<'r>(&self, refnames: impl IntoIterator<Item = &'r str>) -> Vec<String> {
        refnames
            .into_iter()
            .filter(|name| name.starts_with("refs/") && !self.excludes(name))
            .map(|name| format!("+{name}:{name}"))
            .collect()
    }
}

/// Direct ref names of `repo`, skipping symbolic refs like `refs/remotes/origin/HEAD`.
pub fn local_refnames(repo: &git2::Repository) -> Result<Vec<String>> {
    use crate::error::NativeResultExt;

    let mut names = Vec::new();
    for reference in repo.references().bail_if("git_reference_iterator_new")? {
        let reference = reference.bail_if("git_reference_next")?;
        if reference.kind() != Some(git2::ReferenceType::Direct) {
            continue;
        }
        if let Some(name) = reference.name() {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}
