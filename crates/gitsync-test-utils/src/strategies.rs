//! Proptest strategies for remote URLs.

use proptest::prelude::*;

/// Lowercase DNS-style host names.
pub fn host_name() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z][a-z0-9]{0,8}", 1..4).prop_map(|labels| labels.join("."))
}

/// Repository paths like `owner/repo.git`.
pub fn repo_path() -> impl Strategy<Value = String> {
    ("[a-z][a-z0-9_-]{0,10}", "[a-z][a-z0-9_.-]{0,10}", any::<bool>()).prop_map(
        |(owner, repo, suffix)| {
            if suffix {
                format!("{owner}/{repo}.git")
            } else {
                format!("{owner}/{repo}")
            }
        },
    )
}

/// A remote URL in one of the supported notations, paired with the host it names.
pub fn remote_url() -> impl Strategy<Value = (String, String)> {
    (
        host_name(),
        repo_path(),
        prop::option::of("[a-z][a-z0-9]{0,6}"),
        0usize..4,
    )
        .prop_map(|(host, path, user, notation)| {
            let user_prefix = user.map(|u| format!("{u}@")).unwrap_or_default();
            let url = match notation {
                0 => format!("https://{user_prefix}{host}/{path}"),
                1 => format!("ssh://{user_prefix}{host}/{path}"),
                2 => format!("git://{host}/{path}"),
                _ if user_prefix.is_empty() => format!("git@{host}:{path}"),
                _ => format!("{user_prefix}{host}:{path}"),
            };
            (url, host)
        })
}
