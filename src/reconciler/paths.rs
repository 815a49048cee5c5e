//! # Path isolation
//!
//! Namespace isolation policy on vault paths. When a namespace prefix
//! is configured, paths under it are only reachable from the matching
//! namespace; paths outside the prefix are always allowed.

/// Whether a claim in `namespace` may use `path` under the configured
/// `prefix`.
///
/// The remainder of a prefixed path must begin with `namespace + "/"`
/// exactly, so `secret/teams/team-ab/db` is not reachable from
/// `team-a`.
pub fn path_allowed(path: &str, prefix: &str, namespace: &str) -> bool {
    if !path.starts_with(prefix) {
        return true;
    }
    path.starts_with(&format!("{prefix}{namespace}/"))
}
