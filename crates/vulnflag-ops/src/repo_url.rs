//! Repository URL parsing.

use std::fmt;

use serde::{Deserialize, Serialize};

const API_MARKER: &str = "api.github.com/repos/";
const SSH_MARKER: &str = "git@github.com:";
const HOST_MARKER: &str = "github.com";

/// Owner and name of a hosted repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoSlug {
    /// Account or organization owning the repository.
    pub owner: String,
    /// Repository name.
    pub name: String,
}

impl RepoSlug {
    /// Create a slug from its parts.
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Extract `owner/repo` from a repository URL.
///
/// Accepted shapes:
/// - `https://api.github.com/repos/owner/repo`
/// - `https://github.com/owner/repo` (and `http://`)
/// - `git@github.com:owner/repo.git`
/// - `github.com/owner/repo`
///
/// Absent input, any other shape, or fewer than two path segments yield
/// `None`.
pub fn parse_repo_url(url: Option<&str>) -> Option<RepoSlug> {
    let url = url?.trim();
    let url = url.trim_end_matches('/');
    let url = url.strip_suffix(".git").unwrap_or(url);

    if let Some((_, rest)) = url.split_once(API_MARKER) {
        return owner_and_name(rest);
    }

    let rest = match url.strip_prefix(SSH_MARKER) {
        Some(rest) => rest,
        None => url.split_once(HOST_MARKER)?.1,
    };

    owner_and_name(rest)
}

/// Split a host-relative path into its first two segments.
fn owner_and_name(path: &str) -> Option<RepoSlug> {
    let mut segments = path.trim_matches('/').split('/');
    let owner = segments.next().filter(|s| !s.is_empty())?;
    let name = segments.next().filter(|s| !s.is_empty())?;
    Some(RepoSlug::new(owner, name))
}
