//! Mapping changed-file paths onto local repository clones.
//!
//! Clones are expected at `<repos_dir>/<owner>/<repo>`. How they get there is
//! somebody else's job; the resolver only reads the filesystem.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::repo_url::RepoSlug;

/// A change path mapped onto a clone root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPath {
    /// Clone root the path was resolved under.
    pub clone_root: PathBuf,
    /// Forward-slash relative path with separators normalized.
    pub relative: String,
    /// Native filesystem path to the file.
    pub path: PathBuf,
}

impl ResolvedPath {
    /// Whether a regular file exists at the resolved path.
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }
}

/// Resolves repositories and change paths under a base directory.
#[derive(Debug, Clone)]
pub struct PathResolver {
    repos_dir: PathBuf,
}

impl PathResolver {
    /// Create a resolver rooted at the directory holding all clones.
    pub fn new(repos_dir: impl Into<PathBuf>) -> Self {
        Self {
            repos_dir: repos_dir.into(),
        }
    }

    /// Base directory holding the clones.
    pub fn repos_dir(&self) -> &Path {
        &self.repos_dir
    }

    /// Local clone root for a repository.
    pub fn clone_root(&self, slug: &RepoSlug) -> PathBuf {
        self.repos_dir.join(&slug.owner).join(&slug.name)
    }

    /// Map a repository-relative change path onto `clone_root`.
    ///
    /// Leading separators of either convention are dropped and backslashes
    /// are treated as separators. Returns `None` when nothing is left or when
    /// a `..` segment would step outside the clone.
    pub fn resolve(&self, clone_root: &Path, change_path: &str) -> Option<ResolvedPath> {
        let segments = normalize_segments(change_path)?;

        let mut path = clone_root.to_path_buf();
        for segment in &segments {
            path.push(segment);
        }

        Some(ResolvedPath {
            clone_root: clone_root.to_path_buf(),
            relative: segments.join("/"),
            path,
        })
    }
}

fn normalize_segments(change_path: &str) -> Option<Vec<&str>> {
    let trimmed = change_path.trim_start_matches(['/', '\\']);

    let mut segments = Vec::new();
    for segment in trimmed.split(['/', '\\']) {
        match segment {
            "" | "." => continue,
            ".." => {
                debug!(path = change_path, "Refusing parent-directory segment");
                return None;
            }
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        None
    } else {
        Some(segments)
    }
}
