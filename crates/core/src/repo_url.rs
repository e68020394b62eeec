// SPDX-License-Identifier: MIT

//! Repository location grammar: `owner/repo` shorthand or a full GitHub URL,
//! normalized to an `https://.../.git` clone URL.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoLocation {
    pub owner: String,
    pub repo: String,
}

impl RepoLocation {
    /// The normalized `https://github.com/{owner}/{repo}.git` clone URL.
    pub fn clone_url(&self) -> String {
        format!("https://github.com/{}/{}.git", self.owner, self.repo)
    }

    /// `{owner}/{repo}` directory name used under `/workspace/<repo-name>`.
    pub fn dir_name(&self) -> &str {
        &self.repo
    }
}

impl fmt::Display for RepoLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RepoUrlError {
    #[error("repository location `{0}` is neither `owner/repo` nor a GitHub URL")]
    Malformed(String),
}

/// Parse `owner/repo` shorthand or `https://github.com/owner/repo[.git]`.
///
/// A bare host-less string that isn't `owner/repo` shaped, or a URL whose
/// host isn't recognized, is rejected. This is the only entry point used by
/// the Preparation Pipeline's clone step.
pub fn parse(input: &str) -> Result<RepoLocation, RepoUrlError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(RepoUrlError::Malformed(input.to_string()));
    }

    if let Some(rest) = strip_url_prefix(trimmed) {
        return parse_owner_repo(rest).ok_or_else(|| RepoUrlError::Malformed(input.to_string()));
    }

    // No scheme/host — must be shorthand `owner/repo` with no extra slashes.
    if trimmed.contains("://") || trimmed.starts_with("git@") {
        return Err(RepoUrlError::Malformed(input.to_string()));
    }
    parse_owner_repo(trimmed).ok_or_else(|| RepoUrlError::Malformed(input.to_string()))
}

fn strip_url_prefix(s: &str) -> Option<&str> {
    for prefix in ["https://github.com/", "http://github.com/", "github.com/"] {
        if let Some(rest) = s.strip_prefix(prefix) {
            return Some(rest);
        }
    }
    None
}

fn parse_owner_repo(s: &str) -> Option<RepoLocation> {
    let s = s.trim_end_matches('/');
    let s = s.strip_suffix(".git").unwrap_or(s);
    let mut parts = s.split('/');
    let owner = parts.next()?;
    let repo = parts.next()?;
    if parts.next().is_some() || owner.is_empty() || repo.is_empty() {
        return None;
    }
    Some(RepoLocation { owner: owner.to_string(), repo: repo.to_string() })
}

#[cfg(test)]
#[path = "repo_url_tests.rs"]
mod tests;
