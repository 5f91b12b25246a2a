//! Ref, commit and repository identifiers.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StatusError};

/// A branch name or commit id used as the query key against the remote.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GitRef(pub String);

impl GitRef {
    pub fn new(name: impl Into<String>) -> Self {
        GitRef(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for GitRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<CommitId> for GitRef {
    fn from(commit: CommitId) -> Self {
        GitRef(commit.0)
    }
}

/// Full commit SHA as printed by `git`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommitId(pub String);

impl CommitId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form (first 7 hex chars).
    pub fn short(&self) -> &str {
        &self.0[..7.min(self.0.len())]
    }
}

impl std::fmt::Display for CommitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A remote-tracking branch split into its remote and the branch name as the
/// remote knows it, e.g. `origin/fx` -> (`origin`, `fx`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemoteBranch {
    pub remote: String,
    pub short_name: String,
}

impl RemoteBranch {
    /// Split `raw` on the longest configured remote name that prefixes it.
    ///
    /// With no configured remotes the split happens at the first `/`.
    pub fn parse(raw: &str, remotes: &[String]) -> Result<Self> {
        let malformed = || StatusError::MalformedRemoteBranch {
            raw: raw.to_string(),
        };

        let remote = remotes
            .iter()
            .filter(|r| !r.is_empty())
            .filter(|r| {
                raw.strip_prefix(r.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
            })
            .max_by_key(|r| r.len())
            .cloned();

        let (remote, short_name) = match remote {
            Some(remote) => {
                let short = raw[remote.len() + 1..].to_string();
                (remote, short)
            }
            None if remotes.is_empty() => {
                let (remote, short) = raw.split_once('/').ok_or_else(malformed)?;
                (remote.to_string(), short.to_string())
            }
            None => return Err(malformed()),
        };

        if remote.is_empty() || short_name.is_empty() {
            return Err(malformed());
        }
        Ok(Self { remote, short_name })
    }
}

impl std::fmt::Display for RemoteBranch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.remote, self.short_name)
    }
}

/// Owner and name of the repository on the code-hosting service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoSlug {
    pub owner: String,
    pub name: String,
}

fn scp_like_url() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:[^@/]+@)?[^:/]+:(?P<path>[^/].*)$").expect("valid scp-like url regex")
    })
}

fn scheme_url() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.-]*://(?:[^@/]+@)?[^/]+/(?P<path>.+)$")
            .expect("valid scheme url regex")
    })
}

impl RepoSlug {
    pub fn new(owner: &str, name: &str) -> Self {
        Self {
            owner: owner.to_string(),
            name: name.to_string(),
        }
    }

    /// Derive owner/name from a remote URL.
    ///
    /// Accepts `git@host:owner/name.git`, `ssh://git@host/owner/name.git`
    /// and `https://host/owner/name(.git)`.
    pub fn from_remote_url(remote: &str, url: &str) -> Result<Self> {
        let unknown = |detail: &str| StatusError::UnknownRepository {
            remote: remote.to_string(),
            detail: detail.to_string(),
        };

        let url = url.trim();
        let path = scheme_url()
            .captures(url)
            .or_else(|| scp_like_url().captures(url))
            .and_then(|caps| caps.name("path"))
            .map(|m| m.as_str())
            .ok_or_else(|| unknown(&format!("unrecognised url {url:?}")))?;

        let path = path.trim_end_matches('/');
        let path = path.strip_suffix(".git").unwrap_or(path);
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        match segments.as_slice() {
            [.., owner, name] => Ok(Self::new(owner, name)),
            _ => Err(unknown(&format!("no owner/name in {url:?}"))),
        }
    }
}

impl std::fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remotes(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_remote_branch_uses_remote_side_name() {
        let rb = RemoteBranch::parse("origin/fx", &remotes(&["origin"])).unwrap();
        assert_eq!(rb.remote, "origin");
        assert_eq!(rb.short_name, "fx");
    }

    #[test]
    fn test_remote_branch_keeps_slashes_in_branch_name() {
        let rb = RemoteBranch::parse("origin/feature/x", &remotes(&["origin"])).unwrap();
        assert_eq!(rb.short_name, "feature/x");
        assert_eq!(rb.to_string(), "origin/feature/x");
    }

    #[test]
    fn test_remote_branch_prefers_longest_remote() {
        let rb = RemoteBranch::parse("team/fork/topic", &remotes(&["team", "team/fork"])).unwrap();
        assert_eq!(rb.remote, "team/fork");
        assert_eq!(rb.short_name, "topic");
    }

    #[test]
    fn test_remote_branch_without_known_remotes_splits_at_first_slash() {
        let rb = RemoteBranch::parse("upstream/main", &[]).unwrap();
        assert_eq!(rb.remote, "upstream");
        assert_eq!(rb.short_name, "main");
    }

    #[test]
    fn test_remote_branch_rejects_malformed_input() {
        for raw in ["main", "origin/", "/main", ""] {
            let err = RemoteBranch::parse(raw, &[]).unwrap_err();
            assert!(
                matches!(err, StatusError::MalformedRemoteBranch { .. }),
                "{raw:?} gave {err:?}"
            );
        }
        let err = RemoteBranch::parse("other/main", &remotes(&["origin"])).unwrap_err();
        assert!(matches!(err, StatusError::MalformedRemoteBranch { .. }));
    }

    #[test]
    fn test_slug_from_common_remote_urls() {
        let cases = [
            "git@github.com:octo/widgets.git",
            "git@github.com:octo/widgets",
            "ssh://git@github.com/octo/widgets.git",
            "https://github.com/octo/widgets.git",
            "https://github.com/octo/widgets/",
            "https://user@github.com/octo/widgets",
        ];
        for url in cases {
            let slug = RepoSlug::from_remote_url("origin", url).unwrap();
            assert_eq!(slug, RepoSlug::new("octo", "widgets"), "url: {url}");
        }
    }

    #[test]
    fn test_slug_rejects_urls_without_owner() {
        let err = RepoSlug::from_remote_url("origin", "https://github.com/widgets").unwrap_err();
        assert!(matches!(err, StatusError::UnknownRepository { .. }));

        let err = RepoSlug::from_remote_url("origin", "/srv/git/widgets.git").unwrap_err();
        assert!(matches!(err, StatusError::UnknownRepository { .. }));
    }

    #[test]
    fn test_commit_short() {
        let id = CommitId("6dcb09b5b57875f334f61aebed695e2e4193db5e".to_string());
        assert_eq!(id.short(), "6dcb09b");
        assert_eq!(GitRef::from(id.clone()).as_str(), id.as_str());
    }
}
