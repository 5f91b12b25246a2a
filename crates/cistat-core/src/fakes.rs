//! In-memory fakes for the collaborator traits (testing and embedding).
//!
//! Provides `FakeVcs` and `FakeStatusApi`, which satisfy the [`Vcs`] and
//! [`StatusApi`] contracts without a repository or network access.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{CommitId, GitRef, RepoSlug, StatusReport};
use crate::error::{RemoteError, Result};
use crate::git::Vcs;
use crate::remote::{RemoteResult, StatusApi};

// ---------------------------------------------------------------------------
// FakeVcs
// ---------------------------------------------------------------------------

/// Scripted repository state.
#[derive(Debug, Default)]
pub struct FakeVcs {
    current_branch: Option<String>,
    tracking: HashMap<String, String>,
    remotes: Vec<(String, String)>,
    /// Newest first.
    commits: Vec<(String, String)>,
    revs: HashMap<String, String>,
    rebase_in_progress: AtomicBool,
    config: Mutex<HashMap<String, bool>>,
}

impl FakeVcs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_current_branch(mut self, branch: &str) -> Self {
        self.current_branch = Some(branch.to_string());
        self
    }

    /// Set the push/upstream branch (`remote/name`) of a local branch.
    pub fn with_tracking(mut self, branch: &str, remote_branch: &str) -> Self {
        self.tracking
            .insert(branch.to_string(), remote_branch.to_string());
        self
    }

    pub fn with_remote(mut self, name: &str, url: &str) -> Self {
        self.remotes.push((name.to_string(), url.to_string()));
        self
    }

    /// Append a commit older than every commit added so far.
    pub fn with_commit(mut self, sha: &str, message: &str) -> Self {
        self.commits.push((sha.to_string(), message.to_string()));
        self
    }

    /// Make `rev` resolve to `sha`.
    pub fn with_rev(mut self, rev: &str, sha: &str) -> Self {
        self.revs.insert(rev.to_string(), sha.to_string());
        self
    }

    pub fn with_config(self, key: &str, value: bool) -> Self {
        self.set_config(key, value);
        self
    }

    pub fn set_config(&self, key: &str, value: bool) {
        self.config
            .lock()
            .unwrap()
            .insert(key.to_string(), value);
    }

    pub fn set_rebase_in_progress(&self, in_progress: bool) {
        self.rebase_in_progress.store(in_progress, Ordering::SeqCst);
    }
}

impl Vcs for FakeVcs {
    fn current_branch(&self) -> Result<Option<String>> {
        Ok(self.current_branch.clone())
    }

    fn push_tracking_branch(&self, branch: &str) -> Result<Option<String>> {
        Ok(self.tracking.get(branch).cloned())
    }

    fn remotes(&self) -> Result<Vec<String>> {
        Ok(self.remotes.iter().map(|(name, _)| name.clone()).collect())
    }

    fn remote_url(&self, remote: &str) -> Result<Option<String>> {
        Ok(self
            .remotes
            .iter()
            .find(|(name, _)| name == remote)
            .map(|(_, url)| url.clone()))
    }

    fn is_rebase_in_progress(&self) -> bool {
        self.rebase_in_progress.load(Ordering::SeqCst)
    }

    /// Emulates `git log --format=%H` over the scripted history, honouring
    /// literal `--grep=`, `--invert-grep` and `-n<N>`. Other args are ignored.
    fn log_lines(&self, args: &[&str]) -> Result<Vec<String>> {
        let patterns: Vec<&str> = args
            .iter()
            .filter_map(|arg| arg.strip_prefix("--grep="))
            .collect();
        let invert = args.contains(&"--invert-grep");
        let limit = args
            .iter()
            .find_map(|arg| arg.strip_prefix("-n").and_then(|n| n.parse::<usize>().ok()))
            .unwrap_or(usize::MAX);

        Ok(self
            .commits
            .iter()
            .filter(|(_, message)| {
                if patterns.is_empty() {
                    return true;
                }
                let matched = patterns.iter().any(|p| message.contains(p));
                matched != invert
            })
            .take(limit)
            .map(|(sha, _)| sha.clone())
            .collect())
    }

    fn rev_parse(&self, rev: &str) -> Result<Option<CommitId>> {
        if let Some(sha) = self.revs.get(rev) {
            return Ok(Some(CommitId(sha.clone())));
        }
        if rev == "HEAD" {
            return Ok(self.commits.first().map(|(sha, _)| CommitId(sha.clone())));
        }
        Ok(self
            .commits
            .iter()
            .find(|(sha, _)| sha.starts_with(rev))
            .map(|(sha, _)| CommitId(sha.clone())))
    }

    fn config_bool(&self, key: &str) -> Result<Option<bool>> {
        Ok(self.config.lock().unwrap().get(key).copied())
    }
}

// ---------------------------------------------------------------------------
// FakeStatusApi
// ---------------------------------------------------------------------------

/// Scripted outcome for one ref.
#[derive(Debug, Clone)]
pub enum FakeResponse {
    Report(StatusReport),
    NotFound,
    Http(u16),
}

/// Status API answering from a map of ref -> response and counting calls.
///
/// Refs without a scripted response answer [`FakeResponse::NotFound`].
#[derive(Debug, Default)]
pub struct FakeStatusApi {
    responses: Mutex<HashMap<String, FakeResponse>>,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl FakeStatusApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_report(self, git_ref: &str, report: StatusReport) -> Self {
        self.set_response(git_ref, FakeResponse::Report(report));
        self
    }

    pub fn with_response(self, git_ref: &str, response: FakeResponse) -> Self {
        self.set_response(git_ref, response);
        self
    }

    /// Sleep for `delay` inside every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set_response(&self, git_ref: &str, response: FakeResponse) {
        self.responses
            .lock()
            .unwrap()
            .insert(git_ref.to_string(), response);
    }

    /// Number of `combined_status` calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatusApi for FakeStatusApi {
    async fn combined_status(
        &self,
        repo: &RepoSlug,
        git_ref: &GitRef,
    ) -> RemoteResult<StatusReport> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let url = format!("fake://{repo}/commits/{git_ref}/status");
        let response = self.responses.lock().unwrap().get(git_ref.as_str()).cloned();
        match response {
            Some(FakeResponse::Report(report)) => Ok(report),
            Some(FakeResponse::Http(status)) => Err(RemoteError::Http {
                status,
                url,
                body: "scripted failure".to_string(),
            }),
            Some(FakeResponse::NotFound) | None => Err(RemoteError::NotFound { url }),
        }
    }
}
