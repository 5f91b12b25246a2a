//! Version-control collaborator.
//!
//! The status core only ever talks to git through the [`Vcs`] trait;
//! [`GitCli`] implements it by shelling out to the `git` binary.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use crate::domain::CommitId;
use crate::error::{Result, StatusError};

/// Read-only view of the local repository.
pub trait Vcs: Send + Sync {
    /// Currently checked-out branch, `None` when HEAD is detached.
    fn current_branch(&self) -> Result<Option<String>>;

    /// Push branch of `branch` (falling back to its upstream) in
    /// `remote/name` form, `None` when neither is configured.
    fn push_tracking_branch(&self, branch: &str) -> Result<Option<String>>;

    /// Names of the configured remotes.
    fn remotes(&self) -> Result<Vec<String>>;

    /// Fetch URL of `remote`, `None` if the remote does not exist.
    fn remote_url(&self, remote: &str) -> Result<Option<String>>;

    /// Whether a rebase is currently in progress.
    fn is_rebase_in_progress(&self) -> bool;

    /// Output lines of `git log <args>`.
    fn log_lines(&self, args: &[&str]) -> Result<Vec<String>>;

    /// Resolve a revision to a commit id, `None` if it does not resolve.
    fn rev_parse(&self, rev: &str) -> Result<Option<CommitId>>;

    /// Boolean git config value, `None` if unset.
    fn config_bool(&self, key: &str) -> Result<Option<bool>>;
}

/// [`Vcs`] backed by the `git` command-line tool.
#[derive(Debug, Clone)]
pub struct GitCli {
    repo_dir: PathBuf,
}

impl GitCli {
    pub fn new(repo_dir: impl AsRef<Path>) -> Self {
        Self {
            repo_dir: repo_dir.as_ref().to_path_buf(),
        }
    }

    pub fn repo_dir(&self) -> &Path {
        &self.repo_dir
    }

    fn run(&self, args: &[&str]) -> Result<Output> {
        Command::new("git")
            .args(args)
            .current_dir(&self.repo_dir)
            .output()
            .map_err(|e| StatusError::Git(format!("failed to run git: {e}")))
    }

    /// Trimmed stdout, or `None` if git exited non-zero.
    fn stdout_if_success(&self, args: &[&str]) -> Result<Option<String>> {
        let output = self.run(args)?;
        if !output.status.success() {
            return Ok(None);
        }
        let out = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok(Some(out).filter(|s| !s.is_empty()))
    }

    fn git_path_exists(&self, name: &str) -> bool {
        match self.stdout_if_success(&["rev-parse", "--git-path", name]) {
            Ok(Some(path)) => self.repo_dir.join(path).exists(),
            _ => false,
        }
    }
}

impl Vcs for GitCli {
    fn current_branch(&self) -> Result<Option<String>> {
        self.stdout_if_success(&["symbolic-ref", "--short", "-q", "HEAD"])
    }

    fn push_tracking_branch(&self, branch: &str) -> Result<Option<String>> {
        for suffix in ["push", "upstream"] {
            let spec = format!("{branch}@{{{suffix}}}");
            if let Some(name) =
                self.stdout_if_success(&["rev-parse", "--abbrev-ref", "--symbolic-full-name", &spec])?
            {
                return Ok(Some(name));
            }
        }
        Ok(None)
    }

    fn remotes(&self) -> Result<Vec<String>> {
        Ok(self
            .stdout_if_success(&["remote"])?
            .map(|out| out.lines().map(str::to_string).collect())
            .unwrap_or_default())
    }

    fn remote_url(&self, remote: &str) -> Result<Option<String>> {
        self.stdout_if_success(&["remote", "get-url", remote])
    }

    fn is_rebase_in_progress(&self) -> bool {
        self.git_path_exists("rebase-merge") || self.git_path_exists("rebase-apply")
    }

    fn log_lines(&self, args: &[&str]) -> Result<Vec<String>> {
        let mut full = vec!["log"];
        full.extend_from_slice(args);
        let output = self.run(&full)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(StatusError::Git(format!("git log failed: {stderr}")));
        }
        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::to_string)
            .collect())
    }

    fn rev_parse(&self, rev: &str) -> Result<Option<CommitId>> {
        let spec = format!("{rev}^{{commit}}");
        Ok(self
            .stdout_if_success(&["rev-parse", "--verify", "--quiet", &spec])?
            .map(CommitId))
    }

    fn config_bool(&self, key: &str) -> Result<Option<bool>> {
        Ok(self
            .stdout_if_success(&["config", "--bool", "--get", key])?
            .map(|v| v == "true"))
    }
}

/// Check whether a directory is inside a git work tree.
pub fn is_git_repo(dir: &Path) -> bool {
    Command::new("git")
        .args(["rev-parse", "--is-inside-work-tree"])
        .current_dir(dir)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}
