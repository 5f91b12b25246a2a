//! The surface the UI calls: status lookup, refresh and navigation.

use std::sync::Arc;

use tracing::debug;

use crate::aggregate::summarize;
use crate::cache::{CacheKey, FetchGuard, FsSnapshotStore, StatusCache};
use crate::config::{self, StatusConfig};
use crate::domain::{CommitId, DisplayState, GitRef, RepoSlug, StatusReport};
use crate::error::{Result, StatusError};
use crate::git::Vcs;
use crate::present::{select_url, Chooser, NavAction, NavTarget};
use crate::remote::StatusApi;
use crate::resolver::resolve_default_ref;
use crate::skip::most_recent_non_skip_commit;

/// Cache namespace of combined status reports.
pub const STATUS_NAMESPACE: &str = "ci-status";

const PROGRESS_LABEL: &str = "Checking CI status...";

/// CI status for one repository.
pub struct StatusService {
    vcs: Arc<dyn Vcs>,
    api: Arc<dyn StatusApi>,
    cache: StatusCache,
    repo: RepoSlug,
}

impl StatusService {
    pub fn new(
        vcs: Arc<dyn Vcs>,
        api: Arc<dyn StatusApi>,
        repo: RepoSlug,
        cache: StatusCache,
    ) -> Self {
        Self {
            vcs,
            api,
            cache,
            repo,
        }
    }

    /// Build a service for the repository behind `config.remote`.
    pub fn from_config(
        vcs: Arc<dyn Vcs>,
        api: Arc<dyn StatusApi>,
        config: &StatusConfig,
    ) -> Result<Self> {
        let url = vcs
            .remote_url(&config.remote)?
            .ok_or_else(|| StatusError::UnknownRepository {
                remote: config.remote.clone(),
                detail: "remote is not configured".to_string(),
            })?;
        let repo = RepoSlug::from_remote_url(&config.remote, &url)?;

        let mut cache = StatusCache::new(config.ttl).with_offline(config.offline);
        if let Some(dir) = &config.cache_dir {
            cache = cache.with_store(FsSnapshotStore::new(dir)?);
        }
        Ok(Self::new(vcs, api, repo, cache))
    }

    pub fn repo(&self) -> &RepoSlug {
        &self.repo
    }

    pub fn cache(&self) -> &StatusCache {
        &self.cache
    }

    /// Per-repository toggle, read fresh on every call.
    pub fn is_enabled(&self) -> Result<bool> {
        config::is_enabled(self.vcs.as_ref())
    }

    /// Ref to query: `explicit` resolved to a commit if given, otherwise the
    /// remote name of the current branch's push/upstream branch, otherwise
    /// the most recent commit not marked to skip CI.
    pub fn resolve_ref(&self, explicit: Option<&str>) -> Result<GitRef> {
        if let Some(rev) = explicit {
            return self
                .vcs
                .rev_parse(rev)?
                .map(GitRef::from)
                .ok_or_else(|| StatusError::UnknownRevision {
                    rev: rev.to_string(),
                });
        }

        match resolve_default_ref(self.vcs.as_ref(), None) {
            Err(err) if err.is_resolution_failure() => {
                match most_recent_non_skip_commit(self.vcs.as_ref())? {
                    Some(commit) => {
                        debug!(reason = %err, commit = %commit.short(), "falling back to last CI commit");
                        Ok(commit.into())
                    }
                    None => Err(err),
                }
            }
            other => other,
        }
    }

    /// Most recent commit without a skip marker.
    pub fn last_ci_commit(&self) -> Result<Option<CommitId>> {
        most_recent_non_skip_commit(self.vcs.as_ref())
    }

    fn cache_key(&self, git_ref: &GitRef) -> CacheKey {
        CacheKey::new(
            STATUS_NAMESPACE,
            [
                self.repo.owner.as_str(),
                self.repo.name.as_str(),
                git_ref.as_str(),
            ],
        )
    }

    async fn lookup(&self, git_ref: &GitRef, ignore_offline: bool) -> Result<Option<StatusReport>> {
        if !self.is_enabled()? {
            debug!(repo = %self.repo, "CI status disabled for repository");
            return Ok(None);
        }

        let guard = FetchGuard {
            rebase_in_progress: self.vcs.is_rebase_in_progress(),
            ignore_offline,
        };
        let key = self.cache_key(git_ref);
        let api = Arc::clone(&self.api);
        let repo = self.repo.clone();
        let git_ref = git_ref.clone();
        self.cache
            .get_or_fetch(
                &key,
                guard,
                || async move { api.combined_status(&repo, &git_ref).await },
                PROGRESS_LABEL,
            )
            .await
    }

    /// Combined status for `git_ref`, from cache when fresh.
    ///
    /// `Ok(None)` means no report could be produced: the feature is disabled,
    /// a rebase is in progress, or offline mode is on.
    pub async fn get_status(&self, git_ref: &GitRef) -> Result<Option<StatusReport>> {
        self.lookup(git_ref, false).await
    }

    /// Drop cached reports and fetch `git_ref` again.
    ///
    /// `force_even_if_suppressed` lifts offline mode for this fetch; the
    /// rebase guard still applies.
    pub async fn refresh(
        &self,
        git_ref: &GitRef,
        force_even_if_suppressed: bool,
    ) -> Result<Option<StatusReport>> {
        self.cache.invalidate(STATUS_NAMESPACE);
        self.lookup(git_ref, force_even_if_suppressed).await
    }

    /// Status of `git_ref` reduced for display.
    pub async fn display(&self, git_ref: &GitRef) -> Result<Option<DisplayState>> {
        Ok(self.get_status(git_ref).await?.as_ref().map(summarize))
    }

    /// Resolve the URL to open for `target`.
    pub async fn navigate(&self, target: &NavTarget, chooser: &dyn Chooser) -> Result<NavAction> {
        match target {
            NavTarget::Url(url) => Ok(NavAction::Open(url.clone())),
            NavTarget::Ref(git_ref) => match self.get_status(git_ref).await? {
                Some(report) => select_url(&report, chooser),
                None => Ok(NavAction::Suppressed),
            },
        }
    }
}
