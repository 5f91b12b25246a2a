//! Maps a local branch to the ref that should be queried on the remote.

use tracing::debug;

use crate::domain::{GitRef, RemoteBranch};
use crate::error::{Result, StatusError};
use crate::git::Vcs;

/// Resolve the ref to query for `branch` (or the current branch).
///
/// Uses the push branch, falling back to the upstream, and returns its name
/// as the remote knows it: local `feature/x` tracking `origin/fx` yields `fx`.
pub fn resolve_default_ref(vcs: &dyn Vcs, branch: Option<&str>) -> Result<GitRef> {
    let branch = match branch {
        Some(b) => b.to_string(),
        None => vcs.current_branch()?.ok_or(StatusError::NoCurrentBranch)?,
    };

    let tracking = vcs
        .push_tracking_branch(&branch)?
        .ok_or_else(|| StatusError::NoTrackingBranch {
            branch: branch.clone(),
        })?;

    let remote_branch = RemoteBranch::parse(&tracking, &vcs.remotes()?)?;
    debug!(
        branch = %branch,
        tracking = %remote_branch,
        "resolved default ref"
    );
    Ok(GitRef::new(remote_branch.short_name))
}
