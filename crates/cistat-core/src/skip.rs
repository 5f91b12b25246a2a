//! Finds the most recent commit that CI was not told to skip.
//!
//! Only the commit message is inspected, and git does the matching: the scan
//! asks `git log` for the first commit whose message contains none of the
//! markers, so only one commit id is ever read back. The commit found here is
//! not checked against the remote, so a local-only commit can be reported
//! even though no CI status exists for it yet.

use tracing::debug;

use crate::domain::CommitId;
use crate::error::Result;
use crate::git::Vcs;

/// Commit-message markers that tell CI services to skip a commit.
pub const SKIP_MARKERS: [&str; 2] = ["[ci skip]", "[skip ci]"];

/// `git log` arguments selecting the newest commit reachable from HEAD whose
/// message contains none of the [`SKIP_MARKERS`] (literal, case-sensitive).
pub fn non_skip_log_args() -> Vec<String> {
    let mut args = vec![
        "-n1".to_string(),
        "--invert-grep".to_string(),
        "--fixed-strings".to_string(),
    ];
    args.extend(SKIP_MARKERS.iter().map(|marker| format!("--grep={marker}")));
    args.push("--format=%H".to_string());
    args.push("HEAD".to_string());
    args
}

/// Walk history from HEAD and return the newest commit without a skip
/// marker, or `None` if every commit carries one.
pub fn most_recent_non_skip_commit(vcs: &dyn Vcs) -> Result<Option<CommitId>> {
    let args = non_skip_log_args();
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    let found = vcs
        .log_lines(&args)?
        .into_iter()
        .map(|line| line.trim().to_string())
        .find(|line| !line.is_empty())
        .map(CommitId);

    debug!(commit = ?found.as_ref().map(CommitId::short), "scanned for non-skip commit");
    Ok(found)
}
