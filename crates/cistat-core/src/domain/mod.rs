//! Domain models for CI status.
//!
//! - `StatusEntry` / `StatusReport`: what the remote reports for a ref
//! - `StateSpec`: the static state -> label/style table
//! - `GitRef`, `CommitId`, `RemoteBranch`, `RepoSlug`: identifiers

pub mod refs;
pub mod status;

pub use refs::{CommitId, GitRef, RemoteBranch, RepoSlug};
pub use status::{
    state_spec, DisplayState, StateSpec, StatusEntry, StatusReport, StatusState, StyleTag,
    NOT_FOUND_MESSAGE, NO_CHECKS_MESSAGE, UNKNOWN_SPEC,
};
