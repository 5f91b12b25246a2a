//! cistat core library
//!
//! Resolves which ref to ask the code-hosting service about, fetches its
//! combined CI status through a single-flight TTL cache, and reduces the
//! result to display text.

pub mod aggregate;
pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod fakes;
pub mod git;
pub mod metrics;
pub mod obs;
pub mod present;
pub mod remote;
pub mod resolver;
pub mod service;
pub mod skip;
pub mod telemetry;

pub use aggregate::summarize;
pub use cache::{CacheKey, FetchGuard, FsSnapshotStore, LoadedSnapshot, StatusCache};
pub use config::{is_enabled, StatusConfig, ENABLED_KEY};
pub use domain::{
    state_spec, CommitId, DisplayState, GitRef, RemoteBranch, RepoSlug, StateSpec, StatusEntry,
    StatusReport, StatusState, StyleTag, NOT_FOUND_MESSAGE, NO_CHECKS_MESSAGE, UNKNOWN_SPEC,
};
pub use error::{RemoteError, Result, StatusError};
pub use git::{is_git_repo, GitCli, Vcs};
pub use metrics::METRICS;
pub use present::{choice_label, entry_label, format_entry, select_url, Chooser, NavAction, NavTarget};
pub use remote::{GithubStatusClient, RemoteResult, StatusApi};
pub use resolver::resolve_default_ref;
pub use service::{StatusService, STATUS_NAMESPACE};
pub use skip::{most_recent_non_skip_commit, non_skip_log_args, SKIP_MARKERS};
pub use telemetry::init_tracing;

/// cistat version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
