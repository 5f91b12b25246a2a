//! Error taxonomy for status resolution and fetching.

use thiserror::Error;

/// Failures reported by a [`StatusApi`](crate::remote::StatusApi) implementation.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The remote has no knowledge of the requested ref (HTTP 404).
    #[error("ref not found on remote: {url}")]
    NotFound { url: String },

    /// Any other non-success HTTP response, including auth failures.
    #[error("remote returned HTTP {status} for {url}: {body}")]
    Http {
        status: u16,
        url: String,
        body: String,
    },

    /// The configured API base URL cannot be used to build request URLs.
    #[error("invalid API URL {url}: {detail}")]
    InvalidUrl { url: String, detail: String },

    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The response body was not a combined-status payload.
    #[error("could not decode status payload: {0}")]
    Decode(String),
}

impl RemoteError {
    /// Whether this is the "ref unknown to the remote" outcome.
    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteError::NotFound { .. })
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RemoteError::Decode(err.to_string())
        } else {
            RemoteError::Transport(err.to_string())
        }
    }
}

/// Errors surfaced to callers of the status core.
#[derive(Debug, Error)]
pub enum StatusError {
    #[error("no branch is checked out")]
    NoCurrentBranch,

    #[error("branch {branch} has no push or upstream tracking branch")]
    NoTrackingBranch { branch: String },

    #[error("unknown revision: {rev}")]
    UnknownRevision { rev: String },

    #[error("malformed remote branch name: {raw:?}")]
    MalformedRemoteBranch { raw: String },

    #[error("cannot determine owner/name from remote {remote}: {detail}")]
    UnknownRepository { remote: String, detail: String },

    #[error("no usable URL for status {context}")]
    NoUsableUrl { context: String },

    #[error("git error: {0}")]
    Git(String),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl StatusError {
    /// Ref resolution failures that a caller may recover from by trying
    /// another ref source.
    pub fn is_resolution_failure(&self) -> bool {
        matches!(
            self,
            StatusError::NoCurrentBranch | StatusError::NoTrackingBranch { .. }
        )
    }
}

/// Result type for status operations.
pub type Result<T> = std::result::Result<T, StatusError>;
