//! Remote status API.
//!
//! One operation: the combined status of a ref in `owner/name`. A 404 is
//! reported as [`RemoteError::NotFound`] so the cache can translate it.

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use tracing::debug;

use crate::config::StatusConfig;
use crate::domain::{GitRef, RepoSlug, StatusReport};
use crate::error::RemoteError;

/// Result type for remote calls.
pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// Source of combined status reports.
#[async_trait]
pub trait StatusApi: Send + Sync {
    async fn combined_status(&self, repo: &RepoSlug, git_ref: &GitRef)
        -> RemoteResult<StatusReport>;
}

/// GitHub-compatible combined status client.
pub struct GithubStatusClient {
    base_url: Url,
    token: Option<String>,
    http: reqwest::Client,
}

impl GithubStatusClient {
    pub fn new(base_url: &str, token: Option<String>) -> RemoteResult<Self> {
        let parsed = Url::parse(base_url).map_err(|e| RemoteError::InvalidUrl {
            url: base_url.to_string(),
            detail: e.to_string(),
        })?;
        if parsed.cannot_be_a_base() {
            return Err(RemoteError::InvalidUrl {
                url: base_url.to_string(),
                detail: "URL cannot carry a path".to_string(),
            });
        }

        let http = reqwest::Client::builder()
            .user_agent(concat!("cistat/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            base_url: parsed,
            token,
            http,
        })
    }

    pub fn from_config(config: &StatusConfig) -> RemoteResult<Self> {
        Self::new(&config.api_base_url, config.token.clone())
    }

    /// Endpoint for the combined status of `git_ref`.
    ///
    /// Each `/`-separated part of the ref becomes its own path segment and is
    /// percent-encoded as one.
    pub fn status_url(&self, repo: &RepoSlug, git_ref: &GitRef) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["repos", repo.owner.as_str(), repo.name.as_str(), "commits"])
                .extend(git_ref.as_str().split('/'))
                .push("status");
        }
        url
    }
}

#[async_trait]
impl StatusApi for GithubStatusClient {
    async fn combined_status(
        &self,
        repo: &RepoSlug,
        git_ref: &GitRef,
    ) -> RemoteResult<StatusReport> {
        let url = self.status_url(repo, git_ref);
        debug!(url = %url, "requesting combined status");

        let mut request = self
            .http
            .get(url.clone())
            .query(&[("per_page", "100")])
            .header(reqwest::header::ACCEPT, "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(RemoteError::NotFound {
                url: url.to_string(),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::Http {
                status: status.as_u16(),
                url: url.to_string(),
                body,
            });
        }

        Ok(response.json::<StatusReport>().await?)
    }
}
