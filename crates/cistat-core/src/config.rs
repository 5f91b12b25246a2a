//! Runtime configuration.
//!
//! Process-level settings come from the environment; whether the feature is
//! enabled for a repository is the git config boolean [`ENABLED_KEY`], read
//! through the [`Vcs`] collaborator on every decision.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::git::Vcs;

/// Git config key of the per-repository toggle. Unset means enabled.
pub const ENABLED_KEY: &str = "cistat.enabled";

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_TTL_SECS: u64 = 60;
pub const DEFAULT_REMOTE: &str = "origin";

/// Status core configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusConfig {
    /// Base URL of the remote status API.
    pub api_base_url: String,
    /// API token (optional for public repositories).
    pub token: Option<String>,
    /// Lifetime of cached reports.
    pub ttl: Duration,
    /// Start in offline mode: no fetches unless explicitly forced.
    pub offline: bool,
    /// Directory for on-disk report snapshots; `None` keeps the cache in memory.
    pub cache_dir: Option<PathBuf>,
    /// Remote whose URL identifies the repository on the hosting service.
    pub remote: String,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            token: None,
            ttl: Duration::from_secs(DEFAULT_TTL_SECS),
            offline: false,
            cache_dir: None,
            remote: DEFAULT_REMOTE.to_string(),
        }
    }
}

impl StatusConfig {
    /// Read configuration from `CISTAT_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let ttl = lookup("CISTAT_CACHE_TTL_SECS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.ttl);

        Self {
            api_base_url: lookup("CISTAT_API_URL").unwrap_or(defaults.api_base_url),
            token: lookup("CISTAT_TOKEN")
                .or_else(|| lookup("GITHUB_TOKEN"))
                .filter(|t| !t.is_empty()),
            ttl,
            offline: lookup("CISTAT_OFFLINE")
                .map(|v| is_truthy(&v))
                .unwrap_or(false),
            cache_dir: lookup("CISTAT_CACHE_DIR")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            remote: lookup("CISTAT_REMOTE").unwrap_or(defaults.remote),
        }
    }

    pub fn with_api_base_url(mut self, url: &str) -> Self {
        self.api_base_url = url.to_string();
        self
    }

    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    pub fn with_remote(mut self, remote: &str) -> Self {
        self.remote = remote.to_string();
        self
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Whether the feature is enabled for the repository behind `vcs`.
pub fn is_enabled(vcs: &dyn Vcs) -> Result<bool> {
    Ok(vcs.config_bool(ENABLED_KEY)?.unwrap_or(true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::FakeVcs;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_environment_is_empty() {
        let config = StatusConfig::from_lookup(lookup(&[]));
        assert_eq!(config.api_base_url, DEFAULT_API_URL);
        assert_eq!(config.ttl, Duration::from_secs(DEFAULT_TTL_SECS));
        assert!(!config.offline);
        assert!(config.token.is_none());
        assert!(config.cache_dir.is_none());
        assert_eq!(config.remote, "origin");
    }

    #[test]
    fn test_environment_overrides() {
        let config = StatusConfig::from_lookup(lookup(&[
            ("CISTAT_API_URL", "https://ghe.example.com/api/v3"),
            ("GITHUB_TOKEN", "gh-token"),
            ("CISTAT_CACHE_TTL_SECS", "5"),
            ("CISTAT_OFFLINE", "TRUE"),
            ("CISTAT_CACHE_DIR", "/tmp/cistat"),
            ("CISTAT_REMOTE", "upstream"),
        ]));
        assert_eq!(config.api_base_url, "https://ghe.example.com/api/v3");
        assert_eq!(config.token.as_deref(), Some("gh-token"));
        assert_eq!(config.ttl, Duration::from_secs(5));
        assert!(config.offline);
        assert_eq!(config.cache_dir, Some(PathBuf::from("/tmp/cistat")));
        assert_eq!(config.remote, "upstream");
    }

    #[test]
    fn test_cistat_token_wins_over_github_token() {
        let config = StatusConfig::from_lookup(lookup(&[
            ("CISTAT_TOKEN", "own"),
            ("GITHUB_TOKEN", "shared"),
        ]));
        assert_eq!(config.token.as_deref(), Some("own"));
    }

    #[test]
    fn test_invalid_ttl_keeps_default() {
        let config = StatusConfig::from_lookup(lookup(&[("CISTAT_CACHE_TTL_SECS", "soon")]));
        assert_eq!(config.ttl, Duration::from_secs(DEFAULT_TTL_SECS));
    }

    #[test]
    fn test_toggle_defaults_to_enabled() {
        assert!(is_enabled(&FakeVcs::new()).unwrap());
        assert!(!is_enabled(&FakeVcs::new().with_config(ENABLED_KEY, false)).unwrap());
    }
}
