//! Structured events for the status fetch lifecycle.
//!
//! Every event carries an `event` field (`status.*`) plus the cache key
//! parts it concerns, so logs can be filtered per ref.

use tracing::{debug, info, warn};

use crate::cache::CacheKey;

/// A fetch for `key` is about to hit the remote.
pub fn emit_fetch_started(key: &CacheKey, progress_label: &str) {
    info!(
        event = "status.fetch_started",
        namespace = %key.namespace,
        key = %key,
        "{progress_label}"
    );
}

/// A fetch completed.
pub fn emit_fetched(key: &CacheKey, total_count: usize, state: Option<&str>, duration_ms: u64) {
    info!(
        event = "status.fetched",
        key = %key,
        total_count = total_count,
        state = state.unwrap_or("none"),
        duration_ms = duration_ms,
    );
}

/// A fresh entry answered the request.
pub fn emit_cache_hit(key: &CacheKey) {
    debug!(event = "status.cache_hit", key = %key);
}

/// A fetch was skipped by the rebase guard or offline mode.
pub fn emit_suppressed(key: &CacheKey, reason: &str) {
    info!(
        event = "status.suppressed",
        key = %key,
        reason = reason,
        "not checking CI status: {reason}"
    );
}

/// The remote did not know the ref; a synthetic report was substituted.
pub fn emit_not_found(key: &CacheKey) {
    info!(event = "status.not_found", key = %key);
}

/// A fetch failed and the error is being propagated.
pub fn emit_fetch_failed(key: &CacheKey, error: &dyn std::fmt::Display) {
    warn!(event = "status.fetch_failed", key = %key, error = %error);
}
