//! Global atomic counters for status fetching.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. before a CLI command exits).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters, no allocations and no locking.
pub struct Metrics {
    remote_fetches: AtomicU64,
    cache_hits: AtomicU64,
    suppressed_fetches: AtomicU64,
    not_found: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            remote_fetches: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            suppressed_fetches: AtomicU64::new(0),
            not_found: AtomicU64::new(0),
        }
    }

    pub fn inc_remote_fetches(&self) {
        self.remote_fetches.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "remote_fetches", "counter incremented");
    }

    pub fn inc_cache_hits(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "cache_hits", "counter incremented");
    }

    pub fn inc_suppressed(&self) {
        self.suppressed_fetches.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "suppressed_fetches", "counter incremented");
    }

    pub fn inc_not_found(&self) {
        self.not_found.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "not_found", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            remote_fetches = self.remote_fetches(),
            cache_hits = self.cache_hits(),
            suppressed_fetches = self.suppressed_fetches(),
            not_found = self.not_found(),
        );
    }

    pub fn remote_fetches(&self) -> u64 {
        self.remote_fetches.load(Ordering::Relaxed)
    }

    pub fn cache_hits(&self) -> u64 {
        self.cache_hits.load(Ordering::Relaxed)
    }

    pub fn suppressed_fetches(&self) -> u64 {
        self.suppressed_fetches.load(Ordering::Relaxed)
    }

    pub fn not_found(&self) -> u64 {
        self.not_found.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        self.remote_fetches.store(0, Ordering::Relaxed);
        self.cache_hits.store(0, Ordering::Relaxed);
        self.suppressed_fetches.store(0, Ordering::Relaxed);
        self.not_found.store(0, Ordering::Relaxed);
    }
}
