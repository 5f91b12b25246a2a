//! TTL-bounded, single-flight cache in front of the remote status fetch.
//!
//! Each key owns an async mutex that is held for the whole lookup, so
//! concurrent callers for one key queue behind a single fetch and then read
//! its result. Invalidation bumps a per-namespace epoch; entries stored under
//! an older epoch are never fresh again.
//!
//! With a [`FsSnapshotStore`] attached, a key seen for the first time in this
//! process is looked up on disk before fetching. A snapshot keeps the
//! remaining part of its TTL, not a new one.

pub mod fs;

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::time::Instant;
use tracing::warn;

use crate::domain::StatusReport;
use crate::error::Result;
use crate::metrics::METRICS;
use crate::obs;
use crate::remote::RemoteResult;

pub use fs::{FsSnapshotStore, LoadedSnapshot};

/// Slot count at which idle, expired slots are dropped before adding a new one.
const SLOT_PRUNE_THRESHOLD: usize = 256;

/// Cache key: a namespace plus the parameters that discriminate the query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub namespace: String,
    pub params: Vec<String>,
}

impl CacheKey {
    pub fn new<I, S>(namespace: &str, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            namespace: namespace.to_string(),
            params: params.into_iter().map(Into::into).collect(),
        }
    }

    /// SHA-256 hex digest of the key, stable across processes.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.namespace.as_bytes());
        for param in &self.params {
            hasher.update([0u8]);
            hasher.update(param.as_bytes());
        }
        hex::encode(hasher.finalize())
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.namespace)?;
        for param in &self.params {
            write!(f, ":{param}")?;
        }
        Ok(())
    }
}

/// Conditions read before each fetch attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchGuard {
    /// A rebase is running; never fetch.
    pub rebase_in_progress: bool,
    /// Fetch even when the cache is in offline mode.
    pub ignore_offline: bool,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    report: StatusReport,
    expires_at: Instant,
    epoch: u64,
}

#[derive(Debug, Default)]
struct Slot {
    entry: Option<CacheEntry>,
}

/// Keyed report cache with TTL, single-flight fetches and offline mode.
pub struct StatusCache {
    ttl: Duration,
    offline: AtomicBool,
    slots: Mutex<HashMap<CacheKey, Arc<tokio::sync::Mutex<Slot>>>>,
    epochs: Mutex<HashMap<String, u64>>,
    store: Option<FsSnapshotStore>,
}

impl StatusCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            offline: AtomicBool::new(false),
            slots: Mutex::new(HashMap::new()),
            epochs: Mutex::new(HashMap::new()),
            store: None,
        }
    }

    /// Persist fetched reports to `store` and consult it on memory misses.
    pub fn with_store(mut self, store: FsSnapshotStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_offline(self, offline: bool) -> Self {
        self.set_offline(offline);
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn is_offline(&self) -> bool {
        self.offline.load(Ordering::SeqCst)
    }

    fn slot(&self, key: &CacheKey) -> Arc<tokio::sync::Mutex<Slot>> {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(slot) = slots.get(key) {
            return Arc::clone(slot);
        }
        if slots.len() >= SLOT_PRUNE_THRESHOLD {
            prune_idle_slots(&mut slots);
        }
        Arc::clone(slots.entry(key.clone()).or_default())
    }

    #[cfg(test)]
    fn slot_count(&self) -> usize {
        self.slots.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn epoch(&self, namespace: &str) -> u64 {
        let epochs = self.epochs.lock().unwrap_or_else(|e| e.into_inner());
        epochs.get(namespace).copied().unwrap_or(0)
    }

    fn is_fresh(&self, entry: &CacheEntry, epoch: u64) -> bool {
        entry.epoch == epoch && Instant::now() < entry.expires_at
    }

    /// Return the cached report for `key`, or run `fetch_fn` once to get it.
    ///
    /// Returns `Ok(None)` without fetching when the guard or offline mode
    /// blocks the fetch; a cached entry is left as it was. A not-found
    /// outcome is stored and returned as [`StatusReport::not_found`]. Other
    /// fetch errors are returned and nothing is stored.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        key: &CacheKey,
        guard: FetchGuard,
        fetch_fn: F,
        progress_label: &str,
    ) -> Result<Option<StatusReport>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = RemoteResult<StatusReport>>,
    {
        let slot = self.slot(key);
        let mut slot = slot.lock().await;
        let epoch = self.epoch(&key.namespace);

        if let Some(entry) = slot.entry.as_ref().filter(|e| self.is_fresh(e, epoch)) {
            obs::emit_cache_hit(key);
            METRICS.inc_cache_hits();
            return Ok(Some(entry.report.clone()));
        }

        // Disk is only consulted for keys this process has not stored yet.
        if slot.entry.is_none() {
            if let Some(LoadedSnapshot { report, age }) = self.load_snapshot(key, epoch) {
                obs::emit_cache_hit(key);
                METRICS.inc_cache_hits();
                slot.entry = Some(CacheEntry {
                    report: report.clone(),
                    expires_at: Instant::now() + self.ttl.saturating_sub(age),
                    epoch,
                });
                return Ok(Some(report));
            }
        }

        if guard.rebase_in_progress {
            obs::emit_suppressed(key, "rebase in progress");
            METRICS.inc_suppressed();
            return Ok(None);
        }
        if self.is_offline() && !guard.ignore_offline {
            obs::emit_suppressed(key, "offline mode");
            METRICS.inc_suppressed();
            return Ok(None);
        }

        obs::emit_fetch_started(key, progress_label);
        METRICS.inc_remote_fetches();
        let started = Instant::now();
        let report = match fetch_fn().await {
            Ok(report) => report,
            Err(err) if err.is_not_found() => {
                obs::emit_not_found(key);
                METRICS.inc_not_found();
                StatusReport::not_found()
            }
            Err(err) => {
                obs::emit_fetch_failed(key, &err);
                return Err(err.into());
            }
        };
        obs::emit_fetched(
            key,
            report.total_count,
            report.state.as_deref(),
            started.elapsed().as_millis() as u64,
        );

        // Stored under the epoch the fetch started in: if an invalidation
        // landed meanwhile, the entry is already stale and stays off disk.
        slot.entry = Some(CacheEntry {
            report: report.clone(),
            expires_at: Instant::now() + self.ttl,
            epoch,
        });
        if self.epoch(&key.namespace) == epoch {
            self.save_snapshot(key, &report, epoch);
        }
        Ok(Some(report))
    }

    /// Make every entry in `namespace` stale so the next lookup fetches.
    ///
    /// Snapshots on disk are removed too; any that survive a failed removal
    /// carry the old epoch and are no longer loaded.
    pub fn invalidate(&self, namespace: &str) {
        {
            let mut epochs = self.epochs.lock().unwrap_or_else(|e| e.into_inner());
            *epochs.entry(namespace.to_string()).or_insert(0) += 1;
        }
        if let Some(store) = &self.store {
            if let Err(err) = store.clear_namespace(namespace) {
                warn!(namespace = %namespace, error = %err, "failed to clear report snapshots");
            }
        }
    }

    /// The last report stored for `key`, fresh or not.
    pub async fn peek(&self, key: &CacheKey) -> Option<StatusReport> {
        let slot = self.slot(key);
        let slot = slot.lock().await;
        slot.entry.as_ref().map(|e| e.report.clone())
    }

    fn load_snapshot(&self, key: &CacheKey, epoch: u64) -> Option<LoadedSnapshot> {
        let store = self.store.as_ref()?;
        match store.load(key, self.ttl, epoch) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(key = %key, error = %err, "ignoring unreadable report snapshot");
                None
            }
        }
    }

    fn save_snapshot(&self, key: &CacheKey, report: &StatusReport, epoch: u64) {
        if let Some(store) = &self.store {
            if let Err(err) = store.save(key, report, epoch) {
                warn!(key = %key, error = %err, "failed to write report snapshot");
            }
        }
    }
}

/// Drop slots nobody is waiting on whose entry is missing or expired.
fn prune_idle_slots(slots: &mut HashMap<CacheKey, Arc<tokio::sync::Mutex<Slot>>>) {
    let now = Instant::now();
    slots.retain(|_, slot| {
        if Arc::strong_count(slot) > 1 {
            return true;
        }
        match slot.try_lock() {
            Ok(guard) => guard.entry.as_ref().is_some_and(|e| now < e.expires_at),
            Err(_) => true,
        }
    });
}
