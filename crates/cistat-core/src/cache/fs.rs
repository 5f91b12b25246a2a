//! On-disk tier of the status cache.
//!
//! Snapshots outlive the process so a fresh `cistat` run can reuse a report
//! fetched moments ago. Each snapshot records when it was written and the
//! namespace epoch it was written under.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use super::CacheKey;
use crate::domain::StatusReport;
use crate::error::Result;

/// On-disk form of one cached report.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Snapshot {
    key: CacheKey,
    created_at: DateTime<Utc>,
    #[serde(default)]
    epoch: u64,
    report: StatusReport,
}

/// A snapshot that was still within its TTL when loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedSnapshot {
    pub report: StatusReport,
    /// Time since the snapshot was written.
    pub age: Duration,
}

/// Filesystem-backed report snapshots, one JSON file per key.
///
/// Layout: `<root>/<namespace>/<sha256 of key>.json`
#[derive(Debug, Clone)]
pub struct FsSnapshotStore {
    root: PathBuf,
}

impl FsSnapshotStore {
    /// Create a store rooted at `root`, creating the directory if needed.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn namespace_dir(&self, namespace: &str) -> PathBuf {
        let safe: String = namespace
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.root.join(safe)
    }

    fn snapshot_path(&self, key: &CacheKey) -> PathBuf {
        self.namespace_dir(&key.namespace)
            .join(format!("{}.json", key.digest()))
    }

    /// Load the report for `key` if it was written less than `ttl` ago under
    /// namespace epoch `epoch` or later.
    pub fn load(&self, key: &CacheKey, ttl: Duration, epoch: u64) -> Result<Option<LoadedSnapshot>> {
        let bytes = match fs::read(self.snapshot_path(key)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let snapshot: Snapshot = serde_json::from_slice(&bytes)?;
        if snapshot.key != *key || snapshot.epoch < epoch {
            return Ok(None);
        }

        // Written "in the future" (clock skew) counts as expired.
        let age = match Utc::now().signed_duration_since(snapshot.created_at).to_std() {
            Ok(age) if age < ttl => age,
            _ => return Ok(None),
        };
        Ok(Some(LoadedSnapshot {
            report: snapshot.report,
            age,
        }))
    }

    /// Write the report for `key`, replacing any previous snapshot.
    pub fn save(&self, key: &CacheKey, report: &StatusReport, epoch: u64) -> Result<()> {
        self.save_at(key, report, epoch, Utc::now())
    }

    pub(crate) fn save_at(
        &self,
        key: &CacheKey,
        report: &StatusReport,
        epoch: u64,
        created_at: DateTime<Utc>,
    ) -> Result<()> {
        let path = self.snapshot_path(key);
        let dir = self.namespace_dir(&key.namespace);
        fs::create_dir_all(&dir)?;

        let snapshot = Snapshot {
            key: key.clone(),
            created_at,
            epoch,
            report: report.clone(),
        };
        let json = serde_json::to_vec_pretty(&snapshot)?;

        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(&json)?;
        tmp.persist(&path).map_err(|e| e.error)?;
        Ok(())
    }

    /// Remove every snapshot in `namespace`. No-op if none exist.
    pub fn clear_namespace(&self, namespace: &str) -> Result<()> {
        match fs::remove_dir_all(self.namespace_dir(namespace)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
