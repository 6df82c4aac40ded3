//! In-process key-value store with expiry and an optional JSON snapshot
//!
//! Entries live in a `DashMap`. When opened with a path, every mutation
//! rewrites the compact JSON snapshot file (temp file + rename), so the
//! store survives restarts. `set_many` and `delete` flush once per call. Expired entries are dropped lazily on read and skipped by
//! scans; `purge_expired` removes them eagerly.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use hoard_core::error::HoardError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::fs as async_fs;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{KvStore, ScanPage};
use crate::StoreResult;

/// Scan cursors kept open at once; older ones are forgotten
const MAX_OPEN_CURSORS: u64 = 1024;

/// Stored value and its expiry (unix millis)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct KvEntry {
    value: String,
    expires_at: Option<i64>,
}

impl KvEntry {
    fn is_live(&self, now: i64) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

/// Local expiring key-value store
#[derive(Debug)]
pub struct LocalKv {
    entries: DashMap<String, KvEntry>,
    /// Open scan cursors mapped to the last key they returned
    cursors: DashMap<u64, String>,
    next_cursor: AtomicU64,
    snapshot_path: Option<PathBuf>,
    flush_lock: Mutex<()>,
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Absolute expiry for a TTL, clamped instead of wrapping
fn expiry_for(ttl: Option<Duration>) -> Option<i64> {
    ttl.map(|ttl| {
        let millis = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        now_millis().saturating_add(millis)
    })
}

impl LocalKv {
    /// Volatile store, mainly for tests
    pub fn in_memory() -> Self {
        Self {
            entries: DashMap::new(),
            cursors: DashMap::new(),
            next_cursor: AtomicU64::new(1),
            snapshot_path: None,
            flush_lock: Mutex::new(()),
        }
    }

    /// Open a store backed by a snapshot file, loading it if present
    pub async fn open<P: AsRef<Path>>(snapshot_path: P) -> StoreResult<Self> {
        let snapshot_path = snapshot_path.as_ref().to_path_buf();
        let mut store = Self::in_memory();

        if let Some(parent) = snapshot_path.parent() {
            if !parent.as_os_str().is_empty() {
                async_fs::create_dir_all(parent).await.map_err(|e| {
                    HoardError::persistence(
                        format!("Failed to create records directory {}", parent.display()),
                        e,
                    )
                })?;
            }
        }

        if async_fs::try_exists(&snapshot_path).await.unwrap_or(false) {
            let content = async_fs::read_to_string(&snapshot_path).await.map_err(|e| {
                HoardError::persistence(format!("Failed to read {}", snapshot_path.display()), e)
            })?;
            let loaded: Vec<(String, KvEntry)> = serde_json::from_str(&content).map_err(|e| {
                HoardError::persistence(format!("Corrupt records file {}", snapshot_path.display()), e)
            })?;

            let now = now_millis();
            for (key, entry) in loaded {
                if entry.is_live(now) {
                    store.entries.insert(key, entry);
                }
            }
            info!(path = %snapshot_path.display(), entries = store.entries.len(), "loaded records");
        }

        store.snapshot_path = Some(snapshot_path);
        Ok(store)
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        let now = now_millis();
        self.entries.iter().filter(|e| e.value().is_live(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    async fn persist(&self) -> StoreResult<()> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };
        let _guard = self.flush_lock.lock().await;

        let now = now_millis();
        let mut entries: Vec<(String, KvEntry)> = self
            .entries
            .iter()
            .filter(|e| e.value().is_live(now))
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let content = serde_json::to_vec(&entries)
            .map_err(|e| HoardError::persistence("Failed to serialize records".to_string(), e))?;

        let temp_path = path.with_extension("tmp");
        async_fs::write(&temp_path, content).await.map_err(|e| {
            HoardError::persistence(format!("Failed to write {}", temp_path.display()), e)
        })?;
        async_fs::rename(&temp_path, path).await.map_err(|e| {
            HoardError::persistence(format!("Failed to replace {}", path.display()), e)
        })?;

        debug!(path = %path.display(), entries = entries.len(), "flushed records");
        Ok(())
    }
}

#[async_trait]
impl KvStore for LocalKv {
    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> StoreResult<()> {
        let expires_at = expiry_for(ttl);
        self.entries
            .insert(key.to_string(), KvEntry { value, expires_at });
        self.persist().await
    }

    async fn set_many(&self, pairs: Vec<(String, String)>, ttl: Option<Duration>) -> StoreResult<()> {
        let expires_at = expiry_for(ttl);
        for (key, value) in pairs {
            self.entries.insert(key, KvEntry { value, expires_at });
        }
        self.persist().await
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let now = now_millis();
        if let Some(entry) = self.entries.get(key) {
            if entry.is_live(now) {
                return Ok(Some(entry.value.clone()));
            }
        }
        self.entries.remove_if(key, |_, entry| !entry.is_live(now));
        Ok(None)
    }

    async fn delete(&self, keys: &[String]) -> StoreResult<usize> {
        let now = now_millis();
        let removed = keys
            .iter()
            .filter_map(|key| self.entries.remove(key))
            .filter(|(_, entry)| entry.is_live(now))
            .count();
        self.persist().await?;
        Ok(removed)
    }

    async fn ttl(&self, key: &str) -> StoreResult<Option<Duration>> {
        let now = now_millis();
        Ok(self.entries.get(key).and_then(|entry| match entry.expires_at {
            Some(at) if at > now => Some(Duration::from_millis((at - now) as u64)),
            _ => None,
        }))
    }

    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> StoreResult<ScanPage> {
        let matcher = glob::Pattern::new(pattern)
            .map_err(|e| HoardError::validation("pattern", format!("'{}': {}", pattern, e)))?;

        let resume_after = if cursor == 0 {
            None
        } else {
            let (_, last_key) = self
                .cursors
                .remove(&cursor)
                .ok_or_else(|| HoardError::validation("cursor", format!("unknown scan cursor {}", cursor)))?;
            Some(last_key)
        };

        let now = now_millis();
        let mut candidates: Vec<String> = self
            .entries
            .iter()
            .filter(|e| e.value().is_live(now))
            .map(|e| e.key().clone())
            .filter(|key| resume_after.as_ref().map_or(true, |last| key > last))
            .collect();
        candidates.sort();

        let count = count.max(1);
        let examined = &candidates[..candidates.len().min(count)];
        let keys = examined
            .iter()
            .filter(|key| matcher.matches(key))
            .cloned()
            .collect();

        let cursor = match examined.last() {
            Some(last) if candidates.len() > count => {
                let id = self.next_cursor.fetch_add(1, Ordering::Relaxed);
                self.cursors.insert(id, last.clone());
                // Abandoned scans never come back for their cursor
                if self.cursors.len() as u64 > MAX_OPEN_CURSORS {
                    self.cursors.retain(|open, _| open + MAX_OPEN_CURSORS > id);
                }
                id
            }
            _ => 0,
        };

        Ok(ScanPage { cursor, keys })
    }

    async fn purge_expired(&self) -> StoreResult<usize> {
        let now = now_millis();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_live(now));
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            self.persist().await?;
            info!(removed, "purged expired records");
        }
        Ok(removed)
    }
}
