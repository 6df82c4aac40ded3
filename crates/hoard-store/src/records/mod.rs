//! File records
//!
//! Maps a file id to its content hash and original filename using two keys
//! per upload:
//!
//! ```text
//! file:{fileId}:hash      -> content hash
//! file:{fileId}:filename  -> original filename
//! ```
//!
//! Both carry the retention TTL. Records are only indexed by file id, so
//! anything keyed by hash has to scan.

use hoard_core::types::{FileId, FileRecord, RecordField};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::kv::KvStore;
use crate::StoreResult;

/// Default retention for file records
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Default number of keys examined per scan page
pub const DEFAULT_SCAN_BATCH: usize = 100;

const HASH_PATTERN: &str = "file:*:hash";
const FILENAME_PATTERN: &str = "file:*:filename";

/// Durable mapping from file id to (content hash, filename)
#[derive(Debug, Clone)]
pub struct FileRecordStore {
    kv: Arc<dyn KvStore>,
    retention: Duration,
    scan_batch: usize,
}

impl FileRecordStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self {
            kv,
            retention: DEFAULT_RETENTION,
            scan_batch: DEFAULT_SCAN_BATCH,
        }
    }

    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    pub fn with_scan_batch(mut self, scan_batch: usize) -> Self {
        self.scan_batch = scan_batch.max(1);
        self
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// Key for one field of a record
    pub fn key(file_id: &FileId, field: RecordField) -> String {
        format!("file:{}:{}", file_id, field)
    }

    /// File id embedded in a record key
    fn file_id_from_key(key: &str) -> Option<&str> {
        key.strip_prefix("file:")?.rsplit_once(':').map(|(id, _)| id)
    }

    /// Write both fields of a record with the retention TTL
    pub async fn put(&self, file_id: &FileId, hash: &str, filename: &str) -> StoreResult<()> {
        let pairs = vec![
            (Self::key(file_id, RecordField::Hash), hash.to_string()),
            (Self::key(file_id, RecordField::Filename), filename.to_string()),
        ];
        self.kv.set_many(pairs, Some(self.retention)).await?;
        debug!(file_id = %file_id, hash, "stored file record");
        Ok(())
    }

    /// Read one field
    pub async fn get(&self, file_id: &FileId, field: RecordField) -> StoreResult<Option<String>> {
        self.kv.get(&Self::key(file_id, field)).await
    }

    /// Read the whole record; `None` unless both fields are present
    pub async fn get_record(&self, file_id: &FileId) -> StoreResult<Option<FileRecord>> {
        let Some(hash) = self.get(file_id, RecordField::Hash).await? else {
            return Ok(None);
        };
        let Some(filename) = self.get(file_id, RecordField::Filename).await? else {
            return Ok(None);
        };
        Ok(Some(FileRecord::new(file_id.clone(), hash, filename)))
    }

    /// Remove both fields of a record; returns the number of keys removed
    pub async fn delete_by_file_id(&self, file_id: &FileId) -> StoreResult<usize> {
        let keys: Vec<String> = RecordField::all()
            .iter()
            .map(|field| Self::key(file_id, *field))
            .collect();
        self.kv.delete(&keys).await
    }

    /// Remove every record whose hash field equals `hash`; returns the
    /// number of records removed.
    ///
    /// Walks the whole keyspace page by page until the cursor comes back
    /// as zero, then deletes the matches in one call. Deleting an
    /// already-deleted record is harmless, so concurrent writers only cost
    /// extra work.
    pub async fn delete_all_with_hash(&self, hash: &str) -> StoreResult<usize> {
        let mut cursor = 0;
        let mut removed = 0;
        let mut doomed = Vec::new();

        loop {
            let page = self.kv.scan(cursor, HASH_PATTERN, self.scan_batch).await?;

            for key in &page.keys {
                if self.kv.get(key).await?.as_deref() != Some(hash) {
                    continue;
                }
                if let Some(file_id) = Self::file_id_from_key(key) {
                    doomed.push(key.clone());
                    doomed.push(format!("file:{}:{}", file_id, RecordField::Filename));
                    removed += 1;
                }
            }

            if page.is_last() {
                break;
            }
            cursor = page.cursor;
        }

        if !doomed.is_empty() {
            self.kv.delete(&doomed).await?;
        }

        info!(hash, removed, "deleted records sharing hash");
        Ok(removed)
    }

    /// Remove every file record; returns the number of keys removed
    pub async fn delete_all(&self) -> StoreResult<usize> {
        let mut removed = 0;
        for pattern in [HASH_PATTERN, FILENAME_PATTERN] {
            removed += self.delete_matching(pattern).await?;
        }
        info!(removed, "deleted all file records");
        Ok(removed)
    }

    /// Drop expired entries from the underlying store
    pub async fn sweep_expired(&self) -> StoreResult<usize> {
        self.kv.purge_expired().await
    }

    async fn delete_matching(&self, pattern: &str) -> StoreResult<usize> {
        let mut cursor = 0;
        let mut matched = Vec::new();
        loop {
            let page = self.kv.scan(cursor, pattern, self.scan_batch).await?;
            let last = page.is_last();
            cursor = page.cursor;
            matched.extend(page.keys);
            if last {
                break;
            }
        }
        if matched.is_empty() {
            return Ok(0);
        }
        self.kv.delete(&matched).await
    }
}
