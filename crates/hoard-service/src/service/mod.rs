//! File service
//!
//! Every operation runs its steps strictly in order and stops at the first
//! failure. Nothing is rolled back: a record written before a failed blob
//! write simply expires with its retention window.

use camino::Utf8Path;
use hoard_archive::{ArchiveKey, FsArchive, RemoteArchive};
use hoard_config::{HoardToml, RecordsBackend};
use hoard_core::error::HoardError;
use hoard_core::types::{ArchiveScope, DeliveryPath, FileId, FileRecord};
use hoard_core::utils::{decode_filename, file_extension, verify_integrity};
use hoard_store::{
    compute_hash, ContentHash, DedupIndex, FileRecordStore, FilterPersistence, KvStore, LocalBlobStore,
    LocalKv,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::types::{DeleteReport, Download, DownloadRequest, PurgeReport, ServiceStats, UploadReceipt};
use crate::ServiceResult;

/// Tunables the service is built with
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceOptions {
    /// Capacity the dedup filter is sized for
    pub expected_items: u64,
    /// Target false-positive rate of the dedup filter
    pub error_rate: f64,
    /// Lifetime of a file record
    pub retention: Duration,
    /// Keys examined per scan page
    pub scan_batch: usize,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self::from_config(&HoardToml::default())
    }
}

impl ServiceOptions {
    pub fn from_config(config: &HoardToml) -> Self {
        Self {
            expected_items: config.dedup.expected_items,
            error_rate: config.dedup.error_rate,
            retention: config.records.retention(),
            scan_batch: config.records.scan_batch,
        }
    }
}

/// Delivery target, validated before any lookup
enum Target<'a> {
    Local,
    Staging(ArchiveScope, &'a str),
    ThirdParty,
}

/// Content-addressed file service with probabilistic dedup
#[derive(Debug, Clone)]
pub struct FileService {
    blobs: LocalBlobStore,
    index: DedupIndex,
    filter_store: FilterPersistence,
    records: FileRecordStore,
    archive: Arc<dyn RemoteArchive>,
    options: ServiceOptions,
}

impl FileService {
    /// Open the service with records and the filter snapshot in one store
    pub async fn open(
        blob_dir: &Utf8Path,
        kv: Arc<dyn KvStore>,
        archive: Arc<dyn RemoteArchive>,
        options: ServiceOptions,
    ) -> ServiceResult<Self> {
        Self::open_with_filter_store(blob_dir, kv.clone(), kv, archive, options).await
    }

    /// Open the service over existing stores and an archive.
    ///
    /// Loads the filter snapshot from `filter_kv`, or creates and saves a
    /// fresh one, so a snapshot always exists once this returns.
    pub async fn open_with_filter_store(
        blob_dir: &Utf8Path,
        kv: Arc<dyn KvStore>,
        filter_kv: Arc<dyn KvStore>,
        archive: Arc<dyn RemoteArchive>,
        options: ServiceOptions,
    ) -> ServiceResult<Self> {
        let blobs = LocalBlobStore::open(blob_dir).await?;
        let filter_store = FilterPersistence::new(filter_kv);
        let index = filter_store
            .load_or_init(options.expected_items, options.error_rate)
            .await
            .map_err(|e| {
                error!(error = %e, "failed to load dedup filter");
                e
            })?;
        let records = FileRecordStore::new(kv)
            .with_retention(options.retention)
            .with_scan_batch(options.scan_batch);

        info!(
            blob_dir = %blob_dir,
            items = index.stats().item_count,
            "file service ready"
        );

        Ok(Self {
            blobs,
            index,
            filter_store,
            records,
            archive,
            options,
        })
    }

    /// Build the stores and archive described by the configuration.
    ///
    /// The file backend keeps the filter snapshot in its own file so record
    /// writes never rewrite the counters.
    pub async fn from_config(config: &HoardToml) -> ServiceResult<Self> {
        let (kv, filter_kv): (Arc<dyn KvStore>, Arc<dyn KvStore>) = match config.records.backend {
            RecordsBackend::File => (
                Arc::new(LocalKv::open(&config.storage.records_path).await?),
                Arc::new(LocalKv::open(&config.storage.filter_path).await?),
            ),
            RecordsBackend::Memory => {
                let kv = Arc::new(LocalKv::in_memory());
                (kv.clone(), kv)
            }
        };
        let archive: Arc<dyn RemoteArchive> = Arc::new(FsArchive::open(&config.archive.root).await?);

        Self::open_with_filter_store(
            &config.storage.blob_dir,
            kv,
            filter_kv,
            archive,
            ServiceOptions::from_config(config),
        )
        .await
    }

    pub fn options(&self) -> &ServiceOptions {
        &self.options
    }

    /// Store a payload under a new file id.
    ///
    /// The record is written before the dedup check so the id resolves even
    /// if the blob write fails.
    pub async fn upload(&self, payload: &[u8], filename: &str) -> ServiceResult<UploadReceipt> {
        if payload.is_empty() {
            let err = HoardError::validation("payload", "must not be empty");
            warn!(filename, error = %err, "upload rejected");
            return Err(err);
        }
        let filename = decode_filename(filename).map_err(|e| {
            warn!(filename, error = %e, "upload rejected");
            e
        })?;

        let file_id = FileId::generate();
        let hash = compute_hash(payload);
        let hash_hex = hash.to_hex();

        self.records
            .put(&file_id, &hash_hex, &filename)
            .await
            .map_err(|e| {
                error!(file_id = %file_id, hash = %hash_hex, error = %e, "upload failed writing record");
                e
            })?;

        let mut already_existed = self.index.has(payload);
        if already_existed && self.blobs.locate(&hash).await?.is_none() {
            // False positive: the filter matched content that was never stored
            warn!(file_id = %file_id, hash = %hash_hex, "dedup filter false positive, storing blob");
            already_existed = false;
        }

        if !already_existed {
            self.blobs
                .write(&hash, &file_extension(&filename), payload)
                .await
                .map_err(|e| {
                    error!(file_id = %file_id, hash = %hash_hex, error = %e, "upload failed writing blob");
                    e
                })?;
            self.index.add(payload);
            self.save_filter("upload").await?;
        }

        info!(
            file_id = %file_id,
            hash = %hash_hex,
            filename = %filename,
            size = payload.len(),
            already_existed,
            "uploaded file"
        );

        Ok(UploadReceipt {
            file_id,
            filename,
            already_existed,
        })
    }

    /// Resolve a file id without touching its blob
    pub async fn stat(&self, file_id: &FileId) -> ServiceResult<FileRecord> {
        match self.records.get_record(file_id).await {
            Ok(Some(record)) => Ok(record),
            Ok(None) => {
                let err = HoardError::not_found("file", file_id.as_str());
                warn!(file_id = %file_id, "unknown file id");
                Err(err)
            }
            Err(e) => {
                error!(file_id = %file_id, error = %e, "failed to read file record");
                Err(e)
            }
        }
    }

    /// Deliver a file the way the request asks for
    pub async fn download(&self, file_id: &FileId, request: &DownloadRequest) -> ServiceResult<Download> {
        let way = request.delivery_path().map_err(|e| {
            warn!(file_id = %file_id, way = %request.way, error = %e, "download rejected");
            e
        })?;
        let target = match way {
            DeliveryPath::Local => Target::Local,
            DeliveryPath::StagingArea => {
                let (scope, owner_id) = request.staging_target().map_err(|e| {
                    warn!(file_id = %file_id, error = %e, "staging download rejected");
                    e
                })?;
                Target::Staging(scope, owner_id)
            }
            DeliveryPath::ThirdParty => Target::ThirdParty,
        };

        let record = self.stat(file_id).await?;
        let hash = self.stored_hash(&record)?;

        if self.blobs.locate(&hash).await?.is_none() {
            warn!(file_id = %file_id, hash = %record.content_hash, "blob missing for file record");
            return Err(HoardError::not_found("blob", record.content_hash));
        }

        match target {
            Target::Local => {
                let reader = self.blobs.read(&hash).await.map_err(|e| {
                    warn!(file_id = %file_id, error = %e, "local download failed");
                    e
                })?;
                debug!(file_id = %file_id, path = %reader.path(), "serving local blob");
                Ok(Download::Local {
                    reader,
                    filename: record.filename,
                })
            }
            Target::Staging(scope, owner_id) => self.stage(&record, &hash, scope, owner_id).await,
            Target::ThirdParty => {
                let err = HoardError::Unsupported {
                    feature: DeliveryPath::ThirdParty.as_str().to_string(),
                };
                warn!(file_id = %file_id, error = %err, "download rejected");
                Err(err)
            }
        }
    }

    /// Push the blob to the archive under `{type}/{id}/{filename}`
    async fn stage(
        &self,
        record: &FileRecord,
        hash: &ContentHash,
        scope: ArchiveScope,
        owner_id: &str,
    ) -> ServiceResult<Download> {
        let key = ArchiveKey::new(scope, owner_id, &record.filename).map_err(|e| {
            warn!(file_id = %record.file_id, error = %e, "staging download rejected");
            e
        })?;

        let content = self.blobs.read_bytes(hash).await?;
        verify_integrity(&content, &record.content_hash).map_err(|e| {
            error!(file_id = %record.file_id, error = %e, "blob failed integrity check");
            e
        })?;

        let metadata = HashMap::from([
            ("content-hash".to_string(), record.content_hash.clone()),
            ("file-id".to_string(), record.file_id.to_string()),
        ]);
        let key = key.to_string();
        let location = self.archive.put(&key, content, metadata).await.map_err(|e| {
            error!(file_id = %record.file_id, key = %key, error = %e, "archive upload failed");
            e
        })?;

        info!(file_id = %record.file_id, key = %key, location = %location, "staged file");
        Ok(Download::Staged {
            location,
            key,
            filename: record.filename.clone(),
        })
    }

    /// Delete a file, its blob and every other record sharing the blob.
    ///
    /// There is no reference counting: ids that deduplicated onto the same
    /// content stop resolving too.
    pub async fn delete(&self, file_id: &FileId) -> ServiceResult<DeleteReport> {
        let record = self.stat(file_id).await?;
        let hash = self.stored_hash(&record)?;

        let blob_removed = match self.blobs.read_bytes(&hash).await {
            Ok(content) => {
                if !self.index.remove(&content) {
                    debug!(hash = %record.content_hash, "content was not counted in the filter");
                }
                self.blobs.delete(&hash).await.map_err(|e| {
                    error!(file_id = %file_id, error = %e, "failed to delete blob");
                    e
                })?
            }
            Err(e) if e.is_not_found() => {
                warn!(file_id = %file_id, hash = %record.content_hash, "blob already gone");
                false
            }
            Err(e) => {
                error!(file_id = %file_id, error = %e, "failed to read blob for delete");
                return Err(e);
            }
        };

        self.save_filter("delete").await?;

        let mut records_removed = 0;
        if self.records.delete_by_file_id(file_id).await? > 0 {
            records_removed += 1;
        }
        records_removed += self
            .records
            .delete_all_with_hash(&record.content_hash)
            .await
            .map_err(|e| {
                error!(file_id = %file_id, error = %e, "failed to delete records sharing the blob");
                e
            })?;

        info!(
            file_id = %file_id,
            hash = %record.content_hash,
            blob_removed,
            records_removed,
            "deleted file"
        );

        Ok(DeleteReport {
            file_id: file_id.clone(),
            content_hash: record.content_hash,
            blob_removed,
            records_removed,
        })
    }

    /// Remove every blob and record and start over with an empty filter
    pub async fn delete_all(&self) -> ServiceResult<PurgeReport> {
        let blobs_removed = self.blobs.clear().await.map_err(|e| {
            error!(error = %e, "failed to clear blob directory");
            e
        })?;

        self.index.reset(self.options.expected_items, self.options.error_rate)?;
        self.save_filter("delete_all").await?;

        let record_keys_removed = self.records.delete_all().await.map_err(|e| {
            error!(error = %e, "failed to delete file records");
            e
        })?;

        info!(blobs_removed, record_keys_removed, "deleted everything");
        Ok(PurgeReport {
            blobs_removed,
            record_keys_removed,
        })
    }

    /// Drop record entries whose retention ran out
    pub async fn sweep_expired(&self) -> ServiceResult<usize> {
        let removed = self.records.sweep_expired().await?;
        info!(removed, "swept expired records");
        Ok(removed)
    }

    pub async fn stats(&self) -> ServiceResult<ServiceStats> {
        Ok(ServiceStats {
            blob_dir: self.blobs.root_path().to_path_buf(),
            blob_count: self.blobs.list().await?.len(),
            filter: self.index.stats(),
        })
    }

    fn stored_hash(&self, record: &FileRecord) -> ServiceResult<ContentHash> {
        ContentHash::from_hex(&record.content_hash).map_err(|e| {
            error!(file_id = %record.file_id, error = %e, "stored content hash is corrupt");
            HoardError::persistence_msg(format!(
                "Record {} holds an invalid content hash: {}",
                record.file_id, e
            ))
        })
    }

    async fn save_filter(&self, operation: &'static str) -> ServiceResult<()> {
        self.filter_store.save(&self.index).await.map_err(|e| {
            error!(operation, error = %e, "failed to persist dedup filter");
            e
        })
    }
}

#[cfg(test)]
mod tests;
