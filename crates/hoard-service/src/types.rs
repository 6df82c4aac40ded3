//! Request and result types for the file service

use camino::Utf8PathBuf;
use hoard_core::types::{ArchiveScope, DeliveryPath, FileId};
use hoard_core::HoardError;
use hoard_store::{BlobReader, FilterStats};
use serde::Serialize;

use crate::ServiceResult;

/// Result of an upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadReceipt {
    pub file_id: FileId,
    /// Decoded filename as stored in the record
    pub filename: String,
    /// The dedup filter already knew the content, so no blob was written
    pub already_existed: bool,
}

/// How the caller wants a download delivered.
///
/// Kept as raw strings so that selector validation happens in one place,
/// whatever the caller (CLI flag, config, test) handed in.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DownloadRequest {
    /// `local`, `staging-area` or `third-party`
    pub way: String,
    /// Archive scope (`user` or `room`), staging-area only
    pub scope_type: Option<String>,
    /// Owner id inside the scope, staging-area only
    pub owner_id: Option<String>,
}

impl DownloadRequest {
    pub fn new(way: impl Into<String>) -> Self {
        Self {
            way: way.into(),
            ..Self::default()
        }
    }

    pub fn local() -> Self {
        Self::new(DeliveryPath::Local.as_str())
    }

    pub fn staging(scope_type: impl Into<String>, owner_id: impl Into<String>) -> Self {
        Self {
            way: DeliveryPath::StagingArea.as_str().to_string(),
            scope_type: Some(scope_type.into()),
            owner_id: Some(owner_id.into()),
        }
    }

    pub(crate) fn delivery_path(&self) -> ServiceResult<DeliveryPath> {
        self.way.trim().parse::<DeliveryPath>()
    }

    /// Scope and owner for the staging path; both are required
    pub(crate) fn staging_target(&self) -> ServiceResult<(ArchiveScope, &str)> {
        let scope_type = required(self.scope_type.as_deref(), "type")?;
        let owner_id = required(self.owner_id.as_deref(), "id")?;
        Ok((scope_type.parse::<ArchiveScope>()?, owner_id))
    }
}

fn required<'a>(value: Option<&'a str>, field: &str) -> ServiceResult<&'a str> {
    match value.map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(HoardError::validation(field, "is required for staging-area downloads")),
    }
}

/// A delivered download
#[derive(Debug)]
pub enum Download {
    /// Readable stream over the local blob
    Local { reader: BlobReader, filename: String },
    /// Blob pushed to the remote archive
    Staged {
        location: String,
        key: String,
        filename: String,
    },
}

impl Download {
    pub fn filename(&self) -> &str {
        match self {
            Download::Local { filename, .. } | Download::Staged { filename, .. } => filename,
        }
    }
}

/// What a delete touched
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteReport {
    pub file_id: FileId,
    pub content_hash: String,
    /// A blob file was found and removed
    pub blob_removed: bool,
    /// Records removed, the requested one included
    pub records_removed: usize,
}

/// What a delete-all touched
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PurgeReport {
    pub blobs_removed: usize,
    pub record_keys_removed: usize,
}

/// Point-in-time service statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceStats {
    pub blob_dir: Utf8PathBuf,
    pub blob_count: usize,
    pub filter: FilterStats,
}
