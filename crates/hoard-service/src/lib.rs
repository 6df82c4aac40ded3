//! File service for hoard
//!
//! Ties the blob directory, the dedup filter, the file records and the
//! remote archive together into upload, download and delete operations.

pub mod service;
pub mod types;

pub use service::{FileService, ServiceOptions};
pub use types::{DeleteReport, Download, DownloadRequest, PurgeReport, ServiceStats, UploadReceipt};

use hoard_core::error::HoardError;

/// Result type for service operations
pub type ServiceResult<T> = Result<T, HoardError>;
