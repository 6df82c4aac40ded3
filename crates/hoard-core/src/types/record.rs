//! File identity and record types.
//!
//! A `FileId` names one upload request. Many ids may point at the same
//! content hash, which is how deduplicated uploads share a blob.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::HoardError;

/// Opaque per-upload identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(String);

impl FileId {
    /// Generate a fresh random identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wrap a caller-supplied identifier, rejecting blank or key-breaking values
    pub fn parse(raw: &str) -> Result<Self, HoardError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(HoardError::validation("fileId", "must not be empty"));
        }
        // ':' separates the segments of a record key
        if trimmed.contains(':') || trimmed.contains('*') {
            return Err(HoardError::validation(
                "fileId",
                format!("'{}' contains reserved characters", trimmed),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Borrow the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for FileId {
    type Err = HoardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// The two fields stored per file id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordField {
    Hash,
    Filename,
}

impl RecordField {
    /// Key segment used in the durable key layout
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordField::Hash => "hash",
            RecordField::Filename => "filename",
        }
    }

    /// Both fields, in storage order
    pub fn all() -> [RecordField; 2] {
        [RecordField::Hash, RecordField::Filename]
    }
}

impl fmt::Display for RecordField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata kept for one upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub file_id: FileId,
    /// Hex content digest of the blob this upload resolved to
    pub content_hash: String,
    /// Original, percent-decoded filename
    pub filename: String,
}

impl FileRecord {
    /// Create a new record
    pub fn new(file_id: FileId, content_hash: String, filename: String) -> Self {
        Self {
            file_id,
            content_hash,
            filename,
        }
    }

    /// Extension of the original filename, including the dot
    pub fn extension(&self) -> String {
        crate::utils::path::file_extension(&self.filename)
    }
}
