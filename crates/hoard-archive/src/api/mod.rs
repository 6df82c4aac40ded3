//! Archive object types

use chrono::{DateTime, Utc};
use hoard_core::error::HoardError;
use hoard_core::types::ArchiveScope;
use hoard_core::utils::is_safe_path;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// Metadata describing an archived object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
    /// Object key
    pub key: String,
    /// Size in bytes
    pub size: u64,
    /// When the object was last written
    pub last_modified: DateTime<Utc>,
    /// Content digest reported by the archive
    pub e_tag: Option<String>,
    /// Caller-supplied metadata
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Key of an object in the archive: `{type}/{id}/{filename}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArchiveKey {
    scope: ArchiveScope,
    owner_id: String,
    filename: String,
}

impl ArchiveKey {
    /// Build a key, rejecting segments that would escape their prefix
    pub fn new(scope: ArchiveScope, owner_id: &str, filename: &str) -> Result<Self, HoardError> {
        let owner_id = owner_id.trim();
        if owner_id.is_empty() {
            return Err(HoardError::validation("id", "is required for staging-area downloads"));
        }
        for (field, value) in [("id", owner_id), ("filename", filename)] {
            if value.contains('/') || value.contains('\\') || !is_safe_path(Path::new(value)) {
                return Err(HoardError::validation(
                    field,
                    format!("'{}' cannot be used in an archive key", value),
                ));
            }
        }

        Ok(Self {
            scope,
            owner_id: owner_id.to_string(),
            filename: filename.to_string(),
        })
    }

    pub fn scope(&self) -> ArchiveScope {
        self.scope
    }

    /// Prefix shared by every object of this owner
    pub fn prefix(&self) -> String {
        format!("{}/{}/", self.scope, self.owner_id)
    }
}

impl fmt::Display for ArchiveKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.scope, self.owner_id, self.filename)
    }
}
