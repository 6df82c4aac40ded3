//! Remote archive contract and the directory-backed adapter

use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use hoard_core::error::HoardError;
use hoard_core::utils::{blake3_hash, is_safe_path};
use std::collections::HashMap;
use std::path::Path;
use tokio::fs as async_fs;
use tracing::{debug, info};
use url::Url;
use walkdir::WalkDir;

use crate::api::ObjectMeta;
use crate::ArchiveResult;

/// Object store the staging area mirrors blobs into.
///
/// Implementations never retry on their own; failures go straight back to
/// the caller as [`HoardError::RemoteArchive`].
#[async_trait]
pub trait RemoteArchive: Send + Sync + std::fmt::Debug {
    /// Store an object and return its location
    async fn put(
        &self,
        key: &str,
        content: Vec<u8>,
        metadata: HashMap<String, String>,
    ) -> ArchiveResult<String>;

    /// Describe an object without fetching it
    async fn head(&self, key: &str) -> ArchiveResult<Option<ObjectMeta>>;

    /// Every object whose key starts with `prefix`
    async fn list(&self, prefix: &str) -> ArchiveResult<Vec<ObjectMeta>>;
}

/// Directory used for metadata sidecars under the archive root
const META_DIR: &str = ".meta";

/// Archive that mirrors objects into a local directory tree
#[derive(Debug, Clone)]
pub struct FsArchive {
    root: Utf8PathBuf,
}

impl FsArchive {
    /// Open the archive root, creating it if needed
    pub async fn open<P: AsRef<Utf8Path>>(root: P) -> ArchiveResult<Self> {
        let root = root.as_ref().to_path_buf();
        async_fs::create_dir_all(&root)
            .await
            .map_err(|e| HoardError::remote(format!("Failed to create archive root {}", root), e))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn object_path(&self, key: &str) -> ArchiveResult<Utf8PathBuf> {
        if key.is_empty() || key.starts_with(META_DIR) || !is_safe_path(Path::new(key)) {
            return Err(HoardError::validation("key", format!("'{}' is not a valid archive key", key)));
        }
        Ok(self.root.join(key))
    }

    fn meta_path(&self, key: &str) -> Utf8PathBuf {
        self.root.join(META_DIR).join(format!("{}.json", key))
    }

    fn location(path: &Utf8Path) -> ArchiveResult<String> {
        let absolute = path
            .as_std_path()
            .canonicalize()
            .map_err(|e| HoardError::remote(format!("Failed to resolve {}", path), e))?;
        Url::from_file_path(&absolute)
            .map(|url| url.to_string())
            .map_err(|_| HoardError::RemoteArchive {
                message: format!("Cannot express {} as a URL", absolute.display()),
                source: None,
            })
    }

    async fn write_file(path: &Utf8Path, content: &[u8]) -> ArchiveResult<()> {
        if let Some(parent) = path.parent() {
            async_fs::create_dir_all(parent)
                .await
                .map_err(|e| HoardError::remote(format!("Failed to create {}", parent), e))?;
        }
        async_fs::write(path, content)
            .await
            .map_err(|e| HoardError::remote(format!("Failed to write {}", path), e))
    }
}

#[async_trait]
impl RemoteArchive for FsArchive {
    async fn put(
        &self,
        key: &str,
        content: Vec<u8>,
        metadata: HashMap<String, String>,
    ) -> ArchiveResult<String> {
        let path = self.object_path(key)?;

        let meta = ObjectMeta {
            key: key.to_string(),
            size: content.len() as u64,
            last_modified: Utc::now(),
            e_tag: Some(blake3_hash(&content)),
            metadata,
        };
        let meta_json = serde_json::to_vec_pretty(&meta)
            .map_err(|e| HoardError::remote("Failed to encode object metadata".to_string(), e))?;

        Self::write_file(&path, &content).await?;
        Self::write_file(&self.meta_path(key), &meta_json).await?;

        let location = Self::location(&path)?;
        info!(key, size = meta.size, %location, "archived object");
        Ok(location)
    }

    async fn head(&self, key: &str) -> ArchiveResult<Option<ObjectMeta>> {
        let path = self.object_path(key)?;
        let stat = match async_fs::metadata(&path).await {
            Ok(stat) if stat.is_file() => stat,
            Ok(_) => return Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(HoardError::remote(format!("Failed to stat {}", path), e)),
        };

        match async_fs::read(self.meta_path(key)).await {
            Ok(raw) => serde_json::from_slice(&raw)
                .map(Some)
                .map_err(|e| HoardError::remote(format!("Corrupt metadata for {}", key), e)),
            // Object placed without going through `put`
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let last_modified = stat
                    .modified()
                    .map(DateTime::<Utc>::from)
                    .unwrap_or_else(|_| Utc::now());
                Ok(Some(ObjectMeta {
                    key: key.to_string(),
                    size: stat.len(),
                    last_modified,
                    e_tag: None,
                    metadata: HashMap::new(),
                }))
            }
            Err(e) => Err(HoardError::remote(format!("Failed to read metadata for {}", key), e)),
        }
    }

    async fn list(&self, prefix: &str) -> ArchiveResult<Vec<ObjectMeta>> {
        let root = self.root.clone();
        let keys = tokio::task::spawn_blocking(move || {
            let meta_root = root.join(META_DIR);
            WalkDir::new(&root)
                .into_iter()
                .filter_entry(|entry| entry.path() != meta_root.as_std_path())
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_file())
                .filter_map(|entry| {
                    entry
                        .path()
                        .strip_prefix(root.as_std_path())
                        .ok()
                        .and_then(|rel| rel.to_str())
                        .map(|rel| rel.replace(std::path::MAIN_SEPARATOR, "/"))
                })
                .collect::<Vec<String>>()
        })
        .await
        .map_err(|e| HoardError::remote("Archive listing task failed".to_string(), e))?;

        let mut objects = Vec::new();
        for key in keys.into_iter().filter(|key| key.starts_with(prefix)) {
            if let Some(meta) = self.head(&key).await? {
                objects.push(meta);
            }
        }
        objects.sort_by(|a, b| a.key.cmp(&b.key));
        debug!(prefix, count = objects.len(), "listed archive objects");
        Ok(objects)
    }
}

#[cfg(test)]
mod tests;
