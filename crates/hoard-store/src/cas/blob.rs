//! Local blob directory
//!
//! Blobs live in one flat directory named `{hash}{extension}`. Lookups
//! list the directory and match on the hash prefix, so there is no separate
//! index to keep in sync. That is fine for a single node with a modest
//! number of blobs and gets slow beyond that.

use camino::{Utf8Path, Utf8PathBuf};
use hoard_core::error::HoardError;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};
use tokio::fs as async_fs;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt, ReadBuf};
use tracing::{debug, info, warn};

use super::ContentHash;
use crate::StoreResult;

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Filesystem-backed blob storage keyed by content hash
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    /// Flat directory holding every blob
    root_path: Utf8PathBuf,
}

/// Open handle on a stored blob
#[derive(Debug)]
pub struct BlobReader {
    path: Utf8PathBuf,
    len: u64,
    file: async_fs::File,
}

impl BlobReader {
    /// Path of the blob on disk
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Size of the blob in bytes
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Read the remaining content into memory
    pub async fn into_bytes(mut self) -> StoreResult<Vec<u8>> {
        let mut content = Vec::with_capacity(self.len as usize);
        self.file
            .read_to_end(&mut content)
            .await
            .map_err(|e| HoardError::io(format!("Failed to read blob {}", self.path), e))?;
        Ok(content)
    }
}

impl AsyncRead for BlobReader {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().file).poll_read(cx, buf)
    }
}

impl LocalBlobStore {
    /// Open the blob directory, creating it if needed
    pub async fn open<P: AsRef<Utf8Path>>(root_path: P) -> StoreResult<Self> {
        let root_path = root_path.as_ref().to_path_buf();

        async_fs::create_dir_all(&root_path)
            .await
            .map_err(|e| HoardError::io(format!("Failed to create blob directory {}", root_path), e))?;

        Ok(Self { root_path })
    }

    /// Get the root path of the store
    pub fn root_path(&self) -> &Utf8Path {
        &self.root_path
    }

    /// On-disk name of a blob
    pub fn blob_name(hash: &ContentHash, extension: &str) -> String {
        format!("{}{}", hash.to_hex(), extension)
    }

    /// Persist a blob and return its path.
    ///
    /// Content lands under a dot-prefixed temporary name first, so a reader
    /// never matches a half-written blob.
    pub async fn write(
        &self,
        hash: &ContentHash,
        extension: &str,
        content: &[u8],
    ) -> StoreResult<Utf8PathBuf> {
        let name = Self::blob_name(hash, extension);
        let path = self.root_path.join(&name);
        let temp_path = self.root_path.join(format!(
            ".{}.{}.tmp",
            name,
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));

        let mut file = async_fs::File::create(&temp_path)
            .await
            .map_err(|e| HoardError::io(format!("Failed to create {}", temp_path), e))?;
        file.write_all(content)
            .await
            .map_err(|e| HoardError::io(format!("Failed to write {}", temp_path), e))?;
        file.sync_all()
            .await
            .map_err(|e| HoardError::io(format!("Failed to sync {}", temp_path), e))?;
        drop(file);

        if let Err(e) = async_fs::rename(&temp_path, &path).await {
            let _ = async_fs::remove_file(&temp_path).await;
            return Err(HoardError::io(format!("Failed to move blob into place at {}", path), e));
        }

        info!(blob = %name, size = content.len(), "stored blob");
        Ok(path)
    }

    /// Find the blob for a hash by scanning the directory
    pub async fn locate(&self, hash: &ContentHash) -> StoreResult<Option<Utf8PathBuf>> {
        Ok(self.matching(hash).await?.into_iter().next())
    }

    /// Open a blob for streaming
    pub async fn read(&self, hash: &ContentHash) -> StoreResult<BlobReader> {
        let path = self
            .locate(hash)
            .await?
            .ok_or_else(|| HoardError::not_found("blob", hash.to_hex()))?;

        let file = async_fs::File::open(&path)
            .await
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => HoardError::not_found("blob", hash.to_hex()),
                _ => HoardError::io(format!("Failed to open blob {}", path), e),
            })?;
        let len = file
            .metadata()
            .await
            .map_err(|e| HoardError::io(format!("Failed to stat blob {}", path), e))?
            .len();

        debug!(blob = %path, len, "opened blob");
        Ok(BlobReader { path, len, file })
    }

    /// Read a whole blob into memory
    pub async fn read_bytes(&self, hash: &ContentHash) -> StoreResult<Vec<u8>> {
        self.read(hash).await?.into_bytes().await
    }

    /// Remove every blob stored under a hash; returns whether anything was removed
    pub async fn delete(&self, hash: &ContentHash) -> StoreResult<bool> {
        let mut removed = false;
        for path in self.matching(hash).await? {
            match async_fs::remove_file(&path).await {
                Ok(()) => {
                    info!(blob = %path, "deleted blob");
                    removed = true;
                }
                // Lost a race with another delete
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(HoardError::io(format!("Failed to delete blob {}", path), e));
                }
            }
        }
        Ok(removed)
    }

    /// Names of all stored blobs
    pub async fn list(&self) -> StoreResult<Vec<String>> {
        let mut names = Vec::new();
        let mut entries = self.read_dir().await?;
        while let Some(entry) = Self::next_entry(&self.root_path, &mut entries).await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') {
                continue;
            }
            names.push(name);
        }
        names.sort();
        Ok(names)
    }

    /// Wipe the directory; returns the number of blobs removed
    pub async fn clear(&self) -> StoreResult<usize> {
        let mut removed = 0;
        let mut entries = self.read_dir().await?;
        while let Some(entry) = Self::next_entry(&self.root_path, &mut entries).await? {
            let path = entry.path();
            let is_dir = entry
                .file_type()
                .await
                .map(|ft| ft.is_dir())
                .unwrap_or(false);
            let result = if is_dir {
                async_fs::remove_dir_all(&path).await
            } else {
                async_fs::remove_file(&path).await
            };
            match result {
                Ok(()) => {
                    if !entry.file_name().to_string_lossy().starts_with('.') {
                        removed += 1;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(HoardError::io(
                        format!("Failed to remove {}", path.display()),
                        e,
                    ));
                }
            }
        }
        warn!(dir = %self.root_path, removed, "cleared blob directory");
        Ok(removed)
    }

    async fn matching(&self, hash: &ContentHash) -> StoreResult<Vec<Utf8PathBuf>> {
        let prefix = hash.to_hex();
        let mut found = Vec::new();
        let mut entries = self.read_dir().await?;
        while let Some(entry) = Self::next_entry(&self.root_path, &mut entries).await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with(&prefix) {
                found.push(self.root_path.join(name));
            }
        }
        found.sort();
        Ok(found)
    }

    async fn read_dir(&self) -> StoreResult<async_fs::ReadDir> {
        async_fs::read_dir(&self.root_path)
            .await
            .map_err(|e| HoardError::io(format!("Failed to list blob directory {}", self.root_path), e))
    }

    async fn next_entry(
        root: &Utf8Path,
        entries: &mut async_fs::ReadDir,
    ) -> StoreResult<Option<async_fs::DirEntry>> {
        entries
            .next_entry()
            .await
            .map_err(|e| HoardError::io(format!("Failed to list blob directory {}", root), e))
    }
}
