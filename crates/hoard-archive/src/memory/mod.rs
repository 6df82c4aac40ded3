//! In-memory archive
//!
//! Keeps objects in a `DashMap`. Useful for tests and for running hoard
//! without any external store; `fail_puts` simulates an unavailable
//! archive.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use hoard_core::error::HoardError;
use hoard_core::utils::blake3_hash;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::api::ObjectMeta;
use crate::client::RemoteArchive;
use crate::ArchiveResult;

#[derive(Debug, Clone)]
struct StoredObject {
    content: Vec<u8>,
    meta: ObjectMeta,
}

/// Archive held entirely in process memory
#[derive(Debug, Default)]
pub struct MemoryArchive {
    objects: DashMap<String, StoredObject>,
    fail_puts: AtomicBool,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following `put` fail (or succeed again)
    pub fn fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    /// Content of a stored object
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.get(key).map(|object| object.content.clone())
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[async_trait]
impl RemoteArchive for MemoryArchive {
    async fn put(
        &self,
        key: &str,
        content: Vec<u8>,
        metadata: HashMap<String, String>,
    ) -> ArchiveResult<String> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(HoardError::RemoteArchive {
                message: format!("archive unavailable while storing {}", key),
                source: None,
            });
        }

        let meta = ObjectMeta {
            key: key.to_string(),
            size: content.len() as u64,
            last_modified: Utc::now(),
            e_tag: Some(blake3_hash(&content)),
            metadata,
        };
        self.objects
            .insert(key.to_string(), StoredObject { content, meta });
        Ok(format!("memory://{}", key))
    }

    async fn head(&self, key: &str) -> ArchiveResult<Option<ObjectMeta>> {
        Ok(self.objects.get(key).map(|object| object.meta.clone()))
    }

    async fn list(&self, prefix: &str) -> ArchiveResult<Vec<ObjectMeta>> {
        let mut objects: Vec<ObjectMeta> = self
            .objects
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| entry.value().meta.clone())
            .collect();
        objects.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(objects)
    }
}
