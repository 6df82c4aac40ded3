//! Filter snapshot persistence
//!
//! The filter is saved as a JSON snapshot in a key-value store next to the
//! file records, under [`FILTER_KEY`] with no expiry. Every
//! failure is returned to the caller: an unsaved snapshot means the
//! in-memory filter and durable state have drifted apart.

use hoard_core::error::HoardError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info};

use super::{CountingBloomFilter, DedupIndex};
use crate::kv::KvStore;
use crate::StoreResult;

/// Key the snapshot is stored under
pub const FILTER_KEY: &str = "dedup:filter";

const SNAPSHOT_VERSION: u32 = 1;

/// Serialized filter state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSnapshot {
    pub version: u32,
    /// Hex-encoded counter array
    pub counters: String,
    pub capacity: u64,
    pub error_rate: f64,
    pub hash_count: u32,
    pub item_count: u64,
}

impl FilterSnapshot {
    pub fn from_filter(filter: &CountingBloomFilter) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            counters: hex::encode(filter.counters()),
            capacity: filter.capacity(),
            error_rate: filter.error_rate(),
            hash_count: filter.hash_count(),
            item_count: filter.len(),
        }
    }

    pub fn into_filter(self) -> StoreResult<CountingBloomFilter> {
        if self.version != SNAPSHOT_VERSION {
            return Err(HoardError::persistence_msg(format!(
                "Unsupported filter snapshot version {}",
                self.version
            )));
        }
        let counters = hex::decode(&self.counters)
            .map_err(|e| HoardError::persistence("Corrupt filter counters".to_string(), e))?;

        CountingBloomFilter::from_parts(
            counters,
            self.hash_count,
            self.capacity,
            self.error_rate,
            self.item_count,
        )
        .map_err(|e| HoardError::persistence_msg(format!("Invalid filter snapshot: {}", e)))
    }

    pub fn to_json(&self) -> StoreResult<String> {
        serde_json::to_string(self)
            .map_err(|e| HoardError::persistence("Failed to serialize filter snapshot".to_string(), e))
    }

    pub fn from_json(json: &str) -> StoreResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| HoardError::persistence("Failed to parse filter snapshot".to_string(), e))
    }
}

/// Loads and saves the dedup filter through a [`KvStore`]
#[derive(Debug, Clone)]
pub struct FilterPersistence {
    kv: Arc<dyn KvStore>,
    key: String,
}

impl FilterPersistence {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self::with_key(kv, FILTER_KEY)
    }

    pub fn with_key(kv: Arc<dyn KvStore>, key: impl Into<String>) -> Self {
        Self { kv, key: key.into() }
    }

    /// Load the stored filter, if any
    pub async fn load(&self) -> StoreResult<Option<CountingBloomFilter>> {
        let Some(json) = self.kv.get(&self.key).await? else {
            debug!(key = %self.key, "no filter snapshot stored");
            return Ok(None);
        };

        let filter = FilterSnapshot::from_json(&json)?.into_filter()?;
        info!(
            key = %self.key,
            items = filter.len(),
            slots = filter.counters().len(),
            "loaded filter snapshot"
        );
        Ok(Some(filter))
    }

    /// Persist the current state of the index
    pub async fn save(&self, index: &DedupIndex) -> StoreResult<()> {
        let json = index.snapshot().to_json()?;
        self.kv.set(&self.key, json, None).await.map_err(|e| {
            error!(key = %self.key, error = %e, "failed to save filter snapshot");
            e
        })
    }

    /// Load the stored filter, or create one from the given parameters and
    /// save it straight away so a snapshot always exists afterwards.
    pub async fn load_or_init(&self, expected_items: u64, error_rate: f64) -> StoreResult<DedupIndex> {
        if let Some(filter) = self.load().await? {
            return Ok(DedupIndex::new(filter));
        }

        let index = DedupIndex::with_params(expected_items, error_rate)?;
        self.save(&index).await?;
        info!(key = %self.key, expected_items, error_rate, "initialized new filter");
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::LocalKv;

    fn persistence() -> (Arc<LocalKv>, FilterPersistence) {
        let kv = Arc::new(LocalKv::in_memory());
        let persistence = FilterPersistence::new(kv.clone());
        (kv, persistence)
    }

    #[tokio::test]
    async fn test_load_absent() {
        let (_, persistence) = persistence();
        assert!(persistence.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_load_or_init_saves_immediately() {
        let (kv, persistence) = persistence();
        let index = persistence.load_or_init(100, 0.01).await.unwrap();
        assert!(index.stats().item_count == 0);
        assert!(kv.get(FILTER_KEY).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_save_and_load_preserves_membership() {
        let (_, persistence) = persistence();
        let index = persistence.load_or_init(100, 0.01).await.unwrap();
        index.add(b"first");
        index.add(b"second");
        persistence.save(&index).await.unwrap();

        let restored = persistence.load_or_init(5, 0.5).await.unwrap();
        assert!(restored.has(b"first"));
        assert!(restored.has(b"second"));
        // Stored parameters win over the ones passed in
        assert_eq!(restored.stats(), index.stats());
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_is_an_error() {
        let (kv, persistence) = persistence();
        kv.set(FILTER_KEY, "{not json".to_string(), None).await.unwrap();
        let err = persistence.load().await.unwrap_err();
        assert!(matches!(err, HoardError::Persistence { .. }));

        let mut snapshot = FilterSnapshot::from_filter(&CountingBloomFilter::new(10, 0.1).unwrap());
        snapshot.counters = "zz".to_string();
        kv.set(FILTER_KEY, snapshot.to_json().unwrap(), None).await.unwrap();
        assert!(persistence.load_or_init(10, 0.1).await.is_err());
    }

    #[test]
    fn test_unknown_version_rejected() {
        let mut snapshot = FilterSnapshot::from_filter(&CountingBloomFilter::new(10, 0.1).unwrap());
        snapshot.version = 99;
        assert!(snapshot.into_filter().is_err());
    }
}
