//! Expiring key-value storage
//!
//! The durable side of hoard is a small key-value contract: string keys,
//! string values, optional time-to-live, and cursor-based pattern scans.
//! Retention of file records is expressed purely as a TTL on this
//! abstraction.

use async_trait::async_trait;
use std::time::Duration;

use crate::StoreResult;

pub mod local;

pub use local::LocalKv;

/// One page of a pattern scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanPage {
    /// Cursor to resume from; zero once the scan is complete
    pub cursor: u64,
    /// Matching keys found in this page
    pub keys: Vec<String>,
}

impl ScanPage {
    pub fn is_last(&self) -> bool {
        self.cursor == 0
    }
}

/// Key-value store with per-entry expiry
#[async_trait]
pub trait KvStore: Send + Sync + std::fmt::Debug {
    /// Set a value, replacing any previous one. `None` keeps it forever.
    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> StoreResult<()>;

    /// Set several values with the same TTL as one write
    async fn set_many(&self, pairs: Vec<(String, String)>, ttl: Option<Duration>) -> StoreResult<()>;

    /// Get a live value
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Delete keys; returns how many existed
    async fn delete(&self, keys: &[String]) -> StoreResult<usize>;

    /// Remaining time to live; `None` when the key is missing or never expires
    async fn ttl(&self, key: &str) -> StoreResult<Option<Duration>>;

    /// Examine up to `count` keys starting at `cursor` (zero starts a new
    /// scan) and return those matching the glob `pattern`.
    ///
    /// Keys present for the whole scan are returned exactly once; keys
    /// written or removed during it may or may not show up.
    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> StoreResult<ScanPage>;

    /// Drop every expired entry; returns how many were removed
    async fn purge_expired(&self) -> StoreResult<usize>;
}
