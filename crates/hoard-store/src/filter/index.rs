//! Shared dedup index handle
//!
//! One filter per process, shared by cloning the handle. Locks are only
//! held for the in-memory update and never across an `.await`.

use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;

use super::{CountingBloomFilter, FilterSnapshot};
use crate::StoreResult;

/// Process-wide membership index over stored blob contents
#[derive(Debug, Clone)]
pub struct DedupIndex {
    inner: Arc<RwLock<CountingBloomFilter>>,
}

/// Point-in-time view of the filter for reporting
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterStats {
    pub capacity: u64,
    pub error_rate: f64,
    pub hash_count: u32,
    pub slots: usize,
    pub item_count: u64,
    pub estimated_false_positive_rate: f64,
}

impl DedupIndex {
    /// Wrap an existing filter
    pub fn new(filter: CountingBloomFilter) -> Self {
        Self {
            inner: Arc::new(RwLock::new(filter)),
        }
    }

    /// Build an empty index sized for `expected_items` at `error_rate`
    pub fn with_params(expected_items: u64, error_rate: f64) -> StoreResult<Self> {
        Ok(Self::new(CountingBloomFilter::new(expected_items, error_rate)?))
    }

    pub fn has(&self, content: &[u8]) -> bool {
        self.inner.read().has(content)
    }

    pub fn add(&self, content: &[u8]) {
        self.inner.write().add(content);
    }

    /// Returns false when the content was not present
    pub fn remove(&self, content: &[u8]) -> bool {
        self.inner.write().remove(content)
    }

    /// Swap in a freshly sized, empty filter
    pub fn reset(&self, expected_items: u64, error_rate: f64) -> StoreResult<()> {
        let fresh = CountingBloomFilter::new(expected_items, error_rate)?;
        *self.inner.write() = fresh;
        Ok(())
    }

    /// Serializable copy of the current state
    pub fn snapshot(&self) -> FilterSnapshot {
        FilterSnapshot::from_filter(&self.inner.read())
    }

    pub fn stats(&self) -> FilterStats {
        let filter = self.inner.read();
        FilterStats {
            capacity: filter.capacity(),
            error_rate: filter.error_rate(),
            hash_count: filter.hash_count(),
            slots: filter.counters().len(),
            item_count: filter.len(),
            estimated_false_positive_rate: filter.estimated_false_positive_rate(),
        }
    }
}
