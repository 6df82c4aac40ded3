//! Deduplication filter
//!
//! The counting bloom filter itself, the shared handle the rest of hoard
//! talks to, and the snapshot that carries it across restarts.

pub mod bloom;
pub mod index;
pub mod persist;

pub use bloom::CountingBloomFilter;
pub use index::{DedupIndex, FilterStats};
pub use persist::{FilterPersistence, FilterSnapshot, FILTER_KEY};
