//! Content-addressable storage for hoard
//!
//! This crate holds everything hoard keeps on the local node: blobs named
//! by their Blake3 hash, the counting bloom filter that decides whether a
//! payload is new, the snapshot that makes the filter survive restarts, and
//! the expiring key-value records that map file ids to hashes.

pub mod cas;
pub mod filter;
pub mod kv;
pub mod records;

// Re-export main types
pub use cas::{compute_hash, BlobReader, ContentHash, LocalBlobStore};
pub use filter::{CountingBloomFilter, DedupIndex, FilterPersistence, FilterSnapshot, FilterStats};
pub use kv::{KvStore, LocalKv, ScanPage};
pub use records::FileRecordStore;

use hoard_core::error::HoardError;

/// Result type for store operations
pub type StoreResult<T> = Result<T, HoardError>;
