//! Content-Addressable Storage implementation
//!
//! This module provides content hashing and the flat, hash-named blob
//! directory.

pub mod blob;
pub mod hash;

// Re-export main types
pub use blob::{BlobReader, LocalBlobStore};
pub use hash::{compute_hash, ContentHash};
