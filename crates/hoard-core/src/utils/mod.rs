//! Utility functions and helpers.
//!
//! Common functionality used across multiple hoard crates.

pub mod hash;
pub mod path;

// Re-export commonly used utilities
pub use hash::{blake3_hash, verify_integrity};
pub use path::{decode_filename, file_extension, is_safe_path};
