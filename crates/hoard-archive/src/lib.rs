//! Remote archive for hoard
//!
//! The staging-area delivery path pushes a locally held blob to an object
//! store on demand. hoard only depends on the narrow [`RemoteArchive`]
//! contract defined here; this crate also ships a directory-backed adapter
//! and an in-memory one.

pub mod api;
pub mod client;
pub mod memory;

// Re-export main types
pub use api::{ArchiveKey, ObjectMeta};
pub use client::{FsArchive, RemoteArchive};
pub use memory::MemoryArchive;

use hoard_core::error::HoardError;

/// Result type for archive operations
pub type ArchiveResult<T> = Result<T, HoardError>;
