//! Core data types for hoard.
//!
//! This module provides the fundamental types used throughout hoard:
//! - File identifiers and the record stored per upload
//! - Delivery path and archive scope selectors for downloads

pub mod delivery;
pub mod record;

// Re-export all public types
pub use delivery::{ArchiveScope, DeliveryPath};
pub use record::{FileId, FileRecord, RecordField};
