//! # hoard-core
//!
//! Core types and utilities shared across all hoard crates.
//!
//! This crate provides:
//! - `FileId` and `FileRecord`, the identity and metadata of an upload
//! - `DeliveryPath` and `ArchiveScope` selectors used by downloads
//! - `HoardError` for unified error handling
//! - Hashing and filename helpers
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `types`: Core data types (FileId, FileRecord, DeliveryPath, etc.)
//! - `error`: Error types and result aliases
//! - `utils`: Utility functions and helpers

pub mod error;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use error::{HoardError, HoardResult};
pub use types::{ArchiveScope, DeliveryPath, FileId, FileRecord, RecordField};
