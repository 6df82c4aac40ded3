//! Configuration parsing for hoard
//!
//! This crate handles parsing and validation of hoard.toml, layering in
//! the global config file, `HOARD_*` environment variables and command
//! line overrides.

pub mod merge;
pub mod toml;

// Re-export main types
pub use merge::{ConfigLayering, ConfigLoader, ConfigSource};
pub use toml::{
    ArchiveSection, DedupSection, HoardToml, RecordsBackend, RecordsSection, StorageSection,
};

use hoard_core::error::HoardError;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, HoardError>;
