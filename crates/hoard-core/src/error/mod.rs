//! Error types and result aliases for hoard operations.
//!
//! Provides a unified error type that covers every failure a hoard
//! operation can surface, with actionable messages.

use thiserror::Error;

/// Unified error type for all hoard operations
#[derive(Error, Debug)]
pub enum HoardError {
    // Caller input errors
    #[error("Invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("{kind} '{key}' not found")]
    NotFound { kind: String, key: String },

    #[error("Delivery path '{feature}' is not supported yet")]
    Unsupported { feature: String },

    // Durable state errors
    #[error("Persistence error: {message}")]
    Persistence {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // Remote archive errors
    #[error("Remote archive error: {message}")]
    RemoteArchive {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // Config errors
    #[error("Failed to parse hoard.toml: {message}")]
    TomlParse { message: String },

    #[error("Configuration field '{field}' is invalid: {reason}")]
    ConfigValidation { field: String, reason: String },

    // IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for hoard operations
pub type HoardResult<T> = Result<T, HoardError>;

impl HoardError {
    /// Create a validation error for a named input
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a not-found error
    pub fn not_found(kind: impl Into<String>, key: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            key: key.into(),
        }
    }

    /// Create a persistence error from any error type
    pub fn persistence<E>(message: String, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Persistence {
            message,
            source: Some(Box::new(source)),
        }
    }

    /// Create a persistence error with no underlying cause
    pub fn persistence_msg(message: impl Into<String>) -> Self {
        Self::Persistence {
            message: message.into(),
            source: None,
        }
    }

    /// Create a remote archive error from any error type
    pub fn remote<E>(message: String, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::RemoteArchive {
            message,
            source: Some(Box::new(source)),
        }
    }

    /// Create an IO error from std::io::Error
    pub fn io(message: String, source: std::io::Error) -> Self {
        Self::Io { message, source }
    }

    /// Check whether the caller may reasonably retry the operation.
    ///
    /// Nothing in hoard retries on its own; this only informs callers.
    pub fn is_retryable(&self) -> bool {
        matches!(self, HoardError::RemoteArchive { .. } | HoardError::Io { .. })
    }

    /// Check if this error means the requested file is gone
    pub fn is_not_found(&self) -> bool {
        matches!(self, HoardError::NotFound { .. })
    }

    /// Get a user-friendly suggestion for fixing this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            HoardError::NotFound { .. } => {
                Some("The file may have expired or been deleted; upload it again")
            },
            HoardError::Unsupported { .. } => Some("Use the 'local' or 'staging-area' delivery path"),
            HoardError::Persistence { .. } => {
                Some("Check that the records file and blob directory are writable")
            },
            HoardError::RemoteArchive { .. } => Some("Check the archive location and try again"),
            HoardError::ConfigValidation { .. } | HoardError::TomlParse { .. } => {
                Some("Fix hoard.toml or the HOARD_* environment variables")
            },
            _ => None,
        }
    }
}
