//! Terminal output formatting and utilities.
//!
//! Human-readable output goes to stdout, errors to stderr. Colors follow
//! `ColorSupport::detect`, so piping the output gives plain text.

pub mod colors;
pub mod errors;
pub mod progress;

use hoard_core::error::{HoardError, HoardResult};
use serde::Serialize;

/// Output handler for consistent terminal formatting
pub struct OutputHandler {
    colors: colors::ColorSupport,
}

impl OutputHandler {
    /// Create a new output handler
    pub fn new() -> Self {
        Self {
            colors: colors::ColorSupport::detect(),
        }
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        println!("{}", message);
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        println!("{} {}", self.colors.green("✓"), message);
    }

    /// Print a warning message
    pub fn warn(&self, message: &str) {
        println!("{} {}", self.colors.yellow("⚠"), message);
    }

    /// Print an error message
    pub fn error(&self, message: &str) {
        eprintln!("{} {}", self.colors.red("✗"), message);
    }

    /// Print a step message with a bold label
    pub fn step(&self, label: &str, message: &str) {
        println!("{} {}", self.colors.bold(label), message);
    }

    /// Print an aligned `label: value` line
    pub fn field(&self, label: &str, value: &str) {
        println!("{} {}", self.colors.dim(&format!("{:>16}:", label)), value);
    }

    /// Print a value as pretty JSON
    pub fn json<T: Serialize>(&self, value: &T) -> HoardResult<()> {
        let rendered = serde_json::to_string_pretty(value).map_err(|e| HoardError::Persistence {
            message: "Failed to render JSON output".to_string(),
            source: Some(Box::new(e)),
        })?;
        println!("{}", rendered);
        Ok(())
    }
}

impl Default for OutputHandler {
    fn default() -> Self {
        Self::new()
    }
}
