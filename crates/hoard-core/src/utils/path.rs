//! Filename and path helpers.
//!
//! Blob names and archive keys are built from user-supplied filenames, so
//! everything that reaches the file system goes through these checks.

use crate::error::{HoardError, HoardResult};
use std::path::{Component, Path};

/// Check if a relative path stays inside its base directory
pub fn is_safe_path(path: &Path) -> bool {
    if path.is_absolute() {
        return false;
    }

    let mut depth = 0i32;

    for component in path.components() {
        match component {
            Component::CurDir => {},
            Component::ParentDir => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            },
            Component::Normal(_) => {
                depth += 1;
            },
            _ => {
                return false;
            },
        }
    }

    true
}

/// Extension of a filename including the leading dot, original case kept.
///
/// Returns an empty string when there is none.
pub fn file_extension(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext))
        .unwrap_or_default()
}

/// Percent-decode a declared filename and make sure it is a bare file name
pub fn decode_filename(raw: &str) -> HoardResult<String> {
    let decoded = urlencoding::decode(raw)
        .map_err(|e| HoardError::validation("filename", format!("not valid UTF-8: {}", e)))?
        .into_owned();

    let name = decoded.trim();
    if name.is_empty() {
        return Err(HoardError::validation("filename", "must not be empty"));
    }
    if name.contains('/') || name.contains('\\') || name == "." || name == ".." {
        return Err(HoardError::validation(
            "filename",
            format!("'{}' must be a plain file name", name),
        ));
    }

    Ok(name.to_string())
}
