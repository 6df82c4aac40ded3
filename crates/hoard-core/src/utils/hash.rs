//! Blake3 hashing utilities for content integrity.

use crate::error::{HoardError, HoardResult};

/// Compute Blake3 hash of data as lowercase hex
pub fn blake3_hash(data: &[u8]) -> String {
    let hash = blake3::hash(data);
    hash.to_hex().to_string()
}

/// Verify data integrity against expected hash
pub fn verify_integrity(data: &[u8], expected_hash: &str) -> HoardResult<()> {
    let actual_hash = blake3_hash(data);
    if actual_hash == expected_hash {
        Ok(())
    } else {
        Err(HoardError::Persistence {
            message: format!(
                "Blob integrity check failed: expected {}, got {}",
                expected_hash, actual_hash
            ),
            source: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blake3_hash() {
        let hash = blake3_hash(b"hello world");

        assert_eq!(hash.len(), 64); // 32 bytes = 64 hex chars
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(hash, hash.to_lowercase());
    }

    #[test]
    fn test_verify_integrity() {
        let data = b"test data";
        let hash = blake3_hash(data);

        assert!(verify_integrity(data, &hash).is_ok());
        assert!(verify_integrity(b"tampered", &hash).is_err());
    }
}
