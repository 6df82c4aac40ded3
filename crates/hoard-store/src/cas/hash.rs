//! Content hashing utilities using Blake3
//!
//! This module provides the ContentHash type used to name blobs and
//! to feed the dedup filter.

use blake3::Hasher;
use hoard_core::error::HoardError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A Blake3 content hash for content-addressable storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContentHash {
    /// The raw hash bytes (32 bytes for Blake3)
    bytes: [u8; 32],
}

impl ContentHash {
    /// Create a new ContentHash from raw bytes
    pub fn new(bytes: [u8; 32]) -> Self {
        Self { bytes }
    }

    /// Create a new ContentHash from a Vec<u8>
    pub fn from_vec(bytes: Vec<u8>) -> Result<Self, HoardError> {
        if bytes.len() != 32 {
            return Err(HoardError::validation(
                "hash",
                format!("expected 32 bytes, got {}", bytes.len()),
            ));
        }
        let mut array = [0u8; 32];
        array.copy_from_slice(&bytes);
        Ok(Self { bytes: array })
    }

    /// Convert hash to hexadecimal string
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// Create ContentHash from hexadecimal string
    pub fn from_hex(hex_str: &str) -> Result<Self, HoardError> {
        let bytes = hex::decode(hex_str)
            .map_err(|e| HoardError::validation("hash", format!("invalid hex: {}", e)))?;
        Self::from_vec(bytes)
    }

    /// Raw digest bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Compute Blake3 hash of content
pub fn compute_hash(content: &[u8]) -> ContentHash {
    let mut hasher = Hasher::new();
    hasher.update(content);
    let hash = hasher.finalize();
    ContentHash::new(*hash.as_bytes())
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;
    use proptest::test_runner::Config as ProptestConfig;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]
        /// Hashing is deterministic and the hex form round-trips.
        #[test]
        fn hash_determinism_property(content in prop::collection::vec(any::<u8>(), 0..1000)) {
            let hash1 = compute_hash(&content);
            let hash2 = compute_hash(&content);
            prop_assert_eq!(hash1, hash2);

            let hex = hash1.to_hex();
            prop_assert_eq!(hex.len(), 64);
            let restored = ContentHash::from_hex(&hex).unwrap();
            prop_assert_eq!(hash1, restored);
        }
    }
}
