//! Counting bloom filter
//!
//! Each slot is a saturating `u8` counter instead of a single bit, which
//! lets content be removed again. Slot positions come from double hashing
//! over a Blake3 digest of the content.

use hoard_core::error::HoardError;
use std::f64::consts::LN_2;

use crate::StoreResult;

/// Probabilistic membership set supporting removal
#[derive(Debug, Clone, PartialEq)]
pub struct CountingBloomFilter {
    counters: Vec<u8>,
    hash_count: u32,
    capacity: u64,
    error_rate: f64,
    item_count: u64,
}

impl CountingBloomFilter {
    /// Size a filter for `expected_items` at the target false-positive rate
    pub fn new(expected_items: u64, error_rate: f64) -> StoreResult<Self> {
        validate_params(expected_items, error_rate)?;

        let slots = optimal_slots(expected_items, error_rate);
        let hash_count = optimal_hash_count(slots, expected_items);

        Ok(Self {
            counters: vec![0; slots],
            hash_count,
            capacity: expected_items,
            error_rate,
            item_count: 0,
        })
    }

    /// Rebuild a filter from persisted parts
    pub fn from_parts(
        counters: Vec<u8>,
        hash_count: u32,
        capacity: u64,
        error_rate: f64,
        item_count: u64,
    ) -> StoreResult<Self> {
        validate_params(capacity, error_rate)?;
        if counters.is_empty() {
            return Err(HoardError::validation("counters", "filter has no slots"));
        }
        if hash_count == 0 {
            return Err(HoardError::validation("hash_count", "must be at least 1"));
        }

        Ok(Self {
            counters,
            hash_count,
            capacity,
            error_rate,
            item_count,
        })
    }

    /// Whether the content may have been added.
    ///
    /// Never false for content that was added and not removed since.
    pub fn has(&self, item: &[u8]) -> bool {
        self.positions(item).all(|pos| self.counters[pos] > 0)
    }

    /// Record the content; counters stop at `u8::MAX`
    pub fn add(&mut self, item: &[u8]) {
        let positions: Vec<usize> = self.positions(item).collect();
        for pos in positions {
            self.counters[pos] = self.counters[pos].saturating_add(1);
        }
        self.item_count = self.item_count.saturating_add(1);
    }

    /// Forget the content. Returns false (and changes nothing) when the
    /// content is not present.
    ///
    /// Saturated counters stay saturated since their true count is unknown.
    pub fn remove(&mut self, item: &[u8]) -> bool {
        if !self.has(item) {
            return false;
        }

        let positions: Vec<usize> = self.positions(item).collect();
        for pos in positions {
            let counter = &mut self.counters[pos];
            if *counter != u8::MAX {
                *counter = counter.saturating_sub(1);
            }
        }
        self.item_count = self.item_count.saturating_sub(1);
        true
    }

    /// Reset every counter to zero
    pub fn clear(&mut self) {
        self.counters.iter_mut().for_each(|c| *c = 0);
        self.item_count = 0;
    }

    /// Number of adds minus successful removes
    pub fn len(&self) -> u64 {
        self.item_count
    }

    pub fn is_empty(&self) -> bool {
        self.item_count == 0
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    pub fn error_rate(&self) -> f64 {
        self.error_rate
    }

    pub fn hash_count(&self) -> u32 {
        self.hash_count
    }

    pub fn counters(&self) -> &[u8] {
        &self.counters
    }

    /// False-positive rate expected at the current fill level
    pub fn estimated_false_positive_rate(&self) -> f64 {
        let k = self.hash_count as f64;
        let n = self.item_count as f64;
        let m = self.counters.len() as f64;
        (1.0 - (-k * n / m).exp()).powf(k)
    }

    fn positions(&self, item: &[u8]) -> impl Iterator<Item = usize> {
        let digest = blake3::hash(item);
        let bytes = digest.as_bytes();
        let mut first = [0u8; 8];
        let mut second = [0u8; 8];
        first.copy_from_slice(&bytes[0..8]);
        second.copy_from_slice(&bytes[8..16]);

        let h1 = u64::from_le_bytes(first);
        // Odd step so the probe sequence does not collapse onto one slot
        let h2 = u64::from_le_bytes(second) | 1;
        let slots = self.counters.len() as u64;

        (0..self.hash_count as u64).map(move |i| (h1.wrapping_add(i.wrapping_mul(h2)) % slots) as usize)
    }
}

fn validate_params(expected_items: u64, error_rate: f64) -> StoreResult<()> {
    if expected_items == 0 {
        return Err(HoardError::validation("expected_items", "must be greater than zero"));
    }
    if !(error_rate > 0.0 && error_rate < 1.0) {
        return Err(HoardError::validation(
            "error_rate",
            format!("{} is not between 0 and 1", error_rate),
        ));
    }
    Ok(())
}

/// Slot count `m = -n ln p / (ln 2)^2`
fn optimal_slots(expected_items: u64, error_rate: f64) -> usize {
    let m = -(expected_items as f64) * error_rate.ln() / (LN_2 * LN_2);
    (m.ceil() as usize).max(1)
}

/// Hash count `k = m / n * ln 2`
fn optimal_hash_count(slots: usize, expected_items: u64) -> u32 {
    let k = (slots as f64 / expected_items as f64) * LN_2;
    (k.round() as u32).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sizing() {
        let filter = CountingBloomFilter::new(1000, 0.01).unwrap();
        // ~9.59 slots per item and 7 hashes at 1%
        assert_eq!(filter.counters().len(), 9586);
        assert_eq!(filter.hash_count(), 7);
        assert!(filter.is_empty());
    }

    #[test]
    fn test_invalid_params() {
        assert!(CountingBloomFilter::new(0, 0.01).is_err());
        assert!(CountingBloomFilter::new(10, 0.0).is_err());
        assert!(CountingBloomFilter::new(10, 1.0).is_err());
        assert!(CountingBloomFilter::new(10, f64::NAN).is_err());
    }

    #[test]
    fn test_add_then_has() {
        let mut filter = CountingBloomFilter::new(100, 0.01).unwrap();
        assert!(!filter.has(b"hello.txt:ABC"));
        filter.add(b"hello.txt:ABC");
        assert!(filter.has(b"hello.txt:ABC"));
        assert_eq!(filter.len(), 1);
    }

    #[test]
    fn test_remove() {
        let mut filter = CountingBloomFilter::new(100, 0.01).unwrap();
        filter.add(b"a");
        filter.add(b"b");
        assert!(filter.remove(b"a"));
        assert!(!filter.has(b"a"));
        assert!(filter.has(b"b"));
        assert_eq!(filter.len(), 1);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut filter = CountingBloomFilter::new(100, 0.01).unwrap();
        filter.add(b"kept");
        let before = filter.clone();
        assert!(!filter.remove(b"never added"));
        assert_eq!(filter, before);
    }

    #[test]
    fn test_duplicate_adds_need_matching_removes() {
        let mut filter = CountingBloomFilter::new(100, 0.01).unwrap();
        filter.add(b"twice");
        filter.add(b"twice");
        assert!(filter.remove(b"twice"));
        assert!(filter.has(b"twice"));
        assert!(filter.remove(b"twice"));
        assert!(!filter.has(b"twice"));
    }

    #[test]
    fn test_counters_saturate() {
        let mut filter = CountingBloomFilter::new(10, 0.1).unwrap();
        for _ in 0..300 {
            filter.add(b"hot");
        }
        assert!(filter.counters().iter().all(|&c| c == 0 || c == u8::MAX));
        // Saturated counters never drop back to zero
        for _ in 0..300 {
            filter.remove(b"hot");
        }
        assert!(filter.has(b"hot"));
    }

    #[test]
    fn test_clear() {
        let mut filter = CountingBloomFilter::new(100, 0.01).unwrap();
        filter.add(b"x");
        filter.clear();
        assert!(!filter.has(b"x"));
        assert!(filter.is_empty());
    }

    #[test]
    fn test_false_positive_rate_is_bounded() {
        let mut filter = CountingBloomFilter::new(1000, 0.01).unwrap();
        for i in 0..1000u32 {
            filter.add(format!("stored-{}", i).as_bytes());
        }

        let trials = 10_000u32;
        let false_positives = (0..trials)
            .filter(|i| filter.has(format!("absent-{}", i).as_bytes()))
            .count();
        // Generous margin over the configured 1%
        assert!(false_positives < 300, "{} false positives", false_positives);
        assert!(filter.estimated_false_positive_rate() < 0.02);
    }

    #[test]
    fn test_from_parts_validates() {
        assert!(CountingBloomFilter::from_parts(vec![], 3, 10, 0.01, 0).is_err());
        assert!(CountingBloomFilter::from_parts(vec![0; 8], 0, 10, 0.01, 0).is_err());
        assert!(CountingBloomFilter::from_parts(vec![0; 8], 3, 10, 0.01, 0).is_ok());
    }
}
