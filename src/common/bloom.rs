// Copyright 2025 Stoolap Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Bloom filter for semi-join probing
//!
//! Built from the key fields of one input and bound for the probe side. A
//! negative answer is definite, a positive answer may be a false positive
//! and is confirmed by running the positive-match sub-plan.

/// Minimum bloom filter size in bits
const MIN_FILTER_BITS: usize = 64;

/// Maximum bloom filter size in bits
const MAX_FILTER_BITS: usize = 8_000_000;

/// A space-efficient probabilistic set of key hashes
#[derive(Debug, Clone)]
pub struct BloomFilter {
    /// Bit array stored as u64 words
    bits: Vec<u64>,
    /// Number of bits in the filter
    num_bits: usize,
    /// Number of hash functions
    num_hashes: usize,
    /// Number of keys inserted
    element_count: u64,
}

impl BloomFilter {
    /// Create a filter sized for `expected_elements` keys at the given false
    /// positive rate
    pub fn new(expected_elements: usize, false_positive_rate: f64) -> Self {
        let fp_rate = false_positive_rate.clamp(0.0001, 0.5);
        let n = expected_elements.max(1) as f64;

        // m = -n * ln(p) / (ln(2)^2)
        let ln2_squared = std::f64::consts::LN_2 * std::f64::consts::LN_2;
        let optimal_bits = (-n * fp_rate.ln() / ln2_squared).ceil() as usize;
        let num_bits = optimal_bits.clamp(MIN_FILTER_BITS, MAX_FILTER_BITS);
        let num_bits = num_bits.div_ceil(64) * 64;

        // k = (m/n) * ln(2)
        let optimal_hashes = ((num_bits as f64 / n) * std::f64::consts::LN_2).ceil() as usize;
        let num_hashes = optimal_hashes.clamp(1, 15);

        Self {
            bits: vec![0u64; num_bits / 64],
            num_bits,
            num_hashes,
            element_count: 0,
        }
    }

    /// Insert a pre-computed key hash
    pub fn insert_hash(&mut self, hash: u64) {
        for i in 0..self.num_hashes {
            let bit = self.bit_index(hash, i);
            self.bits[bit / 64] |= 1u64 << (bit % 64);
        }
        self.element_count += 1;
    }

    /// `false` means the key was definitely never inserted
    pub fn might_contain_hash(&self, hash: u64) -> bool {
        (0..self.num_hashes).all(|i| {
            let bit = self.bit_index(hash, i);
            self.bits[bit / 64] & (1u64 << (bit % 64)) != 0
        })
    }

    /// Double hashing: h(i) = h1 + i*h2 + i^2
    fn bit_index(&self, hash: u64, i: usize) -> usize {
        let h1 = hash as usize;
        let h2 = (hash >> 32) as usize;
        h1.wrapping_add(i.wrapping_mul(h2)).wrapping_add(i * i) % self.num_bits
    }

    /// Estimated false positive rate for the current fill
    pub fn estimated_false_positive_rate(&self) -> f64 {
        if self.element_count == 0 {
            return 0.0;
        }
        // (1 - e^(-kn/m))^k
        let k = self.num_hashes as f64;
        let n = self.element_count as f64;
        let m = self.num_bits as f64;
        (1.0 - (-k * n / m).exp()).powf(k)
    }

    pub fn len(&self) -> u64 {
        self.element_count
    }

    pub fn is_empty(&self) -> bool {
        self.element_count == 0
    }

    pub fn num_bits(&self) -> usize {
        self.num_bits
    }

    pub fn num_hashes(&self) -> usize {
        self.num_hashes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_false_negatives() {
        let mut filter = BloomFilter::new(1000, 0.01);
        for i in 0..1000u64 {
            filter.insert_hash(i.wrapping_mul(0x9E37_79B9_7F4A_7C15));
        }
        for i in 0..1000u64 {
            assert!(filter.might_contain_hash(i.wrapping_mul(0x9E37_79B9_7F4A_7C15)));
        }
        assert_eq!(filter.len(), 1000);
    }

    #[test]
    fn test_false_positive_rate_is_bounded() {
        let mut filter = BloomFilter::new(1000, 0.01);
        for i in 0..1000u64 {
            filter.insert_hash(i.wrapping_mul(0x9E37_79B9_7F4A_7C15));
        }
        let false_positives = (1000..11000u64)
            .filter(|i| filter.might_contain_hash(i.wrapping_mul(0x9E37_79B9_7F4A_7C15)))
            .count();
        assert!(false_positives < 500, "fp = {}", false_positives);
        assert!(filter.estimated_false_positive_rate() < 0.05);
    }

    #[test]
    fn test_sizing_clamps() {
        let tiny = BloomFilter::new(0, 0.01);
        assert_eq!(tiny.num_bits(), 64);
        assert!(tiny.num_hashes() >= 1 && tiny.num_hashes() <= 15);
        assert!(tiny.is_empty());
        assert!(!tiny.might_contain_hash(42));
    }
}
