//! Approximate set membership for deletion variants.

use std::io::{self, Read, Write};

use xxhash_rust::xxh3::xxh3_128;

use crate::binary::{invalid_data, BinaryFormat};

/// Bloom filter with `k` probes derived by double hashing one 128-bit hash.
///
/// Never reports a false negative; false positives occur at roughly the rate
/// the filter was sized for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BloomFilter {
    bits: Vec<u64>,
    num_bits: u64,
    num_hashes: u8,
}

impl BloomFilter {
    /// Sizes the filter for `expected_items` at `false_positive_rate`,
    /// using m = -n*ln(p) / (ln2)^2 and k = (m/n)*ln2.
    pub fn new(expected_items: usize, false_positive_rate: f64) -> BloomFilter {
        let n = (expected_items as f64).max(1.0);
        let p = false_positive_rate.clamp(1e-10, 0.5);
        let ln2 = std::f64::consts::LN_2;

        let m = ((-n * p.ln()) / (ln2 * ln2)).ceil() as u64;
        let m = m.max(64);
        let k = ((m as f64 / n) * ln2).ceil() as u8;
        let k = k.clamp(1, 16);

        BloomFilter {
            bits: vec![0u64; ((m + 63) / 64) as usize],
            num_bits: m,
            num_hashes: k,
        }
    }

    #[inline(always)]
    fn probes(&self, item: &[u8]) -> impl Iterator<Item = u64> {
        let hash = xxh3_128(item);
        let h1 = hash as u64;
        // A zero step would collapse every probe onto the first one.
        let h2 = ((hash >> 64) as u64) | 1;
        let num_bits = self.num_bits;
        (0..self.num_hashes as u64).map(move |i| h1.wrapping_add(i.wrapping_mul(h2)) % num_bits)
    }

    pub fn insert(&mut self, item: &[u8]) {
        for pos in self.probes(item) {
            self.bits[(pos / 64) as usize] |= 1u64 << (pos % 64);
        }
    }

    /// `false` means `item` was definitely never inserted.
    #[inline(always)]
    pub fn contains(&self, item: &[u8]) -> bool {
        self.probes(item)
            .all(|pos| self.bits[(pos / 64) as usize] & (1u64 << (pos % 64)) != 0)
    }

    pub fn num_bits(&self) -> u64 {
        self.num_bits
    }

    pub fn num_hashes(&self) -> u8 {
        self.num_hashes
    }
}

impl BinaryFormat for BloomFilter {
    fn write_to<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<()> {
        self.num_bits.write_to(out)?;
        self.num_hashes.write_to(out)?;
        self.bits.write_to(out)
    }

    fn read_from<R: Read + ?Sized>(input: &mut R) -> io::Result<Self> {
        let num_bits = u64::read_from(input)?;
        let num_hashes = u8::read_from(input)?;
        let bits = Vec::<u64>::read_from(input)?;

        if num_bits == 0 || num_hashes == 0 {
            return Err(invalid_data("bloom filter has no bits or no hashes"));
        }
        if num_bits.checked_add(63).map(|n| n / 64) != Some(bits.len() as u64) {
            return Err(invalid_data(format!(
                "bloom filter of {} bits stored in {} words",
                num_bits,
                bits.len()
            )));
        }

        Ok(BloomFilter {
            bits,
            num_bits,
            num_hashes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_false_negatives() {
        let mut filter = BloomFilter::new(1000, 0.01);
        for i in 0..1000u32 {
            filter.insert(&i.to_le_bytes());
        }

        for i in 0..1000u32 {
            assert!(filter.contains(&i.to_le_bytes()), "missing {}", i);
        }
    }

    #[test]
    fn false_positive_rate_is_bounded() {
        let mut filter = BloomFilter::new(1000, 0.01);
        for i in 0..1000u32 {
            filter.insert(&i.to_le_bytes());
        }

        let hits = (10_000..20_000u32)
            .filter(|i| filter.contains(&i.to_le_bytes()))
            .count();
        let rate = hits as f64 / 10_000.0;
        assert!(rate < 0.05, "false positive rate {:.3}", rate);
    }

    #[test]
    fn empty_filter_contains_nothing() {
        let filter = BloomFilter::new(0, 0.001);

        assert!(filter.num_bits() >= 64);
        assert!(!filter.contains(b"word"));
    }

    #[test]
    fn decoded_filter_answers_identically() {
        let mut filter = BloomFilter::new(10, 0.001);
        filter.insert("cat".as_bytes());
        let bytes = crate::binary::to_bytes(&filter).unwrap();
        let decoded = BloomFilter::read_from(&mut std::io::Cursor::new(bytes)).unwrap();

        assert_eq!(decoded, filter);
        assert!(decoded.contains("cat".as_bytes()));
    }

    #[test]
    fn rejects_bit_count_that_does_not_match_storage() {
        let filter = BloomFilter::new(10, 0.001);
        let bytes = crate::binary::to_bytes(&filter).unwrap();

        for num_bits in [u64::MAX, u64::MAX - 62, filter.num_bits() + 64] {
            let mut bytes = bytes.clone();
            bytes[..8].copy_from_slice(&num_bits.to_le_bytes());
            let err = BloomFilter::read_from(&mut std::io::Cursor::new(bytes)).unwrap_err();
            assert_eq!(err.kind(), std::io::ErrorKind::InvalidData, "{} bits", num_bits);
        }
    }
}
