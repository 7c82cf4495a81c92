use std::io::{self, Read, Write};

use xxhash_rust::xxh3::xxh3_64_with_seed;

use super::error::ModelError;
use super::perfect_hash::PerfectHash;
use crate::binary::{invalid_data, BinaryFormat};
use crate::constants::{MAX_GRAM_KEY_SIZE, MAX_GRAM_ORDER, VERIFICATION_SEED};
use crate::types::{GramCount, WordId};

/// Fixed-width byte encoding of a 1, 2 or 3 word id sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GramKey {
    bytes: [u8; MAX_GRAM_KEY_SIZE],
    len: u8,
}

impl GramKey {
    /// # Panics
    ///
    /// Panics unless `ids` holds between one and three ids.
    pub fn new(ids: &[WordId]) -> GramKey {
        assert!(
            !ids.is_empty() && ids.len() <= MAX_GRAM_ORDER,
            "n-gram of order {} is not supported",
            ids.len()
        );

        let mut bytes = [0u8; MAX_GRAM_KEY_SIZE];
        for (chunk, id) in bytes.chunks_exact_mut(4).zip(ids) {
            chunk.copy_from_slice(&id.to_le_bytes());
        }

        GramKey {
            bytes,
            len: (ids.len() * 4) as u8,
        }
    }

    #[inline(always)]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    #[inline(always)]
    pub fn verification_hash(&self) -> u16 {
        xxh3_64_with_seed(self.as_bytes(), VERIFICATION_SEED) as u16
    }
}

impl AsRef<[u8]> for GramKey {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

/// One perfect-hash slot: a stand-in for a `key -> count` entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Bucket {
    pub verification: u16,
    pub count: GramCount,
}

impl BinaryFormat for Bucket {
    fn write_to<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<()> {
        self.verification.write_to(out)?;
        self.count.write_to(out)
    }

    fn read_from<R: Read + ?Sized>(input: &mut R) -> io::Result<Self> {
        let verification = u16::read_from(input)?;
        let count = u16::read_from(input)?;
        Ok(Bucket {
            verification,
            count,
        })
    }
}

/// Saturating n-gram counters addressed through a perfect hash.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GramTable {
    buckets: Vec<Bucket>,
    hash: PerfectHash,
}

impl GramTable {
    /// Allocates zeroed buckets for the distinct `keys`.
    pub fn build(keys: &[GramKey]) -> Result<GramTable, ModelError> {
        let hash = PerfectHash::build(keys)?;
        Ok(GramTable {
            buckets: vec![Bucket::default(); hash.buckets_number()],
            hash,
        })
    }

    /// Counts one occurrence of a trained key, saturating at the counter maximum.
    pub fn increment(&mut self, key: &GramKey) {
        let bucket = &mut self.buckets[self.hash.hash(key.as_bytes())];
        bucket.verification = key.verification_hash();
        bucket.count = bucket.count.saturating_add(1);
    }

    /// Stored count for `key`, or 0 if the slot belongs to another key.
    #[inline(always)]
    pub fn count(&self, key: &GramKey) -> GramCount {
        let bucket = &self.buckets[self.hash.hash(key.as_bytes())];
        if bucket.verification == key.verification_hash() {
            bucket.count
        } else {
            0
        }
    }

    #[inline(always)]
    pub fn buckets_number(&self) -> usize {
        self.buckets.len()
    }

    #[inline(always)]
    pub fn is_built(&self) -> bool {
        self.hash.is_built()
    }
}

impl BinaryFormat for GramTable {
    fn write_to<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<()> {
        self.buckets.write_to(out)?;
        self.hash.write_to(out)
    }

    fn read_from<R: Read + ?Sized>(input: &mut R) -> io::Result<Self> {
        let buckets = Vec::<Bucket>::read_from(input)?;
        let hash = PerfectHash::read_from(input)?;

        if buckets.len() != hash.buckets_number() {
            return Err(invalid_data(format!(
                "{} buckets for a perfect hash of {} slots",
                buckets.len(),
                hash.buckets_number()
            )));
        }

        Ok(GramTable { buckets, hash })
    }
}
