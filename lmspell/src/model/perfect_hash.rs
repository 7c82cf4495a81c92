//! Collision-free hashing over a fixed key set.
//!
//! Keys are spread over small groups by their seeded hash. Groups are
//! placed largest first; for each group a pilot value is searched such that
//! every key of the group, remixed with the pilot, lands in a distinct free
//! slot. Only the seed and the per-group pilots are stored. Keys outside the
//! original set still map to some slot, with no guarantee about which.

use std::io::{self, Read, Write};

use xxhash_rust::xxh3::xxh3_64_with_seed;

use super::error::ModelError;
use crate::binary::{invalid_data, BinaryFormat};
use crate::constants::{
    PERFECT_HASH_GROUP_SIZE, PERFECT_HASH_MAX_PILOT, PERFECT_HASH_SEED,
    PERFECT_HASH_SEED_ATTEMPTS,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PerfectHash {
    seed: u64,
    slots: u32,
    pilots: Vec<u32>,
}

#[inline(always)]
fn mix64(mut x: u64) -> u64 {
    x ^= x >> 30;
    x = x.wrapping_mul(0xbf58_476d_1ce4_e5b9);
    x ^= x >> 27;
    x = x.wrapping_mul(0x94d0_49bb_1331_11eb);
    x ^ (x >> 31)
}

#[inline(always)]
fn reduce(hash: u32, n: u32) -> usize {
    ((hash as u64 * n as u64) >> 32) as usize
}

#[inline(always)]
fn group_of(hash: u64, groups: u32) -> usize {
    reduce(hash as u32, groups)
}

#[inline(always)]
fn slot_of(hash: u64, pilot: u32, slots: u32) -> usize {
    let mixed = mix64(hash ^ mix64(pilot as u64 + 1));
    reduce((mixed >> 32) as u32, slots)
}

impl PerfectHash {
    /// Builds a table with no collisions among `keys`, which must be distinct.
    pub fn build<K: AsRef<[u8]>>(keys: &[K]) -> Result<PerfectHash, ModelError> {
        let n = keys.len();
        let slots = u32::try_from(n + n / 4 + 1).map_err(|_| ModelError::PerfectHash(n))?;
        let groups = ((n + PERFECT_HASH_GROUP_SIZE - 1) / PERFECT_HASH_GROUP_SIZE).max(1) as u32;

        for attempt in 0..PERFECT_HASH_SEED_ATTEMPTS {
            let seed = mix64(PERFECT_HASH_SEED.wrapping_add(attempt));
            if let Some(pilots) = Self::search_pilots(keys, seed, slots, groups) {
                log::debug!(
                    "perfect hash over {} keys: {} slots, {} groups, seed attempt {}",
                    n,
                    slots,
                    groups,
                    attempt
                );
                return Ok(PerfectHash {
                    seed,
                    slots,
                    pilots,
                });
            }
            log::debug!("perfect hash seed attempt {} failed, reseeding", attempt);
        }

        Err(ModelError::PerfectHash(n))
    }

    fn search_pilots<K: AsRef<[u8]>>(
        keys: &[K],
        seed: u64,
        slots: u32,
        groups: u32,
    ) -> Option<Vec<u32>> {
        let mut members: Vec<Vec<u64>> = vec![Vec::new(); groups as usize];
        for key in keys {
            let hash = xxh3_64_with_seed(key.as_ref(), seed);
            members[group_of(hash, groups)].push(hash);
        }

        let mut order = (0..groups as usize).collect::<Vec<_>>();
        order.sort_by(|a, b| members[*b].len().cmp(&members[*a].len()));

        let mut taken = vec![false; slots as usize];
        let mut pilots = vec![0u32; groups as usize];
        let mut positions = Vec::with_capacity(PERFECT_HASH_GROUP_SIZE * 4);

        for group in order {
            let hashes = &members[group];
            if hashes.is_empty() {
                break;
            }

            let mut placed = false;
            for pilot in 0..PERFECT_HASH_MAX_PILOT {
                positions.clear();
                let fits = hashes.iter().all(|&hash| {
                    let slot = slot_of(hash, pilot, slots);
                    if taken[slot] || positions.contains(&slot) {
                        false
                    } else {
                        positions.push(slot);
                        true
                    }
                });

                if fits {
                    for &slot in &positions {
                        taken[slot] = true;
                    }
                    pilots[group] = pilot;
                    placed = true;
                    break;
                }
            }

            if !placed {
                return None;
            }
        }

        Some(pilots)
    }

    /// Number of slots addressed by [`PerfectHash::hash`].
    #[inline(always)]
    pub fn buckets_number(&self) -> usize {
        self.slots as usize
    }

    #[inline(always)]
    pub fn is_built(&self) -> bool {
        self.slots > 0
    }

    /// # Panics
    ///
    /// Panics if the table was never built.
    #[inline(always)]
    pub fn hash(&self, key: &[u8]) -> usize {
        assert!(self.is_built(), "perfect hash queried before it was built");
        let hash = xxh3_64_with_seed(key, self.seed);
        let pilot = self.pilots[group_of(hash, self.pilots.len() as u32)];
        slot_of(hash, pilot, self.slots)
    }
}

impl BinaryFormat for PerfectHash {
    fn write_to<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<()> {
        self.seed.write_to(out)?;
        self.slots.write_to(out)?;
        self.pilots.write_to(out)
    }

    fn read_from<R: Read + ?Sized>(input: &mut R) -> io::Result<Self> {
        let seed = u64::read_from(input)?;
        let slots = u32::read_from(input)?;
        let pilots = Vec::<u32>::read_from(input)?;

        if slots == 0 || pilots.is_empty() {
            return Err(invalid_data("perfect hash table is empty"));
        }

        Ok(PerfectHash {
            seed,
            slots,
            pilots,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hashbrown::HashSet;

    fn keys(n: u32) -> Vec<[u8; 4]> {
        (0..n).map(|i| i.to_le_bytes()).collect()
    }

    #[test]
    fn trained_keys_never_collide() {
        let keys = keys(5000);
        let hash = PerfectHash::build(&keys).unwrap();

        let slots = keys.iter().map(|k| hash.hash(k)).collect::<HashSet<_>>();
        assert_eq!(slots.len(), keys.len());
        assert!(slots.iter().all(|&s| s < hash.buckets_number()));
    }

    #[test]
    fn build_is_deterministic() {
        let keys = keys(300);

        assert_eq!(
            PerfectHash::build(&keys).unwrap(),
            PerfectHash::build(&keys).unwrap()
        );
    }

    #[test]
    fn empty_key_set_still_builds() {
        let hash = PerfectHash::build::<[u8; 4]>(&[]).unwrap();

        assert!(hash.is_built());
        assert!(hash.hash(b"anything") < hash.buckets_number());
    }

    #[test]
    #[should_panic(expected = "before it was built")]
    fn unbuilt_table_panics() {
        PerfectHash::default().hash(b"key");
    }

    #[test]
    fn decoded_table_hashes_identically() {
        let keys = keys(100);
        let hash = PerfectHash::build(&keys).unwrap();
        let bytes = crate::binary::to_bytes(&hash).unwrap();
        let decoded = PerfectHash::read_from(&mut std::io::Cursor::new(bytes)).unwrap();

        for key in &keys {
            assert_eq!(decoded.hash(key), hash.hash(key));
        }
    }
}
