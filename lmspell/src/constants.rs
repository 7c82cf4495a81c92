pub const MODEL_MAGIC: u64 = 0x4c4d_5350_454c_4c4d;
pub const MODEL_VERSION: u32 = 1;

pub const CACHE_MAGIC: u64 = 0x4c4d_5350_454c_4c43;
pub const CACHE_VERSION: u32 = 2;
/// Magic and version.
pub const CACHE_HEADER_SIZE: usize = 12;
pub const CACHE_EXTENSION: &str = "spell";

/// Serialized size of one n-gram bucket: verification hash + count.
pub const BUCKET_SIZE: usize = 4;
/// Widest n-gram key: three little-endian word ids.
pub const MAX_GRAM_KEY_SIZE: usize = 12;
pub const MAX_GRAM_ORDER: usize = 3;

pub const SENTENCE_TERMINATORS: &[char] = &['.', '!', '?'];

pub const DEFAULT_K: f64 = 0.05;

pub const DELETES1_FALSE_POSITIVE_RATE: f64 = 0.001;
pub const DELETES2_FALSE_POSITIVE_RATE: f64 = 0.01;

pub const VERIFICATION_SEED: u64 = 0x5eed_0f_c0ffee;
pub const PERFECT_HASH_SEED: u64 = 0x243f_6a88_85a3_08d3;
pub const PERFECT_HASH_SEED_ATTEMPTS: u64 = 16;
pub const PERFECT_HASH_MAX_PILOT: u32 = 1 << 20;
pub const PERFECT_HASH_GROUP_SIZE: usize = 3;
