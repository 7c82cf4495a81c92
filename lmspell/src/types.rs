/// Dense identifier of a vocabulary word.
pub type WordId = u32;

/// Saturating occurrence counter stored per n-gram bucket.
pub type GramCount = u16;

/// Relative ranking score (sum of log probabilities).
pub type Score = f64;

/// Sentinel id for words outside the vocabulary.
pub const UNKNOWN_WORD_ID: WordId = WordId::MAX;
