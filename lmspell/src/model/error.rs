//! Errors raised while training, loading or saving a language model.

use std::io;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ModelError {
    /// Underlying file could not be read or written
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// File does not start with the model magic constant
    #[error("Not a language model file (bad magic {0:#018x})")]
    BadMagic(u64),

    /// File was written by an incompatible format version
    #[error("Unsupported model format version {0}")]
    UnsupportedVersion(u32),

    /// Stored checksum does not match the decoded contents
    #[error("Checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    ChecksumMismatch { stored: u32, computed: u32 },

    /// Stream ended before every field was read
    #[error("Model file is truncated")]
    Truncated,

    /// Stream decoded into values that violate the model invariants
    #[error("Model file is corrupt: {0}")]
    Corrupt(String),

    /// Alphabet has no letters after case folding
    #[error("Alphabet is empty")]
    EmptyAlphabet,

    /// Training text contained no word made of alphabet letters
    #[error("Training corpus contains no words")]
    EmptyCorpus,

    /// No collision-free table could be found for the n-gram keys
    #[error("Failed to build perfect hash over {0} keys")]
    PerfectHash(usize),
}

impl ModelError {
    /// Classifies a decoding failure from the binary reader.
    pub(crate) fn from_decode(err: io::Error) -> ModelError {
        match err.kind() {
            io::ErrorKind::UnexpectedEof => ModelError::Truncated,
            io::ErrorKind::InvalidData => ModelError::Corrupt(err.to_string()),
            _ => ModelError::Io(err),
        }
    }
}
