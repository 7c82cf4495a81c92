use std::io;

use crate::model::ModelError;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SpellerError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Delete-index cache could not be decoded
    #[error("Invalid delete index cache: {0}")]
    InvalidCache(String),

    /// Delete-index cache was built for a different model
    #[error("Delete index cache belongs to model {found:#010x}, expected {expected:#010x}")]
    StaleCache { expected: u32, found: u32 },

    /// Corrector config file is not valid JSON for [`super::CorrectorConfig`]
    #[error("Invalid corrector config: {0}")]
    Config(#[from] serde_json::Error),

    #[error("No language model is loaded")]
    ModelNotLoaded,
}
