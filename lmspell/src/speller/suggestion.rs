//! Scored correction candidate.
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::types::Score;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
/// Candidate replacement for one word position
pub struct Suggestion {
    /// the lower-case candidate word-form
    pub value: SmolStr,
    /// language model score after penalties, higher is better
    pub score: Score,
}

impl Suggestion {
    pub fn new(value: SmolStr, score: Score) -> Suggestion {
        Suggestion { value, score }
    }

    /// gets the candidate word-form
    pub fn value(&self) -> &str {
        &self.value
    }

    /// gets the score of the candidate
    pub fn score(&self) -> Score {
        self.score
    }
}
