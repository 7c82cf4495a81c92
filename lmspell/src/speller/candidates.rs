//! Edit-distance candidate generation.
//!
//! Every string one edit away from the input is produced, but only those the
//! delete index accepts are kept. The second edit level only expands
//! variants that could still lie one edit away from a vocabulary word.

use std::iter;

use itertools::Itertools;
use smol_str::SmolStr;

use super::delete_index::DeleteIndex;
use super::CorrectorConfig;
use crate::model::LangModel;
use crate::types::{WordId, UNKNOWN_WORD_ID};

/// A candidate resolved against the vocabulary. `id` is
/// [`UNKNOWN_WORD_ID`] only for the original word when it is not known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub text: SmolStr,
    pub id: WordId,
}

pub(crate) fn for_each_deletion<F: FnMut(&str)>(word: &str, mut f: F) {
    let mut buf = String::with_capacity(word.len());
    for (i, ch) in word.char_indices() {
        buf.clear();
        buf.push_str(&word[..i]);
        buf.push_str(&word[i + ch.len_utf8()..]);
        f(&buf);
    }
}

fn for_each_transpose<F: FnMut(&str)>(word: &str, mut f: F) {
    let mut buf = String::with_capacity(word.len());
    let chars = word.char_indices().collect::<Vec<_>>();
    for pair in chars.windows(2) {
        let (i, a) = pair[0];
        let (j, b) = pair[1];
        if a == b {
            continue;
        }
        buf.clear();
        buf.push_str(&word[..i]);
        buf.push(b);
        buf.push(a);
        buf.push_str(&word[j + b.len_utf8()..]);
        f(&buf);
    }
}

fn for_each_replace<F: FnMut(&str)>(word: &str, letters: &[char], mut f: F) {
    let mut buf = String::with_capacity(word.len() + 4);
    for (i, ch) in word.char_indices() {
        for &letter in letters {
            if letter == ch {
                continue;
            }
            buf.clear();
            buf.push_str(&word[..i]);
            buf.push(letter);
            buf.push_str(&word[i + ch.len_utf8()..]);
            f(&buf);
        }
    }
}

fn for_each_insert<F: FnMut(&str)>(word: &str, letters: &[char], mut f: F) {
    let mut buf = String::with_capacity(word.len() + 4);
    let boundaries = word.char_indices().map(|(i, _)| i).chain(iter::once(word.len()));
    for i in boundaries {
        for &letter in letters {
            buf.clear();
            buf.push_str(&word[..i]);
            buf.push(letter);
            buf.push_str(&word[i..]);
            f(&buf);
        }
    }
}

/// Deletions, adjacent transpositions and substitutions.
fn for_each_rewrite<F: FnMut(&str)>(word: &str, letters: &[char], mut f: F) {
    for_each_deletion(word, &mut f);
    for_each_transpose(word, &mut f);
    for_each_replace(word, letters, &mut f);
}

/// Every string one deletion, transposition, substitution or insertion away
/// from `word`, drawing new characters from `letters` only. Unfiltered, and
/// may contain duplicates.
pub fn edits1(word: &str, letters: &[char]) -> Vec<SmolStr> {
    let mut out = Vec::new();
    for_each_rewrite(word, letters, |v| out.push(SmolStr::from(v)));
    for_each_insert(word, letters, |v| out.push(SmolStr::from(v)));
    out
}

pub struct CandidateGenerator<'a> {
    model: &'a LangModel,
    index: &'a DeleteIndex,
    config: &'a CorrectorConfig,
}

impl<'a> CandidateGenerator<'a> {
    pub fn new(
        model: &'a LangModel,
        index: &'a DeleteIndex,
        config: &'a CorrectorConfig,
    ) -> CandidateGenerator<'a> {
        CandidateGenerator {
            model,
            index,
            config,
        }
    }

    #[inline(always)]
    fn letters(&self) -> &'a [char] {
        self.model.tokenizer().letters()
    }

    /// Variants one edit away that pass `deletes1`.
    pub fn edits(&self, word: &str) -> Vec<SmolStr> {
        self.edits2(word, true)
    }

    /// Like [`CandidateGenerator::edits`]; unless `last_level` is set, also
    /// expands every variant that may be one more edit away from a word.
    pub fn edits2(&self, word: &str, last_level: bool) -> Vec<SmolStr> {
        let mut out = Vec::new();

        for_each_rewrite(word, self.letters(), |variant| {
            if self.index.contains1(variant) {
                out.push(SmolStr::from(variant));
            }
            if !last_level && self.within_one_edit(variant) {
                out.extend(self.edits(variant));
            }
        });

        if last_level {
            self.inserts(word, &mut out);
        } else {
            self.inserts2(word, &mut out);
        }

        out
    }

    /// Insertion branch of the first edit level.
    pub fn inserts(&self, word: &str, out: &mut Vec<SmolStr>) {
        for_each_insert(word, self.letters(), |variant| {
            if self.index.contains1(variant) {
                out.push(SmolStr::from(variant));
            }
        });
    }

    /// Insertion branch of the second edit level.
    pub fn inserts2(&self, word: &str, out: &mut Vec<SmolStr>) {
        for_each_insert(word, self.letters(), |variant| {
            if self.index.contains1(variant) {
                out.push(SmolStr::from(variant));
            }
            if self.within_one_edit(variant) {
                out.extend(self.edits(variant));
            }
        });
    }

    /// False only when no vocabulary word is one edit from `variant`.
    ///
    /// A variant missing a character is itself a deletion of the word;
    /// one with an extra, wrong or swapped character shares a 1-deletion
    /// with it.
    fn within_one_edit(&self, variant: &str) -> bool {
        if self.index.contains2(variant) {
            return true;
        }
        let mut found = false;
        for_each_deletion(variant, |d| found = found || self.index.contains1(d));
        found
    }

    /// Resolves raw candidates against the vocabulary, keeps the most
    /// frequent `max_candidates_to_check` and appends `original` unless it
    /// is already among them.
    pub fn filter_candidates_by_frequency(
        &self,
        candidates: Vec<SmolStr>,
        original: &str,
    ) -> Vec<Candidate> {
        let vocabulary = self.model.vocabulary();

        let mut known = candidates
            .into_iter()
            .filter_map(|text| match self.model.get_word_id(&text) {
                UNKNOWN_WORD_ID => None,
                id => Some(Candidate { text, id }),
            })
            .unique_by(|candidate| candidate.id)
            .filter(|candidate| {
                vocabulary.get_word_count(candidate.id) >= self.config.min_candidate_frequency
            })
            .collect::<Vec<_>>();

        known.sort_by(|a, b| {
            vocabulary
                .get_word_count(b.id)
                .cmp(&vocabulary.get_word_count(a.id))
        });
        known.truncate(self.config.max_candidates_to_check);

        if !known.iter().any(|candidate| candidate.text == original) {
            known.push(Candidate {
                text: SmolStr::from(original),
                id: self.model.get_word_id(original),
            });
        }

        known
    }

    /// Candidates for one lower-cased word, bounded by the configured edit
    /// distance and candidate limit. The word itself is always included.
    pub fn candidates(&self, word: &str) -> Vec<Candidate> {
        let raw = match self.config.max_edit_distance {
            0 => Vec::new(),
            1 => self.edits(word),
            _ => self.edits2(word, false),
        };
        self.filter_candidates_by_frequency(raw, word)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALPHABET: &str = "abcdefghijklmnopqrstuvwxyz";

    fn setup(corpus: &str) -> (LangModel, DeleteIndex) {
        let mut model = LangModel::default();
        model.train_text(corpus, ALPHABET).unwrap();
        let index = DeleteIndex::build(&model);
        (model, index)
    }

    #[test]
    fn edits1_covers_every_operation() {
        let letters = ['a', 'b', 'c'];
        let edits = edits1("ab", &letters);

        for expected in &["a", "b", "ba", "aab", "abb", "bab", "cab", "abc", "cb", "ac"] {
            assert!(
                edits.iter().any(|e| e == expected),
                "{:?} missing from {:?}",
                expected,
                edits
            );
        }
        assert!(edits
            .iter()
            .all(|e| e.chars().all(|ch| letters.contains(&ch))));
        assert!(!edits.iter().any(|e| e == "ab"));
    }

    #[test]
    fn edits1_handles_multibyte_letters() {
        let edits = edits1("дм", &['д', 'о', 'м']);

        assert!(edits.iter().any(|e| e == "дом"));
        assert!(edits.iter().any(|e| e == "мд"));
        assert!(edits.iter().any(|e| e == "д"));
    }

    #[test]
    fn edits_finds_single_typos() {
        let (model, index) = setup("the cat sat. the dog sat.");
        let config = CorrectorConfig::default();
        let generator = CandidateGenerator::new(&model, &index, &config);

        assert!(generator.edits("teh").iter().any(|e| e == "the"));
        assert!(generator.edits("xat").iter().any(|e| e == "cat"));
        assert!(generator.edits("dg").iter().any(|e| e == "dog"));
        assert!(generator.edits("caat").iter().any(|e| e == "cat"));
    }

    #[test]
    fn edits2_reaches_second_level() {
        let (model, index) = setup("the cat sat. the dog sat.");
        let config = CorrectorConfig::default();
        let generator = CandidateGenerator::new(&model, &index, &config);

        assert!(!generator.edits("sxtt").iter().any(|e| e == "sat"));
        assert!(generator.edits2("sxtt", false).iter().any(|e| e == "sat"));
        assert!(generator.edits2("t", false).iter().any(|e| e == "cat"));
        assert!(generator.edits2("hte", false).iter().any(|e| e == "the"));
    }

    #[test]
    fn filter_drops_unknown_and_duplicates() {
        let (model, index) = setup("the cat sat. the dog sat. a cat.");
        let config = CorrectorConfig::default();
        let generator = CandidateGenerator::new(&model, &index, &config);

        let raw = vec!["cat".into(), "zzz".into(), "sat".into(), "cat".into()];
        let filtered = generator.filter_candidates_by_frequency(raw, "xat");
        let texts = filtered.iter().map(|c| c.text.as_str()).collect::<Vec<_>>();

        assert_eq!(texts, vec!["cat", "sat", "xat"]);
        assert_eq!(filtered[2].id, UNKNOWN_WORD_ID);
    }

    #[test]
    fn filter_keeps_most_frequent() {
        let (model, index) = setup("the cat sat. the dog sat. the cat.");
        let config = CorrectorConfig {
            max_candidates_to_check: 1,
            ..CorrectorConfig::default()
        };
        let generator = CandidateGenerator::new(&model, &index, &config);

        let raw = vec!["dog".into(), "sat".into(), "cat".into()];
        let filtered = generator.filter_candidates_by_frequency(raw, "dog");
        let texts = filtered.iter().map(|c| c.text.as_str()).collect::<Vec<_>>();

        assert_eq!(texts, vec!["sat", "dog"]);
    }

    #[test]
    fn frequency_floor_applies() {
        let (model, index) = setup("the cat sat. the dog sat.");
        let config = CorrectorConfig {
            min_candidate_frequency: 2,
            ..CorrectorConfig::default()
        };
        let generator = CandidateGenerator::new(&model, &index, &config);

        let raw = vec!["cat".into(), "sat".into()];
        let filtered = generator.filter_candidates_by_frequency(raw, "xat");
        let texts = filtered.iter().map(|c| c.text.as_str()).collect::<Vec<_>>();

        assert_eq!(texts, vec!["sat", "xat"]);
    }

    #[test]
    fn candidates_include_the_word_itself() {
        let (model, index) = setup("the cat sat. the dog sat.");
        let config = CorrectorConfig {
            max_edit_distance: 0,
            ..CorrectorConfig::default()
        };
        let generator = CandidateGenerator::new(&model, &index, &config);

        let candidates = generator.candidates("cat");
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].text, "cat");
        assert_eq!(candidates[0].id, model.get_word_id("cat"));
    }
}
