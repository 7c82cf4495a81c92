use std::io::{self, Read, Write};

use hashbrown::HashMap;
use smol_str::SmolStr;

use crate::binary::{invalid_data, BinaryFormat};
use crate::types::{WordId, UNKNOWN_WORD_ID};

/// Bidirectional word/id table.
///
/// Words live in an arena indexed by id; the reverse map stores ids, never
/// references into the arena.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    words: Vec<SmolStr>,
    counts: Vec<u64>,
    word_to_id: HashMap<SmolStr, WordId>,
    total_words: u64,
}

impl Vocabulary {
    pub fn new() -> Vocabulary {
        Vocabulary::default()
    }

    /// Training lookup: assigns the next id to unseen words and counts
    /// the occurrence.
    pub fn get_word_id(&mut self, word: &str) -> WordId {
        let id = match self.word_to_id.get(word) {
            Some(&id) => id,
            None => {
                let id = self.words.len() as WordId;
                assert!(id != UNKNOWN_WORD_ID, "vocabulary id space exhausted");
                let word = SmolStr::from(word);
                self.words.push(word.clone());
                self.counts.push(0);
                self.word_to_id.insert(word, id);
                id
            }
        };

        self.counts[id as usize] += 1;
        self.total_words += 1;
        id
    }

    /// Inference lookup. Returns [`UNKNOWN_WORD_ID`] for unseen words.
    #[inline(always)]
    pub fn get_word_id_no_create(&self, word: &str) -> WordId {
        self.word_to_id
            .get(word)
            .copied()
            .unwrap_or(UNKNOWN_WORD_ID)
    }

    /// # Panics
    ///
    /// Panics if `id` is not below [`Vocabulary::last_word_id`].
    #[inline(always)]
    pub fn get_word_by_id(&self, id: WordId) -> &str {
        match self.words.get(id as usize) {
            Some(word) => word,
            None => panic!(
                "word id {} out of range (last word id {})",
                id,
                self.last_word_id()
            ),
        }
    }

    /// # Panics
    ///
    /// Panics if `id` is not below [`Vocabulary::last_word_id`].
    #[inline(always)]
    pub fn get_word_count(&self, id: WordId) -> u64 {
        match self.counts.get(id as usize) {
            Some(&count) => count,
            None => panic!(
                "word id {} out of range (last word id {})",
                id,
                self.last_word_id()
            ),
        }
    }

    /// One past the highest assigned id.
    #[inline(always)]
    pub fn last_word_id(&self) -> WordId {
        self.words.len() as WordId
    }

    #[inline(always)]
    pub fn vocab_size(&self) -> usize {
        self.words.len()
    }

    #[inline(always)]
    pub fn total_words(&self) -> u64 {
        self.total_words
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (WordId, &str)> + '_ {
        self.words
            .iter()
            .enumerate()
            .map(|(id, word)| (id as WordId, word.as_str()))
    }
}

impl BinaryFormat for Vocabulary {
    fn write_to<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<()> {
        self.words.write_to(out)?;
        self.counts.write_to(out)?;
        self.total_words.write_to(out)
    }

    fn read_from<R: Read + ?Sized>(input: &mut R) -> io::Result<Self> {
        let words = Vec::<SmolStr>::read_from(input)?;
        let counts = Vec::<u64>::read_from(input)?;
        let total_words = u64::read_from(input)?;

        if words.len() != counts.len() {
            return Err(invalid_data(format!(
                "{} words but {} counts",
                words.len(),
                counts.len()
            )));
        }
        if words.len() >= UNKNOWN_WORD_ID as usize {
            return Err(invalid_data("vocabulary exceeds id space"));
        }

        let mut word_to_id = HashMap::with_capacity(words.len());
        for (id, word) in words.iter().enumerate() {
            if word_to_id.insert(word.clone(), id as WordId).is_some() {
                return Err(invalid_data(format!("duplicate word {:?}", word)));
            }
        }

        Ok(Vocabulary {
            words,
            counts,
            word_to_id,
            total_words,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn ids_are_dense_and_counted() {
        let mut vocab = Vocabulary::new();

        assert_eq!(vocab.get_word_id("the"), 0);
        assert_eq!(vocab.get_word_id("cat"), 1);
        assert_eq!(vocab.get_word_id("the"), 0);

        assert_eq!(vocab.last_word_id(), 2);
        assert_eq!(vocab.vocab_size(), 2);
        assert_eq!(vocab.total_words(), 3);
        assert_eq!(vocab.get_word_count(0), 2);
        assert_eq!(vocab.get_word_by_id(1), "cat");
    }

    #[test]
    fn inference_lookup_does_not_grow() {
        let mut vocab = Vocabulary::new();
        vocab.get_word_id("dog");

        assert_eq!(vocab.get_word_id_no_create("cat"), UNKNOWN_WORD_ID);
        assert_eq!(vocab.get_word_id_no_create("dog"), 0);
        assert_eq!(vocab.vocab_size(), 1);
        assert_eq!(vocab.total_words(), 1);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn out_of_range_id_panics() {
        let vocab = Vocabulary::new();
        vocab.get_word_by_id(0);
    }

    #[test]
    fn decoding_rebuilds_reverse_map() {
        let mut vocab = Vocabulary::new();
        for word in ["a", "b", "a", "c"] {
            vocab.get_word_id(word);
        }

        let bytes = crate::binary::to_bytes(&vocab).unwrap();
        let decoded = Vocabulary::read_from(&mut Cursor::new(bytes)).unwrap();

        assert_eq!(decoded.get_word_id_no_create("c"), 2);
        assert_eq!(decoded.get_word_count(0), 2);
        assert_eq!(decoded.total_words(), 4);
        assert_eq!(
            decoded.iter().collect::<Vec<_>>(),
            vec![(0, "a"), (1, "b"), (2, "c")]
        );
    }

    #[test]
    fn duplicate_words_are_corrupt() {
        let words: Vec<SmolStr> = vec!["a".into(), "a".into()];
        let mut bytes = crate::binary::to_bytes(&words).unwrap();
        bytes.extend(crate::binary::to_bytes(&vec![1u64, 1u64]).unwrap());
        bytes.extend(2u64.to_le_bytes());

        let err = Vocabulary::read_from(&mut Cursor::new(bytes)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
