//! Alphabet-driven sentence and word segmentation.
//!
//! A word is a maximal run of characters that belong to the alphabet after
//! case folding. Any other character ends the current word, and `.`, `!` or
//! `?` additionally end the current sentence.

use std::io::{self, Read, Write};
use std::iter::FusedIterator;

use hashbrown::HashSet;
use itertools::Itertools;

use crate::binary::{invalid_data, BinaryFormat};
use crate::constants::SENTENCE_TERMINATORS;

pub mod case_handling;
mod word;

pub use self::word::WordView;
use self::case_handling::fold_case;

#[derive(Debug, Clone, Default)]
pub struct Tokenizer {
    letters: Vec<char>,
    alphabet: HashSet<char>,
}

impl Tokenizer {
    pub fn new() -> Tokenizer {
        Tokenizer::default()
    }

    /// Replaces the alphabet with the case-folded letters of `alphabet`.
    ///
    /// Whitespace is ignored. Returns `false`, leaving the current alphabet
    /// in place, if no letters remain.
    pub fn load_alphabet(&mut self, alphabet: &str) -> bool {
        let letters = alphabet
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(fold_case)
            .unique()
            .collect::<Vec<_>>();

        if letters.is_empty() {
            log::error!("alphabet is empty after case folding");
            return false;
        }

        self.alphabet = letters.iter().copied().collect();
        self.letters = letters;
        true
    }

    /// Alphabet letters in the order they were first given.
    #[inline(always)]
    pub fn letters(&self) -> &[char] {
        &self.letters
    }

    #[inline(always)]
    pub fn contains(&self, ch: char) -> bool {
        self.alphabet.contains(&fold_case(ch))
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.letters.is_empty()
    }

    /// Splits `text` into sentences of word views.
    ///
    /// The returned iterator is lazy and can be restarted by cloning it
    /// before consumption or by calling `process` again.
    pub fn process<'t>(&'t self, text: &'t str) -> Sentences<'t> {
        Sentences {
            tokenizer: self,
            text,
            pos: 0,
        }
    }
}

impl BinaryFormat for Tokenizer {
    fn write_to<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<()> {
        self.letters.iter().collect::<String>().write_to(out)
    }

    fn read_from<R: Read + ?Sized>(input: &mut R) -> io::Result<Self> {
        let letters = String::read_from(input)?;
        let mut tokenizer = Tokenizer::new();
        if !tokenizer.load_alphabet(&letters) {
            return Err(invalid_data("stored alphabet is empty"));
        }
        Ok(tokenizer)
    }
}

#[derive(Debug, Clone)]
pub struct Sentences<'t> {
    tokenizer: &'t Tokenizer,
    text: &'t str,
    pos: usize,
}

impl<'t> Iterator for Sentences<'t> {
    type Item = Vec<WordView<'t>>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut sentence = Vec::new();
        let mut word_start: Option<usize> = None;

        for (i, ch) in self.text[self.pos..].char_indices() {
            let at = self.pos + i;

            if self.tokenizer.contains(ch) {
                word_start.get_or_insert(at);
                continue;
            }

            if let Some(start) = word_start.take() {
                sentence.push(WordView::new(self.text, start, at - start));
            }

            if SENTENCE_TERMINATORS.contains(&ch) && !sentence.is_empty() {
                self.pos = at + ch.len_utf8();
                return Some(sentence);
            }
        }

        if let Some(start) = word_start.take() {
            sentence.push(WordView::new(self.text, start, self.text.len() - start));
        }
        self.pos = self.text.len();

        if sentence.is_empty() {
            None
        } else {
            Some(sentence)
        }
    }
}

impl FusedIterator for Sentences<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn english() -> Tokenizer {
        let mut tokenizer = Tokenizer::new();
        assert!(tokenizer.load_alphabet("abcdefghijklmnopqrstuvwxyz'"));
        tokenizer
    }

    fn words<'t>(sentences: Sentences<'t>) -> Vec<Vec<&'t str>> {
        sentences
            .map(|s| s.iter().map(|w| w.text()).collect())
            .collect()
    }

    #[test]
    fn empty_alphabet_is_rejected() {
        let mut tokenizer = english();

        assert!(!tokenizer.load_alphabet(" \n\t"));
        assert!(tokenizer.contains('a'));
    }

    #[test]
    fn alphabet_is_case_folded() {
        let mut tokenizer = Tokenizer::new();
        assert!(tokenizer.load_alphabet("AbC\n"));

        assert_eq!(tokenizer.letters(), &['a', 'b', 'c']);
        assert!(tokenizer.contains('B'));
        assert!(!tokenizer.contains('d'));
    }

    #[test]
    fn splits_sentences() {
        let tokenizer = english();
        let text = "Hello, world! How are you? I'm fine. trailing words";

        assert_eq!(
            words(tokenizer.process(text)),
            vec![
                vec!["Hello", "world"],
                vec!["How", "are", "you"],
                vec!["I'm", "fine"],
                vec!["trailing", "words"],
            ]
        );
    }

    #[test]
    fn skips_empty_sentences() {
        let tokenizer = english();

        assert_eq!(words(tokenizer.process("... !? 42")), Vec::<Vec<&str>>::new());
        assert_eq!(words(tokenizer.process("")), Vec::<Vec<&str>>::new());
        assert_eq!(words(tokenizer.process("!! a !! b")), vec![vec!["a"], vec!["b"]]);
    }

    #[test]
    fn views_point_into_the_source() {
        let tokenizer = english();
        let text = "one  two";
        let sentence = tokenizer.process(text).next().unwrap();

        assert_eq!(sentence[1].offset(), 5);
        assert_eq!(&text[sentence[1].offset()..sentence[1].end()], "two");
    }

    #[test]
    fn iterator_is_restartable() {
        let tokenizer = english();
        let sentences = tokenizer.process("a b. c d.");
        let first = sentences.clone().count();

        assert_eq!(first, 2);
        assert_eq!(sentences.count(), 2);
    }

    #[test]
    fn non_ascii_letters() {
        let mut tokenizer = Tokenizer::new();
        assert!(tokenizer.load_alphabet("абвгдеёжзийклмнопрстуфхцчшщъыьэюя"));

        assert_eq!(
            words(tokenizer.process("Привет, мир.")),
            vec![vec!["Привет", "мир"]]
        );
    }

    #[test]
    fn stored_alphabet_round_trips() {
        let tokenizer = english();
        let bytes = crate::binary::to_bytes(&tokenizer).unwrap();
        let decoded = Tokenizer::read_from(&mut std::io::Cursor::new(bytes)).unwrap();

        assert_eq!(decoded.letters(), tokenizer.letters());
    }
}
