//! Compact n-gram language model.
//!
//! Counts for every observed 1-, 2- and 3-word window share one perfect-hash
//! addressed bucket array. Each bucket keeps a 16-bit verification hash so
//! that windows never seen in training read as zero instead of borrowing
//! another window's count.

use std::fs::File;
use std::io::{self, BufWriter, Cursor, Read, Write};
use std::ops::Deref;
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use hashbrown::HashSet;
use memmap2::Mmap;
use serde::{Deserialize, Serialize};

use crate::binary::BinaryFormat;
use crate::constants::{DEFAULT_K, MAX_GRAM_ORDER, MODEL_MAGIC, MODEL_VERSION};
use crate::tokenizer::{Sentences, Tokenizer};
use crate::types::{GramCount, Score, WordId, UNKNOWN_WORD_ID};

pub mod error;
pub mod ngram;
pub mod perfect_hash;
pub mod vocabulary;

pub use self::error::ModelError;
use self::ngram::{GramKey, GramTable};
use self::vocabulary::Vocabulary;

/// Size of the magic constant plus format version.
const HEADER_SIZE: usize = 12;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Additive smoothing constant.
    pub k: f64,
}

impl ModelConfig {
    pub const fn default() -> ModelConfig {
        ModelConfig { k: DEFAULT_K }
    }
}

impl BinaryFormat for ModelConfig {
    fn write_to<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<()> {
        self.k.write_to(out)
    }

    fn read_from<R: Read + ?Sized>(input: &mut R) -> io::Result<Self> {
        let k = f64::read_from(input)?;
        if !(k.is_finite() && k > 0.0) {
            return Err(crate::binary::invalid_data(format!(
                "invalid smoothing constant {}",
                k
            )));
        }
        Ok(ModelConfig { k })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ModelStats {
    pub vocab_size: usize,
    pub total_words: u64,
    pub buckets: usize,
    pub checksum: u32,
}

#[derive(Debug, Clone)]
pub struct LangModel {
    vocabulary: Vocabulary,
    grams: GramTable,
    tokenizer: Tokenizer,
    config: ModelConfig,
    checksum: u32,
}

impl Default for LangModel {
    fn default() -> LangModel {
        LangModel::new(ModelConfig::default())
    }
}

/// Calls `f` with the key of every 1-, 2- and 3-word window of `ids`.
fn for_each_gram<F: FnMut(GramKey)>(ids: &[WordId], mut f: F) {
    for start in 0..ids.len() {
        for order in 1..=MAX_GRAM_ORDER.min(ids.len() - start) {
            f(GramKey::new(&ids[start..start + order]));
        }
    }
}

impl LangModel {
    /// An empty, untrained model.
    pub fn new(config: ModelConfig) -> LangModel {
        LangModel {
            vocabulary: Vocabulary::new(),
            grams: GramTable::default(),
            tokenizer: Tokenizer::new(),
            config,
            checksum: 0,
        }
    }

    /// Trains on the corpus file at `corpus_path`.
    pub fn train<P: AsRef<Path>>(
        &mut self,
        corpus_path: P,
        alphabet: &str,
    ) -> Result<(), ModelError> {
        let corpus_path = corpus_path.as_ref();
        let text = std::fs::read_to_string(corpus_path)?;
        log::info!(
            "read {} bytes of training text from {}",
            text.len(),
            corpus_path.display()
        );
        self.train_text(&text, alphabet)
    }

    /// Trains on `text`. On failure the model is left unchanged.
    pub fn train_text(&mut self, text: &str, alphabet: &str) -> Result<(), ModelError> {
        let mut tokenizer = Tokenizer::new();
        if !tokenizer.load_alphabet(alphabet) {
            return Err(ModelError::EmptyAlphabet);
        }

        let mut vocabulary = Vocabulary::new();
        let sentences = tokenizer
            .process(text)
            .map(|sentence| {
                sentence
                    .iter()
                    .map(|word| vocabulary.get_word_id(&word.to_lowercase()))
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();

        if vocabulary.is_empty() {
            return Err(ModelError::EmptyCorpus);
        }
        log::info!(
            "tokenized {} sentences, {} words, {} distinct",
            sentences.len(),
            vocabulary.total_words(),
            vocabulary.vocab_size()
        );

        let mut distinct = HashSet::new();
        for ids in &sentences {
            for_each_gram(ids, |key| {
                distinct.insert(key);
            });
        }
        let mut keys = distinct.into_iter().collect::<Vec<_>>();
        keys.sort_unstable();
        log::info!("building perfect hash over {} distinct n-grams", keys.len());

        let mut grams = GramTable::build(&keys)?;
        drop(keys);
        for ids in &sentences {
            for_each_gram(ids, |key| grams.increment(&key));
        }

        let mut model = LangModel {
            vocabulary,
            grams,
            tokenizer,
            config: self.config.clone(),
            checksum: 0,
        };
        model.checksum = crc32fast::hash(&model.payload()?);
        log::info!(
            "trained model: {} buckets, checksum {:#010x}",
            model.grams.buckets_number(),
            model.checksum
        );

        *self = model;
        Ok(())
    }

    fn payload(&self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.vocabulary.write_to(&mut buf)?;
        self.grams.write_to(&mut buf)?;
        self.tokenizer.write_to(&mut buf)?;
        self.config.write_to(&mut buf)?;
        Ok(buf)
    }

    /// Loads a model written by [`LangModel::dump`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<LangModel, ModelError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        if (file.metadata()?.len() as usize) < HEADER_SIZE {
            return Err(ModelError::Truncated);
        }

        let mmap = unsafe { Mmap::map(&file)? };
        let model = LangModel::from_bytes(&mmap)?;
        log::info!(
            "loaded model {} ({} words, {} buckets)",
            path.display(),
            model.vocabulary.vocab_size(),
            model.grams.buckets_number()
        );
        Ok(model)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<LangModel, ModelError> {
        let mut cursor = Cursor::new(bytes);

        let magic = cursor
            .read_u64::<LittleEndian>()
            .map_err(ModelError::from_decode)?;
        if magic != MODEL_MAGIC {
            return Err(ModelError::BadMagic(magic));
        }
        let version = cursor
            .read_u32::<LittleEndian>()
            .map_err(ModelError::from_decode)?;
        if version != MODEL_VERSION {
            return Err(ModelError::UnsupportedVersion(version));
        }

        let payload_start = cursor.position() as usize;
        let vocabulary = Vocabulary::read_from(&mut cursor).map_err(ModelError::from_decode)?;
        let grams = GramTable::read_from(&mut cursor).map_err(ModelError::from_decode)?;
        let tokenizer = Tokenizer::read_from(&mut cursor).map_err(ModelError::from_decode)?;
        let config = ModelConfig::read_from(&mut cursor).map_err(ModelError::from_decode)?;
        let payload_end = cursor.position() as usize;

        let stored = cursor
            .read_u32::<LittleEndian>()
            .map_err(ModelError::from_decode)?;
        if cursor.position() as usize != bytes.len() {
            return Err(ModelError::Corrupt(format!(
                "{} trailing bytes after checksum",
                bytes.len() - cursor.position() as usize
            )));
        }

        let computed = crc32fast::hash(&bytes[payload_start..payload_end]);
        if stored != computed {
            return Err(ModelError::ChecksumMismatch { stored, computed });
        }

        Ok(LangModel {
            vocabulary,
            grams,
            tokenizer,
            config,
            checksum: stored,
        })
    }

    /// Writes the model to `path`, replacing any existing file atomically.
    pub fn dump<P: AsRef<Path>>(&self, path: P) -> Result<(), ModelError> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };

        let payload = self.payload()?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        {
            let mut out = BufWriter::new(tmp.as_file_mut());
            out.write_u64::<LittleEndian>(MODEL_MAGIC)?;
            out.write_u32::<LittleEndian>(MODEL_VERSION)?;
            out.write_all(&payload)?;
            out.write_u32::<LittleEndian>(crc32fast::hash(&payload))?;
            out.flush()?;
        }
        tmp.persist(path).map_err(|e| e.error)?;

        log::info!("saved model to {}", path.display());
        Ok(())
    }

    #[inline(always)]
    pub fn is_trained(&self) -> bool {
        self.grams.is_built()
    }

    pub fn tokenize<'t>(&'t self, text: &'t str) -> Sentences<'t> {
        self.tokenizer.process(text)
    }

    #[inline(always)]
    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    #[inline(always)]
    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    #[inline(always)]
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    #[inline(always)]
    pub fn checksum(&self) -> u32 {
        self.checksum
    }

    #[inline(always)]
    pub fn buckets_number(&self) -> usize {
        self.grams.buckets_number()
    }

    /// Id of an already lower-cased word, or [`UNKNOWN_WORD_ID`].
    #[inline(always)]
    pub fn get_word_id(&self, word: &str) -> WordId {
        self.vocabulary.get_word_id_no_create(word)
    }

    pub fn stats(&self) -> ModelStats {
        ModelStats {
            vocab_size: self.vocabulary.vocab_size(),
            total_words: self.vocabulary.total_words(),
            buckets: self.grams.buckets_number(),
            checksum: self.checksum,
        }
    }

    fn gram_count(&self, ids: &[WordId]) -> GramCount {
        if ids.contains(&UNKNOWN_WORD_ID) {
            return 0;
        }
        self.grams.count(&GramKey::new(ids))
    }

    #[inline(always)]
    pub fn gram1_count(&self, a: WordId) -> GramCount {
        self.gram_count(&[a])
    }

    #[inline(always)]
    pub fn gram2_count(&self, a: WordId, b: WordId) -> GramCount {
        self.gram_count(&[a, b])
    }

    #[inline(always)]
    pub fn gram3_count(&self, a: WordId, b: WordId, c: WordId) -> GramCount {
        self.gram_count(&[a, b, c])
    }

    /// Probability of `ids[i]` given up to two preceding ids, backing off
    /// from trigram to bigram to unigram as the context goes unseen.
    fn position_prob(&self, ids: &[WordId], i: usize) -> f64 {
        let k = self.config.k;
        let vocab_size = self.vocabulary.vocab_size().max(1) as f64;

        if i >= 2 {
            let context = self.gram2_count(ids[i - 2], ids[i - 1]);
            if context > 0 {
                let count = self.gram3_count(ids[i - 2], ids[i - 1], ids[i]);
                return (count as f64 + k) / (context as f64 + k * vocab_size);
            }
        }

        if i >= 1 {
            let context = self.gram1_count(ids[i - 1]);
            if context > 0 {
                let count = self.gram2_count(ids[i - 1], ids[i]);
                return (count as f64 + k) / (context as f64 + k * vocab_size);
            }
        }

        // Unigram buckets saturate; the vocabulary keeps the exact count.
        let count = if ids[i] < self.vocabulary.last_word_id() {
            self.vocabulary.get_word_count(ids[i])
        } else {
            0
        };
        if count > 0 {
            let total = self.vocabulary.total_words() as f64;
            return (count as f64 + k) / (total + k * vocab_size);
        }

        1.0 / vocab_size
    }

    /// Relative log-probability score of a sentence of word ids.
    pub fn score_ids(&self, ids: &[WordId]) -> Score {
        (0..ids.len()).map(|i| self.position_prob(ids, i).ln()).sum()
    }

    /// Scores already lower-cased words.
    pub fn score_words<S: Deref<Target = str>>(&self, words: &[S]) -> Score {
        let ids = words
            .iter()
            .map(|w| self.get_word_id(w))
            .collect::<Vec<_>>();
        self.score_ids(&ids)
    }

    /// Tokenizes `text` and sums the score of every sentence.
    pub fn score(&self, text: &str) -> Score {
        self.tokenize(text)
            .map(|sentence| {
                let ids = sentence
                    .iter()
                    .map(|word| self.get_word_id(&word.to_lowercase()))
                    .collect::<Vec<_>>();
                self.score_ids(&ids)
            })
            .sum()
    }
}
