//! Context-sensitive correction on top of a trained [`LangModel`].

use std::ops::Deref;
use std::path::Path;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use self::candidates::CandidateGenerator;
use self::delete_index::{cache_path, DeleteIndex};
use self::suggestion::Suggestion;
use crate::model::{LangModel, ModelConfig, ModelStats};
use crate::tokenizer::case_handling::{lower_case, restore_case};
use crate::types::{Score, UNKNOWN_WORD_ID};

pub mod candidates;
pub mod delete_index;
pub mod error;
pub mod suggestion;

pub use self::error::SpellerError;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CorrectorConfig {
    /// Subtracted from every alternative to a word the model knows.
    pub known_words_penalty: Score,
    /// Subtracted from an unknown word when it is kept as is.
    pub unknown_words_penalty: Score,
    pub max_candidates_to_check: usize,
    pub min_candidate_frequency: u64,
    /// Words of context scored on each side of the corrected position.
    pub context_window: usize,
    pub max_edit_distance: usize,
}

impl CorrectorConfig {
    pub const fn default() -> CorrectorConfig {
        CorrectorConfig {
            known_words_penalty: 20.0,
            unknown_words_penalty: 5.0,
            max_candidates_to_check: 14,
            min_candidate_frequency: 1,
            context_window: 2,
            max_edit_distance: 2,
        }
    }

    /// Reads a config from a JSON file. Every field must be present.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<CorrectorConfig, SpellerError> {
        let file = std::fs::File::open(path)?;
        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }
}

#[derive(Debug)]
struct Loaded {
    model: LangModel,
    index: DeleteIndex,
}

/// Spell corrector. Holds at most one model; queries take `&self` and may
/// run from any number of threads.
#[derive(Debug)]
pub struct SpellCorrector {
    loaded: Option<Loaded>,
    config: CorrectorConfig,
}

impl Default for SpellCorrector {
    fn default() -> SpellCorrector {
        SpellCorrector::new(CorrectorConfig::default())
    }
}

impl SpellCorrector {
    /// A corrector with no model. It passes text through unchanged until a
    /// model is loaded or trained.
    pub fn new(config: CorrectorConfig) -> SpellCorrector {
        SpellCorrector {
            loaded: None,
            config,
        }
    }

    /// Wraps an already trained model, building its delete index in memory.
    pub fn from_model(model: LangModel, config: CorrectorConfig) -> SpellCorrector {
        let index = DeleteIndex::build(&model);
        SpellCorrector {
            loaded: Some(Loaded { model, index }),
            config,
        }
    }

    /// Loads the model at `path` together with its delete-index cache.
    pub fn open<P: AsRef<Path>>(
        path: P,
        config: CorrectorConfig,
    ) -> Result<SpellCorrector, SpellerError> {
        let loaded = Self::load_parts(path.as_ref())?;
        Ok(SpellCorrector {
            loaded: Some(loaded),
            config,
        })
    }

    fn load_parts(path: &Path) -> Result<Loaded, SpellerError> {
        let model = LangModel::load(path)?;
        let index = DeleteIndex::load_or_build(cache_path(path), &model);
        Ok(Loaded { model, index })
    }

    /// Replaces the current model with the one at `path`. On failure the
    /// previous model, if any, stays in use.
    pub fn load_lang_model<P: AsRef<Path>>(&mut self, path: P) -> bool {
        let path = path.as_ref();
        match Self::load_parts(path) {
            Ok(loaded) => {
                self.loaded = Some(loaded);
                true
            }
            Err(e) => {
                log::error!("failed to load language model {}: {}", path.display(), e);
                false
            }
        }
    }

    #[inline]
    pub fn train_lang_model<P: AsRef<Path>, Q: AsRef<Path>>(
        &mut self,
        corpus_path: P,
        alphabet: &str,
        output_path: Q,
    ) -> bool {
        self.train_lang_model_with_config(
            corpus_path,
            alphabet,
            output_path,
            &ModelConfig::default(),
        )
    }

    /// Trains a model, saves it and its delete-index cache to `output_path`
    /// and switches to it. On failure nothing changes.
    pub fn train_lang_model_with_config<P: AsRef<Path>, Q: AsRef<Path>>(
        &mut self,
        corpus_path: P,
        alphabet: &str,
        output_path: Q,
        model_config: &ModelConfig,
    ) -> bool {
        let output_path = output_path.as_ref();
        match Self::train_parts(corpus_path.as_ref(), alphabet, output_path, model_config) {
            Ok(loaded) => {
                self.loaded = Some(loaded);
                true
            }
            Err(e) => {
                log::error!(
                    "failed to train language model {}: {}",
                    output_path.display(),
                    e
                );
                false
            }
        }
    }

    fn train_parts(
        corpus_path: &Path,
        alphabet: &str,
        output_path: &Path,
        model_config: &ModelConfig,
    ) -> Result<Loaded, SpellerError> {
        let mut model = LangModel::new(model_config.clone());
        model.train(corpus_path, alphabet)?;
        model.dump(output_path)?;

        let index = DeleteIndex::build(&model);
        if let Err(e) = index.save(cache_path(output_path)) {
            log::warn!("could not save delete index cache: {}", e);
        }

        Ok(Loaded { model, index })
    }

    #[inline(always)]
    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    pub fn model(&self) -> Option<&LangModel> {
        self.loaded.as_ref().map(|loaded| &loaded.model)
    }

    pub fn stats(&self) -> Result<ModelStats, SpellerError> {
        self.model()
            .map(LangModel::stats)
            .ok_or(SpellerError::ModelNotLoaded)
    }

    pub fn config(&self) -> &CorrectorConfig {
        &self.config
    }

    /// Splits `text` into sentences of lower-cased words using the loaded
    /// model's alphabet.
    pub fn tokenize(&self, text: &str) -> Vec<Vec<SmolStr>> {
        match &self.loaded {
            Some(loaded) => loaded
                .model
                .tokenize(text)
                .map(|sentence| sentence.iter().map(|word| word.to_lowercase()).collect())
                .collect(),
            None => Vec::new(),
        }
    }

    /// Ranked candidates for `sentence[position]`, best first.
    ///
    /// Words left of `position` are taken as already decided. Empty when no
    /// model is loaded or `position` is out of range.
    pub fn get_candidates_raw<S: Deref<Target = str>>(
        &self,
        sentence: &[S],
        position: usize,
    ) -> Vec<Suggestion> {
        let loaded = match &self.loaded {
            Some(loaded) => loaded,
            None => return Vec::new(),
        };
        if position >= sentence.len() {
            return Vec::new();
        }

        let model = &loaded.model;
        let word = lower_case(&sentence[position]);
        let known = model.get_word_id(&word) != UNKNOWN_WORD_ID;

        let window = self.config.context_window;
        let left = sentence[position.saturating_sub(window)..position]
            .iter()
            .map(|w| model.get_word_id(&lower_case(w)))
            .collect::<Vec<_>>();
        let right_end = sentence.len().min(position + 1 + window);
        let right = sentence[position + 1..right_end]
            .iter()
            .map(|w| model.get_word_id(&lower_case(w)))
            .collect::<Vec<_>>();

        let generator = CandidateGenerator::new(model, &loaded.index, &self.config);
        let mut ids = Vec::with_capacity(left.len() + 1 + right.len());

        let mut suggestions = generator
            .candidates(&word)
            .into_iter()
            .map(|candidate| {
                ids.clear();
                ids.extend_from_slice(&left);
                ids.push(candidate.id);
                ids.extend_from_slice(&right);

                let mut score = model.score_ids(&ids);
                let is_original = candidate.text == word;
                if known && !is_original {
                    score -= self.config.known_words_penalty;
                }
                if !known && is_original {
                    score -= self.config.unknown_words_penalty;
                }
                Suggestion::new(candidate.text, score)
            })
            .collect::<Vec<_>>();

        suggestions.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        log::trace!("{} candidates for {:?}", suggestions.len(), word);
        suggestions
    }

    /// Ranked candidate words for `sentence[position]`, best first.
    pub fn get_candidates<S: Deref<Target = str>>(
        &self,
        sentence: &[S],
        position: usize,
    ) -> Vec<SmolStr> {
        self.get_candidates_raw(sentence, position)
            .into_iter()
            .map(|suggestion| suggestion.value)
            .collect()
    }

    /// Corrects `text`, writing replaced words in lower case.
    pub fn fix_fragment(&self, text: &str) -> String {
        self.fix(text, false)
    }

    /// Corrects `text`, carrying each replaced word's capitalisation over to
    /// its replacement.
    pub fn fix_fragment_normalized(&self, text: &str) -> String {
        self.fix(text, true)
    }

    #[inline]
    pub fn correct(&self, text: &str) -> String {
        self.fix_fragment_normalized(text)
    }

    fn fix(&self, text: &str, normalize: bool) -> String {
        let loaded = match &self.loaded {
            Some(loaded) => loaded,
            None => return text.to_string(),
        };

        let mut out = String::with_capacity(text.len());
        let mut copied = 0;

        for sentence in loaded.model.tokenize(text) {
            let mut words = sentence
                .iter()
                .map(|word| word.to_lowercase())
                .collect::<Vec<_>>();

            for (i, view) in sentence.iter().enumerate() {
                let original = words[i].clone();
                if let Some(best) = self.get_candidates_raw(&words, i).into_iter().next() {
                    words[i] = best.value;
                }

                out.push_str(&text[copied..view.offset()]);
                copied = view.end();

                if words[i] == original {
                    out.push_str(view.text());
                } else {
                    log::debug!("{:?} -> {:?}", view.text(), words[i]);
                    if normalize {
                        out.push_str(&restore_case(view.text(), &words[i]));
                    } else {
                        out.push_str(&words[i]);
                    }
                }
            }
        }

        out.push_str(&text[copied..]);
        out
    }
}
