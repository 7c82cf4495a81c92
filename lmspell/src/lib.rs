/*! Context-sensitive spelling correction with a compact n-gram language model.

A [`model::LangModel`] is trained from plain text and an alphabet. It keeps
saturating counts for every 1-, 2- and 3-word window seen in training,
addressed through a perfect hash, and scores sentences with back-off
smoothing. A [`speller::SpellCorrector`] generates edit-distance candidates
for each word, pre-filtered by bloom filters over vocabulary deletions, and
picks the candidate that scores best in its sentence context.

# Usage examples

```no_run
use lmspell::speller::{CorrectorConfig, SpellCorrector};

let mut corrector = SpellCorrector::new(CorrectorConfig::default());
assert!(corrector.train_lang_model("corpus.txt", "abcdefghijklmnopqrstuvwxyz", "en.bin"));

println!("{}", corrector.correct("Teh cat sat on teh mat."));
println!("{:?}", corrector.get_candidates(&["the", "xat", "sat"], 1));
```

A trained model is reloaded with [`speller::SpellCorrector::load_lang_model`].
Further examples can be found in `lmspell-bin` in the same repository.
*/

pub mod binary;
pub mod bloom;
pub mod model;
pub mod speller;
pub mod tokenizer;

pub(crate) mod constants;
pub mod types;

pub use crate::model::{LangModel, ModelConfig, ModelError};
pub use crate::speller::suggestion::Suggestion;
pub use crate::speller::{CorrectorConfig, SpellCorrector, SpellerError};

/// Installs `env_logger` as the global logger, honouring `RUST_LOG`.
#[cfg(feature = "logging")]
pub fn init_logging() {
    let _ = env_logger::try_init();
}
