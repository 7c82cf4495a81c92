use std::fs;
use std::path::Path;

use lmspell::model::LangModel;
use lmspell::speller::delete_index::cache_path;
use lmspell::speller::{CorrectorConfig, SpellCorrector};
use tempfile::tempdir;

const ALPHABET: &str = "abcdefghijklmnopqrstuvwxyz";

const CORPUS: &str = "\
The cat sat on the mat. The dog sat on the log.
A cat and a dog played in the garden! Did the cat see the dog?
The quick brown fox jumps over the lazy dog. The cat likes milk.
The dog likes bones. My cat sleeps on the sofa every day.
";

fn train(dir: &Path) -> (SpellCorrector, std::path::PathBuf) {
    let corpus = dir.join("corpus.txt");
    let output = dir.join("en.bin");
    fs::write(&corpus, CORPUS).unwrap();

    let mut corrector = SpellCorrector::new(CorrectorConfig::default());
    assert!(corrector.train_lang_model(&corpus, ALPHABET, &output));
    (corrector, output)
}

#[test]
fn train_writes_model_and_cache() {
    let dir = tempdir().unwrap();
    let (corrector, output) = train(dir.path());

    assert!(corrector.is_loaded());
    assert!(output.exists());
    assert!(cache_path(&output).exists());

    let stats = corrector.model().unwrap().stats();
    assert!(stats.vocab_size > 20);
    assert_eq!(LangModel::load(&output).unwrap().stats(), stats);
}

#[test]
fn corrects_after_reload() {
    let dir = tempdir().unwrap();
    let (trained, output) = train(dir.path());

    let mut corrector = SpellCorrector::default();
    assert!(corrector.load_lang_model(&output));

    for text in &["Teh cat sat on the mat.", "The dgo likes bones.", "The cat sat"] {
        assert_eq!(corrector.correct(text), trained.correct(text));
    }
    assert_eq!(corrector.correct("Teh cat sat on the mat."), "The cat sat on the mat.");
    assert_eq!(corrector.correct("The dgo likes bones."), "The dog likes bones.");
}

#[test]
fn stale_cache_is_rebuilt() {
    let dir = tempdir().unwrap();
    let (_, output) = train(dir.path());
    fs::write(cache_path(&output), b"garbage").unwrap();

    let corrector = SpellCorrector::open(&output, CorrectorConfig::default()).unwrap();

    assert_eq!(corrector.correct("teh cat"), "the cat");
    assert!(fs::metadata(cache_path(&output)).unwrap().len() > 7);
}

#[test]
fn damaged_cache_is_rebuilt() {
    let dir = tempdir().unwrap();
    let (_, output) = train(dir.path());
    let cache = cache_path(&output);
    let intact = fs::read(&cache).unwrap();

    let mut bytes = intact.clone();
    let len = bytes.len();
    for byte in &mut bytes[16..len - 4] {
        *byte = 0;
    }
    fs::write(&cache, &bytes).unwrap();

    let mut corrector = SpellCorrector::default();
    assert!(corrector.load_lang_model(&output));
    assert_eq!(corrector.correct("teh cat sat"), "the cat sat");
    assert_eq!(fs::read(&cache).unwrap(), intact);
}

#[test]
fn failed_load_keeps_previous_model() {
    let dir = tempdir().unwrap();
    let (mut corrector, output) = train(dir.path());

    let mut bytes = fs::read(&output).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xff;
    let corrupt = dir.path().join("corrupt.bin");
    fs::write(&corrupt, &bytes).unwrap();

    assert!(!corrector.load_lang_model(&corrupt));
    assert!(!corrector.load_lang_model(dir.path().join("missing.bin")));
    assert_eq!(corrector.correct("teh dog"), "the dog");
}

#[test]
fn failed_training_changes_nothing() {
    let dir = tempdir().unwrap();
    let mut corrector = SpellCorrector::default();

    assert!(!corrector.train_lang_model(dir.path().join("missing.txt"), ALPHABET, dir.path().join("a.bin")));
    assert!(!corrector.is_loaded());

    let corpus = dir.path().join("corpus.txt");
    fs::write(&corpus, CORPUS).unwrap();
    assert!(!corrector.train_lang_model(&corpus, " \t", dir.path().join("b.bin")));
    assert!(!corrector.is_loaded());
    assert!(!dir.path().join("b.bin").exists());

    assert_eq!(corrector.correct("teh cat"), "teh cat");
}

#[test]
fn readers_share_one_corrector() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<SpellCorrector>();

    let dir = tempdir().unwrap();
    let (corrector, _) = train(dir.path());
    let expected = corrector.correct("Teh dgo sat on teh mat.");

    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                for _ in 0..10 {
                    assert_eq!(corrector.correct("Teh dgo sat on teh mat."), expected);
                    assert_eq!(
                        corrector.get_candidates(&["the", "dgo", "sat"], 1)[0],
                        "dog"
                    );
                }
            });
        }
    });
}
