use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use gumdrop::Options;
use serde::Serialize;

use lmspell::model::{LangModel, ModelConfig, ModelStats};
use lmspell::speller::suggestion::Suggestion;
use lmspell::speller::{CorrectorConfig, SpellCorrector};
use lmspell::tokenizer::Tokenizer;

trait OutputWriter {
    fn write_correction(&mut self, input: &str, output: &str);
    fn write_candidates(&mut self, word: &str, candidates: &[Suggestion]);
    fn write_score(&mut self, input: &str, score: f64);
    fn write_stats(&mut self, stats: &ModelStats);
    fn finish(&mut self) -> anyhow::Result<()>;
}

struct StdoutWriter;

impl OutputWriter for StdoutWriter {
    fn write_correction(&mut self, input: &str, output: &str) {
        if input == output {
            println!("{}\t\t[CORRECT]", output);
        } else {
            println!("{}\t\t[{}]", output, input);
        }
    }

    fn write_candidates(&mut self, word: &str, candidates: &[Suggestion]) {
        println!("Input: {}", word);
        for candidate in candidates {
            println!("{}\t\t{:.4}", candidate.value, candidate.score);
        }
        println!();
    }

    fn write_score(&mut self, input: &str, score: f64) {
        println!("{:.4}\t{}", score, input);
    }

    fn write_stats(&mut self, stats: &ModelStats) {
        println!("Vocabulary size: {}", stats.vocab_size);
        println!("Total words: {}", stats.total_words);
        println!("Buckets: {}", stats.buckets);
        println!("Checksum: {:#010x}", stats.checksum);
    }

    fn finish(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

#[derive(Serialize)]
#[serde(untagged)]
enum JsonRecord {
    Correction {
        input: String,
        output: String,
    },
    Candidates {
        word: String,
        candidates: Vec<Suggestion>,
    },
    Score {
        input: String,
        score: f64,
    },
    Stats(ModelStats),
}

#[derive(Serialize)]
struct JsonWriter {
    results: Vec<JsonRecord>,
}

impl JsonWriter {
    pub fn new() -> JsonWriter {
        JsonWriter { results: vec![] }
    }
}

impl OutputWriter for JsonWriter {
    fn write_correction(&mut self, input: &str, output: &str) {
        self.results.push(JsonRecord::Correction {
            input: input.to_owned(),
            output: output.to_owned(),
        });
    }

    fn write_candidates(&mut self, word: &str, candidates: &[Suggestion]) {
        self.results.push(JsonRecord::Candidates {
            word: word.to_owned(),
            candidates: candidates.to_vec(),
        });
    }

    fn write_score(&mut self, input: &str, score: f64) {
        self.results.push(JsonRecord::Score {
            input: input.to_owned(),
            score,
        });
    }

    fn write_stats(&mut self, stats: &ModelStats) {
        self.results.push(JsonRecord::Stats(*stats));
    }

    fn finish(&mut self) -> anyhow::Result<()> {
        println!("{}", serde_json::to_string_pretty(self)?);
        Ok(())
    }
}

#[derive(Debug, Options)]
struct Args {
    #[options(help = "print help message")]
    help: bool,

    #[options(command)]
    command: Option<Command>,
}

#[derive(Debug, Options)]
enum Command {
    #[options(help = "train a language model from a text corpus")]
    Train(TrainArgs),

    #[options(help = "correct provided input")]
    Correct(CorrectArgs),

    #[options(help = "list ranked candidates for one word of the input")]
    Candidates(CandidatesArgs),

    #[options(help = "score provided input with the language model")]
    Score(ScoreArgs),

    #[options(help = "print input in sentence and word tokenized form")]
    Tokenize(TokenizeArgs),
}

#[derive(Debug, Options)]
struct TrainArgs {
    #[options(help = "print help message")]
    help: bool,

    #[options(short = "c", help = "plain text training corpus", required)]
    corpus: PathBuf,

    #[options(short = "a", help = "letters of the language")]
    alphabet: Option<String>,

    #[options(
        short = "A",
        long = "alphabet-file",
        help = "file containing the letters of the language"
    )]
    alphabet_file: Option<PathBuf>,

    #[options(short = "o", help = "where to write the trained model", required)]
    output: PathBuf,

    #[options(short = "k", help = "smoothing constant")]
    k: Option<f64>,

    #[options(no_short, long = "json", help = "output in JSON format")]
    use_json: bool,
}

#[derive(Debug, Options)]
struct CorrectArgs {
    #[options(help = "print help message")]
    help: bool,

    #[options(short = "m", help = "trained language model", required)]
    model: PathBuf,

    #[options(no_short, help = "JSON corrector config file")]
    config: Option<PathBuf>,

    #[options(
        short = "r",
        long = "raw",
        help = "write replacements in lower case instead of restoring case"
    )]
    is_raw: bool,

    #[options(no_short, long = "json", help = "output in JSON format")]
    use_json: bool,

    #[options(free, help = "text to be corrected, one fragment per argument")]
    inputs: Vec<String>,
}

#[derive(Debug, Options)]
struct CandidatesArgs {
    #[options(help = "print help message")]
    help: bool,

    #[options(short = "m", help = "trained language model", required)]
    model: PathBuf,

    #[options(no_short, help = "JSON corrector config file")]
    config: Option<PathBuf>,

    #[options(short = "p", help = "index of the word to list candidates for")]
    position: usize,

    #[options(no_short, long = "json", help = "output in JSON format")]
    use_json: bool,

    #[options(free, help = "sentences to be processed")]
    inputs: Vec<String>,
}

#[derive(Debug, Options)]
struct ScoreArgs {
    #[options(help = "print help message")]
    help: bool,

    #[options(short = "m", help = "trained language model", required)]
    model: PathBuf,

    #[options(no_short, long = "json", help = "output in JSON format")]
    use_json: bool,

    #[options(free, help = "sentences to be scored")]
    inputs: Vec<String>,
}

#[derive(Debug, Options)]
struct TokenizeArgs {
    #[options(help = "print help message")]
    help: bool,

    #[options(short = "a", help = "letters of the language")]
    alphabet: Option<String>,

    #[options(short = "m", help = "take the alphabet from a trained model")]
    model: Option<PathBuf>,

    #[options(free, help = "text to be tokenized")]
    inputs: Vec<String>,
}

fn read_inputs(inputs: Vec<String>) -> anyhow::Result<Vec<String>> {
    if !inputs.is_empty() {
        return Ok(inputs);
    }

    eprintln!("Reading from stdin...");
    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .context("reading stdin")?;
    Ok(buffer
        .lines()
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect())
}

fn writer(use_json: bool) -> Box<dyn OutputWriter> {
    if use_json {
        Box::new(JsonWriter::new())
    } else {
        Box::new(StdoutWriter)
    }
}

fn load_corrector(model: &Path, config: Option<&Path>) -> anyhow::Result<SpellCorrector> {
    let config = match config {
        Some(path) => CorrectorConfig::from_json_file(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => CorrectorConfig::default(),
    };

    SpellCorrector::open(model, config)
        .with_context(|| format!("loading model {}", model.display()))
}

fn train(args: TrainArgs) -> anyhow::Result<()> {
    let alphabet = match (args.alphabet, args.alphabet_file) {
        (Some(alphabet), _) => alphabet,
        (None, Some(path)) => std::fs::read_to_string(&path)
            .with_context(|| format!("reading alphabet {}", path.display()))?,
        (None, None) => bail!("either --alphabet or --alphabet-file is required"),
    };

    let mut model_config = ModelConfig::default();
    if let Some(k) = args.k {
        if !(k.is_finite() && k > 0.0) {
            bail!("smoothing constant must be positive, got {}", k);
        }
        model_config.k = k;
    }

    let mut corrector = SpellCorrector::new(CorrectorConfig::default());
    if !corrector.train_lang_model_with_config(&args.corpus, &alphabet, &args.output, &model_config)
    {
        bail!("training failed for corpus {}", args.corpus.display());
    }

    let mut writer = writer(args.use_json);
    writer.write_stats(&corrector.stats()?);
    writer.finish()
}

fn correct(args: CorrectArgs) -> anyhow::Result<()> {
    let corrector = load_corrector(&args.model, args.config.as_deref())?;
    let mut writer = writer(args.use_json);

    for input in read_inputs(args.inputs)? {
        let output = if args.is_raw {
            corrector.fix_fragment(&input)
        } else {
            corrector.fix_fragment_normalized(&input)
        };
        writer.write_correction(&input, &output);
    }

    writer.finish()
}

fn candidates(args: CandidatesArgs) -> anyhow::Result<()> {
    let corrector = load_corrector(&args.model, args.config.as_deref())?;
    let mut writer = writer(args.use_json);

    for input in read_inputs(args.inputs)? {
        let words = corrector
            .tokenize(&input)
            .into_iter()
            .flatten()
            .collect::<Vec<_>>();

        match words.get(args.position) {
            Some(word) => {
                let candidates = corrector.get_candidates_raw(&words, args.position);
                writer.write_candidates(word, &candidates);
            }
            None => eprintln!(
                "{:?} has {} words, no word at position {}",
                input,
                words.len(),
                args.position
            ),
        }
    }

    writer.finish()
}

fn score(args: ScoreArgs) -> anyhow::Result<()> {
    let model = LangModel::load(&args.model)
        .with_context(|| format!("loading model {}", args.model.display()))?;
    let mut writer = writer(args.use_json);

    for input in read_inputs(args.inputs)? {
        writer.write_score(&input, model.score(&input));
    }

    writer.finish()
}

fn tokenize(args: TokenizeArgs) -> anyhow::Result<()> {
    let tokenizer = match (args.model, args.alphabet) {
        (Some(path), _) => LangModel::load(&path)
            .with_context(|| format!("loading model {}", path.display()))?
            .tokenizer()
            .clone(),
        (None, Some(alphabet)) => {
            let mut tokenizer = Tokenizer::new();
            if !tokenizer.load_alphabet(&alphabet) {
                bail!("alphabet is empty");
            }
            tokenizer
        }
        (None, None) => bail!("either --model or --alphabet is required"),
    };

    let inputs = read_inputs(args.inputs)?.join(" ");

    for (index, sentence) in tokenizer.process(&inputs).enumerate() {
        println!("Sentence {}:", index);
        for word in sentence {
            println!("{:>4}: \"{}\"", word.offset(), word.text());
        }
    }

    Ok(())
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let args = Args::parse_args_default_or_exit();

    match args.command {
        None => Ok(()),
        Some(Command::Train(args)) => train(args),
        Some(Command::Correct(args)) => correct(args),
        Some(Command::Candidates(args)) => candidates(args),
        Some(Command::Score(args)) => score(args),
        Some(Command::Tokenize(args)) => tokenize(args),
    }
}
