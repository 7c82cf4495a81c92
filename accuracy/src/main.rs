use std::error::Error;
use std::fmt;
use std::time::{Duration, Instant, SystemTime};

use distance::damerau_levenshtein;
use indicatif::{ParallelProgressIterator, ProgressBar, ProgressStyle};
use lmspell::model::ModelStats;
use lmspell::speller::suggestion::Suggestion;
use lmspell::speller::{CorrectorConfig, SpellCorrector};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use serde::Serialize;
use structopt::clap::{App, AppSettings, Arg};

/// Typos further than this from their correction are reported together.
const MAX_REPORTED_DISTANCE: usize = 3;

fn load_words(
    path: &str,
    max_words: Option<usize>,
) -> Result<Vec<(String, String)>, Box<dyn Error>> {
    let mut rdr = csv::ReaderBuilder::new()
        .comment(Some(b'#'))
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    Ok(rdr
        .records()
        .filter_map(Result::ok)
        .filter_map(|r| {
            r.get(0)
                .and_then(|x| r.get(1).map(|y| (x.to_string(), y.to_string())))
        })
        .take(max_words.unwrap_or(usize::MAX))
        .collect())
}

fn ms(duration: Duration) -> String {
    format!("{:.3}ms", duration.as_secs_f64() * 1000.0)
}

#[derive(Debug, Serialize)]
struct WordResult<'a> {
    input: &'a str,
    expected: &'a str,
    distance: usize,
    suggestions: Vec<Suggestion>,
    position: Option<usize>,
    time: Duration,
}

#[derive(Debug, Serialize)]
struct Report<'a> {
    model: Option<ModelStats>,
    config: &'a CorrectorConfig,
    summary: Summary,
    results: Vec<WordResult<'a>>,
    started_at: Duration,
    total_time: Duration,
}

/// Hit counts for typos at one edit distance from their correction.
#[derive(Serialize, Default, Debug, Clone, Copy)]
struct DistanceBucket {
    distance: usize,
    total: u32,
    first_position: u32,
}

#[derive(Serialize, Default, Debug, Clone)]
struct Summary {
    total_words: u32,
    first_position: u32,
    top_five: u32,
    any_position: u32,
    no_suggestions: u32,
    only_wrong: u32,
    by_distance: Vec<DistanceBucket>,
    slowest_lookup: Duration,
    fastest_lookup: Duration,
    average_time: Duration,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let percent = |v: u32, of: u32| -> String {
            if of == 0 {
                "-".to_string()
            } else {
                format!("{:.2}%", v as f64 / of as f64 * 100.0)
            }
        };

        writeln!(
            f,
            "[#1] {} [^5] {} [any] {} [none] {} [wrong] {} [fast] {} [slow] {} [avg] {}",
            percent(self.first_position, self.total_words),
            percent(self.top_five, self.total_words),
            percent(self.any_position, self.total_words),
            percent(self.no_suggestions, self.total_words),
            percent(self.only_wrong, self.total_words),
            ms(self.fastest_lookup),
            ms(self.slowest_lookup),
            ms(self.average_time)
        )?;

        for bucket in &self.by_distance {
            let label = if bucket.distance == MAX_REPORTED_DISTANCE {
                format!("{}+", bucket.distance)
            } else {
                bucket.distance.to_string()
            };
            writeln!(
                f,
                "  distance {}: {} words, {} first",
                label,
                bucket.total,
                percent(bucket.first_position, bucket.total)
            )?;
        }

        Ok(())
    }
}

impl Summary {
    fn new(results: &[WordResult<'_>]) -> Summary {
        let mut summary = Summary::default();
        let mut by_distance = (0..=MAX_REPORTED_DISTANCE)
            .map(|distance| DistanceBucket {
                distance,
                ..DistanceBucket::default()
            })
            .collect::<Vec<_>>();

        for result in results {
            summary.total_words += 1;
            let bucket = &mut by_distance[result.distance.min(MAX_REPORTED_DISTANCE)];
            bucket.total += 1;

            match result.position {
                Some(position) => {
                    summary.any_position += 1;
                    if position == 0 {
                        summary.first_position += 1;
                        bucket.first_position += 1;
                    }
                    if position < 5 {
                        summary.top_five += 1;
                    }
                }
                None if result.suggestions.is_empty() => summary.no_suggestions += 1,
                None => summary.only_wrong += 1,
            }
        }

        summary.by_distance = by_distance.into_iter().filter(|b| b.total > 0).collect();

        let times = results.iter().map(|r| r.time);
        summary.slowest_lookup = times.clone().max().unwrap_or_default();
        summary.fastest_lookup = times.clone().min().unwrap_or_default();
        if !results.is_empty() {
            summary.average_time = times.sum::<Duration>() / results.len() as u32;
        }

        summary
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    pretty_env_logger::init();

    let matches = App::new("lmspell-accuracy")
        .setting(AppSettings::ArgRequiredElseHelp)
        .version(env!("CARGO_PKG_VERSION"))
        .about("Measures how often lmspell ranks the expected correction first.")
        .arg(
            Arg::with_name("config")
                .short("c")
                .takes_value(true)
                .help("JSON corrector config overriding the defaults"),
        )
        .arg(
            Arg::with_name("words")
                .value_name("WORDS")
                .required(true)
                .help("Tab-separated 'typo<TAB>expected' pairs"),
        )
        .arg(
            Arg::with_name("model")
                .value_name("MODEL")
                .required(true)
                .help("Trained language model"),
        )
        .arg(
            Arg::with_name("json-output")
                .short("o")
                .value_name("JSON-OUTPUT")
                .help("Write a JSON report with every lookup to this path"),
        )
        .arg(
            Arg::with_name("max-words")
                .short("w")
                .takes_value(true)
                .help("Only test the first N pairs"),
        )
        .get_matches();

    let cfg = match matches.value_of("config") {
        Some(path) => CorrectorConfig::from_json_file(path)?,
        None => CorrectorConfig::default(),
    };

    let model_path = matches.value_of("model").ok_or("no model given")?;
    let corrector = SpellCorrector::open(model_path, cfg.clone())?;

    let words_path = matches.value_of("words").ok_or("no word list given")?;
    let max_words = matches
        .value_of("max-words")
        .map(str::parse::<usize>)
        .transpose()?;
    let words = load_words(words_path, max_words)?;

    let pb = ProgressBar::new(words.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{pos}/{len} [{percent}%] {wide_bar} {elapsed_precise}"),
    );

    let started_at = SystemTime::now().duration_since(SystemTime::UNIX_EPOCH)?;
    let start_time = Instant::now();
    let results = words
        .par_iter()
        .progress_with(pb)
        .map(|(input, expected)| {
            let now = Instant::now();
            let suggestions = corrector.get_candidates_raw(&[input.as_str()], 0);
            let time = now.elapsed();

            let expected_lower = expected.to_lowercase();
            let position = suggestions
                .iter()
                .position(|x| x.value() == expected_lower);

            WordResult {
                input,
                expected,
                distance: damerau_levenshtein(&input.to_lowercase(), &expected_lower),
                suggestions,
                position,
                time,
            }
        })
        .collect::<Vec<_>>();
    let total_time = start_time.elapsed();

    let summary = Summary::new(&results);
    print!("{}", summary);

    if let Some(path) = matches.value_of("json-output") {
        let output = std::fs::File::create(path)?;
        let report = Report {
            model: corrector.stats().ok(),
            config: &cfg,
            summary,
            results,
            started_at,
            total_time,
        };
        println!("Writing JSON report to {}", path);
        serde_json::to_writer_pretty(output, &report)?;
    }

    Ok(())
}
