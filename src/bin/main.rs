// File: src/bin/main.rs
use crossterm::style::Stylize;
use decoder_core::core::reordering::ReorderingModel;
use decoder_core::core::score::TRANSLATION_MODEL;
use decoder_core::models::{BackoffLm, MemoryPhraseTable, MsdReorderingTable};
use decoder_core::persistence::save_search_graphs;
use decoder_core::{Decoder, DecoderConfig, Models, Translation, Vocabulary};
use serde::Deserialize;
use std::error::Error;
use std::io::{stdin, BufRead};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: decoder <bundle.json> [--nbest N] [--search-graph PATH]";

/// Demo model bundle: configuration plus small in-memory models.
#[derive(Deserialize)]
struct Bundle {
    #[serde(default)]
    config: DecoderConfig,
    phrases: Vec<PhraseEntry>,
    #[serde(default)]
    language_models: Vec<LmEntry>,
    reordering: Option<ReorderingEntry>,
}

#[derive(Deserialize)]
struct PhraseEntry {
    source: String,
    target: String,
    scores: Vec<f32>,
}

#[derive(Deserialize)]
struct LmEntry {
    order: usize,
    unknown_log_prob: Option<f32>,
    ngrams: Vec<NgramEntry>,
}

#[derive(Deserialize)]
struct NgramEntry {
    words: String,
    log_prob: f32,
    #[serde(default)]
    backoff: f32,
}

#[derive(Deserialize)]
struct ReorderingEntry {
    default: [f32; 3],
    #[serde(default)]
    entries: Vec<OrientationEntry>,
}

#[derive(Deserialize)]
struct OrientationEntry {
    source: String,
    target: String,
    scores: [f32; 3],
}

struct Args {
    bundle: PathBuf,
    nbest: Option<usize>,
    search_graph: Option<PathBuf>,
}

fn parse_args() -> Result<Args, String> {
    let mut args = std::env::args().skip(1);
    let mut bundle = None;
    let mut nbest = None;
    let mut search_graph = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--nbest" => {
                let value = args.next().ok_or("--nbest needs a value")?;
                nbest = Some(value.parse().map_err(|_| format!("bad --nbest value `{value}`"))?);
            }
            "--search-graph" => {
                search_graph = Some(PathBuf::from(args.next().ok_or("--search-graph needs a path")?));
            }
            "-h" | "--help" => return Err(USAGE.to_string()),
            _ if bundle.is_none() => bundle = Some(PathBuf::from(arg)),
            other => return Err(format!("unexpected argument `{other}`\n{USAGE}")),
        }
    }
    Ok(Args {
        bundle: bundle.ok_or(USAGE)?,
        nbest,
        search_graph,
    })
}

fn load(args: &Args) -> Result<Decoder, Box<dyn Error>> {
    let json = std::fs::read_to_string(&args.bundle)?;
    let bundle: Bundle = serde_json::from_str(&json)?;
    let vocab = Arc::new(Vocabulary::new());

    let mut config = bundle.config;
    if let Some(n) = args.nbest {
        config.nbest_size = n;
    }
    config.validate()?;

    let num_scores = match config.weights.get(TRANSLATION_MODEL) {
        Some(weights) => weights.len(),
        None => bundle.phrases.first().map_or(1, |p| p.scores.len()),
    };
    let mut table = MemoryPhraseTable::new(num_scores);
    for entry in &bundle.phrases {
        if entry.scores.len() != num_scores {
            return Err(format!(
                "phrase `{}` -> `{}` has {} scores, expected {num_scores}",
                entry.source,
                entry.target,
                entry.scores.len()
            )
            .into());
        }
        table.insert_text(&vocab, &entry.source, &entry.target, entry.scores.clone());
    }
    let mut models = Models::new(Arc::new(table));

    for lm_entry in &bundle.language_models {
        let mut lm = BackoffLm::new(lm_entry.order.max(1));
        if let Some(log_prob) = lm_entry.unknown_log_prob {
            lm = lm.with_unknown_log_prob(log_prob);
        }
        for ngram in &lm_entry.ngrams {
            lm.insert_text(&vocab, &ngram.words, ngram.log_prob, ngram.backoff);
        }
        models = models.with_language_model(Arc::new(lm));
    }

    if let Some(reordering) = &bundle.reordering {
        let mut table = MsdReorderingTable::new(reordering.default);
        for entry in &reordering.entries {
            table.insert_text(&vocab, &entry.source, &entry.target, entry.scores);
        }
        let model: Arc<dyn ReorderingModel> = Arc::new(table);
        models = models.with_reordering(model);
    }

    Ok(Decoder::new(models, vocab, config)?)
}

fn print_translation(translation: &Translation) {
    let marker = if translation.complete {
        "".to_string()
    } else {
        " (incomplete)".yellow().to_string()
    };
    println!(
        "{} {}{}",
        format!("[{}]", translation.sentence).dark_grey(),
        translation.best.text.as_str().bold().green(),
        marker
    );
    println!(
        "    score {:.4}  hypotheses {}  recombined {}  pruned {}",
        translation.best.total_score,
        translation.stats.created,
        translation.stats.recombined,
        translation.stats.pruned
    );
    for (rank, candidate) in translation.nbest.iter().enumerate() {
        println!(
            "    {:>3}. {:.4}  {}",
            rank + 1,
            candidate.total_score,
            candidate.text.as_str().cyan()
        );
    }
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let decoder = load(&args)?;
    let sentences: Vec<String> = stdin().lock().lines().collect::<Result<_, _>>()?;

    if let Some(path) = &args.search_graph {
        let mut graphs = Vec::with_capacity(sentences.len());
        for (sentence, text) in sentences.iter().enumerate() {
            match decoder.translate_with_graph(sentence, text) {
                Ok((translation, graph)) => {
                    print_translation(&translation);
                    graphs.push(graph);
                }
                Err(e) => eprintln!("{} {e}", "[ERROR]".red()),
            }
        }
        save_search_graphs(&graphs, path)?;
        eprintln!("Search graphs saved to '{}'", path.display());
    } else {
        for result in decoder.translate_batch(&sentences) {
            match result {
                Ok(translation) => print_translation(&translation),
                Err(e) => eprintln!("{} {e}", "[ERROR]".red()),
            }
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{message}");
            return ExitCode::from(2);
        }
    };
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e}", "[ERROR]".red());
            ExitCode::FAILURE
        }
    }
}
