use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use faq_router_core::{
    clinic_faqs, clinic_intents, evaluate_cases, load_entries_jsonl, load_intent_labels,
    load_seeds_jsonl, save_entries_jsonl, EmbeddingProvider, EvalCase, FaqResponder,
    HashEmbeddingProvider, IntentLabelSet, KnowledgeBaseIndex, MiniLmEmbeddingProvider,
    RouterConfig, Thresholds, ZeroShotIntentClassifier, DEFAULT_EMBEDDING_DIM,
    DEFAULT_REQUIRED_PASS_RATE,
};
use std::fs::File;
use std::io::{BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

type Embedder = Arc<dyn EmbeddingProvider>;
type Responder = FaqResponder<Embedder, ZeroShotIntentClassifier<Embedder>>;

#[derive(Debug, Parser)]
#[command(name = "faq-router")]
#[command(about = "Answer support questions from an intent-routed FAQ")]
struct Cli {
    /// Corpus JSONL, one {"question","answer","intent"} object per line. Defaults to the built-in clinic FAQ.
    #[arg(long, global = true)]
    corpus: Option<PathBuf>,

    /// Intent labels, one per line or a .json array. Defaults to the built-in clinic labels.
    #[arg(long, global = true)]
    intents: Option<PathBuf>,

    /// Prebuilt index from `build-index`; skips embedding the corpus at startup and takes precedence over --corpus.
    #[arg(long, global = true)]
    index: Option<PathBuf>,

    /// Directory with model.safetensors, config.json and tokenizer.json of a MiniLM checkpoint. Without it a hashed bag-of-words embedder is used.
    #[arg(long, global = true)]
    model_dir: Option<PathBuf>,

    /// JSON file with thresholds and zero-shot settings.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set.
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, Args)]
struct ThresholdArgs {
    /// Minimum intent confidence to restrict the search to that intent.
    #[arg(long)]
    threshold_intent: Option<f32>,

    /// Minimum cosine similarity for a question to count as a match.
    #[arg(long)]
    threshold_faq: Option<f32>,
}

impl ThresholdArgs {
    fn resolve(&self, config: &RouterConfig) -> Result<Thresholds> {
        let t = Thresholds::new(
            self.threshold_intent.unwrap_or(config.thresholds.intent),
            self.threshold_faq.unwrap_or(config.thresholds.faq),
        )?;
        Ok(t)
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Embed the corpus once and write an index file.
    BuildIndex {
        #[arg(long)]
        output: PathBuf,
    },
    /// Answer a single question.
    Ask {
        #[arg(long)]
        question: String,
        #[command(flatten)]
        thresholds: ThresholdArgs,
        /// Print the full match result as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Answer questions read line by line from stdin.
    Chat {
        #[command(flatten)]
        thresholds: ThresholdArgs,
    },
    /// Run labelled cases and report the pass rate.
    Eval {
        #[arg(long)]
        cases: PathBuf,
        #[command(flatten)]
        thresholds: ThresholdArgs,
        #[arg(long, default_value_t = DEFAULT_REQUIRED_PASS_RATE)]
        min_pass_rate: f32,
    },
}

fn init_tracing(default_filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn read_eval_cases_json(path: &Path) -> Result<Vec<EvalCase>> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let cases: Vec<EvalCase> = serde_json::from_reader(file).context("parse eval cases json")?;
    Ok(cases)
}

fn make_embedder(cli: &Cli) -> Result<Embedder> {
    match &cli.model_dir {
        Some(dir) => {
            info!(dir = %dir.display(), "loading embedding model");
            let provider = MiniLmEmbeddingProvider::load_dir(dir)
                .with_context(|| format!("load model from {}", dir.display()))?;
            Ok(Arc::new(provider))
        }
        None => Ok(Arc::new(HashEmbeddingProvider::new(DEFAULT_EMBEDDING_DIM))),
    }
}

fn load_config(cli: &Cli) -> Result<RouterConfig> {
    match &cli.config {
        Some(path) => RouterConfig::load(path),
        None => Ok(RouterConfig::default()),
    }
}

fn load_labels(cli: &Cli) -> Result<IntentLabelSet> {
    match &cli.intents {
        Some(path) => {
            let labels = load_intent_labels(path)?;
            IntentLabelSet::new(labels)
                .with_context(|| format!("invalid intent labels in {}", path.display()))
        }
        None => Ok(clinic_intents()),
    }
}

fn build_index(cli: &Cli, embedder: &Embedder) -> Result<KnowledgeBaseIndex> {
    let labels = load_labels(cli)?;

    if let Some(path) = &cli.index {
        let entries = load_entries_jsonl(path)?;
        return KnowledgeBaseIndex::from_embedded(entries, labels)
            .with_context(|| format!("invalid index {}", path.display()));
    }

    let seeds = match &cli.corpus {
        Some(path) => load_seeds_jsonl(path)?,
        None => clinic_faqs(),
    };
    let index = KnowledgeBaseIndex::load(seeds, embedder, labels).context("build knowledge base")?;
    Ok(index)
}

fn make_responder(cli: &Cli, config: &RouterConfig) -> Result<Responder> {
    let embedder = make_embedder(cli)?;
    let index = build_index(cli, &embedder)?;
    let classifier =
        ZeroShotIntentClassifier::new(embedder.clone(), index.labels(), config.zero_shot.clone())
            .context("prepare intent classifier")?;
    Ok(FaqResponder::new(Arc::new(index), embedder, classifier))
}

fn chat(responder: &Responder, thresholds: Thresholds) -> Result<()> {
    let stdin = std::io::stdin();
    let interactive = stdin.is_terminal();
    let mut stdout = std::io::stdout().lock();

    if interactive {
        eprint!("> ");
    }
    for line in stdin.lock().lines() {
        let line = line.context("read question")?;
        let question = line.trim();
        if question.eq_ignore_ascii_case("exit") || question.eq_ignore_ascii_case("quit") {
            break;
        }
        if !question.is_empty() {
            let answer = responder.answer(question, thresholds)?;
            writeln!(stdout, "{answer}").context("write answer")?;
            stdout.flush().context("flush answer")?;
        }
        if interactive {
            eprint!("> ");
        }
    }

    Ok(())
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);
    let config = load_config(&cli)?;

    match &cli.command {
        Commands::BuildIndex { output } => {
            let embedder = make_embedder(&cli)?;
            let index = build_index(&cli, &embedder)?;
            let (count, dim) = (index.len(), index.dim());

            save_entries_jsonl(output, &index.into_entries())?;
            println!(
                "indexed_entries={} dim={} output={}",
                count,
                dim,
                output.display()
            );
        }
        Commands::Ask {
            question,
            thresholds,
            json,
        } => {
            let thresholds = thresholds.resolve(&config)?;
            let responder = make_responder(&cli, &config)?;
            let result = responder.respond(question, thresholds)?;

            if *json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&result).context("serialize match result")?
                );
            } else {
                println!("{}", result.text());
            }
        }
        Commands::Chat { thresholds } => {
            let thresholds = thresholds.resolve(&config)?;
            let responder = make_responder(&cli, &config)?;
            chat(&responder, thresholds)?;
        }
        Commands::Eval {
            cases,
            thresholds,
            min_pass_rate,
        } => {
            let thresholds = thresholds.resolve(&config)?;
            let responder = make_responder(&cli, &config)?;
            let run_id = format!("eval-{}", chrono::Utc::now().timestamp_millis());
            let cases = read_eval_cases_json(cases)?;
            let summary = evaluate_cases(&responder, &cases, thresholds)?;

            for o in &summary.outcomes {
                println!(
                    "case={} passed={} stage={:?} entry={} intent={} confidence={:.4} score={:.4} latency={:.1}ms",
                    o.case_id,
                    o.passed,
                    o.actual_stage,
                    o.actual_entry
                        .map(|e| e.to_string())
                        .unwrap_or_else(|| "null".to_string()),
                    o.intent.as_deref().unwrap_or("null"),
                    o.intent_confidence.unwrap_or(0.0),
                    o.score,
                    o.latency_ms
                );
            }

            let avg_ms = summary.total_latency_ms() / summary.outcomes.len().max(1) as f64;
            println!(
                "run_id={} total={} passed={} failed={} pass_rate={:.4} required={:.4} avg_latency={:.1}ms",
                run_id,
                summary.total,
                summary.passed,
                summary.failed,
                summary.pass_rate,
                min_pass_rate,
                avg_ms
            );

            if !summary.meets(*min_pass_rate) {
                anyhow::bail!(
                    "pass rate {:.4} is below the required {:.4}",
                    summary.pass_rate,
                    min_pass_rate
                );
            }
        }
    }

    Ok(())
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
