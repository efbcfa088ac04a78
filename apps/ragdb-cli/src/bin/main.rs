use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use ragdb_core::config::{Config, Settings};
use ragdb_core::traits::Generator;
use ragdb_core::types::ScoredSegment;
use ragdb_embed::get_default_embedder;
use ragdb_llm::{OpenAiGenerator, PING_PROMPT};
use ragdb_pipeline::{grounded_prompt, Ingestor, RagPipeline, Retriever};
use ragdb_vector::VectorIndex;

const DEFAULT_QUESTION: &str = "Can you tell me something about thoughtful mind";
const SNIPPET_CHARS: usize = 200;

#[derive(Parser, Debug)]
#[command(name = "ragdb", version, about = "Ingest documents into a local vector index and answer questions over them")]
struct Cli {
    /// Config file to use instead of ./config.toml and its RUST_ENV profile
    #[arg(long, global = true, env = "RAGDB_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the index from a PDF, text file or directory
    Ingest {
        /// Defaults to storage.data_path
        path: Option<PathBuf>,
        #[arg(long)]
        index: Option<PathBuf>,
        #[arg(long, default_value_t = false)]
        no_progress: bool,
    },
    /// Print the segments most similar to a query
    Search {
        query: String,
        #[arg(short, long)]
        k: Option<usize>,
        #[arg(long)]
        index: Option<PathBuf>,
    },
    /// Answer a question from the indexed documents
    Ask {
        #[arg(default_value = DEFAULT_QUESTION)]
        question: String,
        #[arg(short, long)]
        k: Option<usize>,
        #[arg(long)]
        index: Option<PathBuf>,
        /// Print the prompt instead of calling the generator
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
    /// Check that the generator endpoint answers
    Ping,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load_file(path),
        None => Config::load(),
    }
    .context("Error loading config")?;
    let settings = config.settings()?;

    match cli.command {
        Command::Ingest { path, index, no_progress } => ingest(&settings, path, index, !no_progress),
        Command::Search { query, k, index } => search(&settings, &query, k, index),
        Command::Ask { question, k, index, dry_run } => ask(&settings, &question, k, index, dry_run),
        Command::Ping => ping(&settings),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn ingest(settings: &Settings, path: Option<PathBuf>, index: Option<PathBuf>, progress: bool) -> Result<()> {
    let source = path.unwrap_or_else(|| settings.storage.data_path.clone());
    let index_path = index.unwrap_or_else(|| settings.storage.index_path.clone());
    println!("Ingesting {}", source.display());

    let embedder = get_default_embedder(&settings.embedding)?;
    let ingestor = Ingestor::from_settings(settings, embedder)?.with_progress(progress);
    let report = tokio::runtime::Runtime::new()?.block_on(ingestor.ingest(&source, &index_path))?;

    println!(
        "Index written to '{}': {} documents, {} pages, {} segments (dim {}) in {:.1}s",
        index_path.display(),
        report.documents,
        report.pages,
        report.segments,
        report.dimensionality,
        report.elapsed.as_secs_f64()
    );
    Ok(())
}

fn open_retriever(settings: &Settings, index: Option<PathBuf>) -> Result<Retriever> {
    let index_path = index.unwrap_or_else(|| settings.storage.index_path.clone());
    let loaded = load_index(&index_path)?;
    let embedder = get_default_embedder(&settings.embedding)?;
    Ok(Retriever::new(embedder, loaded).with_timeout(Duration::from_secs(settings.embedding.timeout_secs)))
}

fn load_index(path: &Path) -> Result<VectorIndex> {
    VectorIndex::load(path).with_context(|| format!("cannot open index '{}' (run `ragdb ingest` first?)", path.display()))
}

fn search(settings: &Settings, query: &str, k: Option<usize>, index: Option<PathBuf>) -> Result<()> {
    let retriever = open_retriever(settings, index)?;
    println!("Searching for: '{query}'");
    let hits = retriever.retrieve_scored(query, k.unwrap_or(settings.retrieval.top_k))?;
    println!("\n--- Found these relevant snippets ---");
    print_sources(&hits);
    Ok(())
}

fn ask(settings: &Settings, question: &str, k: Option<usize>, index: Option<PathBuf>, dry_run: bool) -> Result<()> {
    let k = k.unwrap_or(settings.retrieval.top_k);
    let question = question.trim();
    anyhow::ensure!(!question.is_empty(), "question is empty");
    if dry_run {
        let retriever = open_retriever(settings, index)?;
        let (prompt, _) = grounded_prompt(&retriever, question, k)?;
        println!("{prompt}");
        return Ok(());
    }

    let api_key = settings.require_api_key()?;
    let generator: Arc<dyn Generator> = Arc::new(OpenAiGenerator::new(&api_key, &settings.generation)?);
    let pipeline = RagPipeline::new(open_retriever(settings, index)?, generator, k);

    println!("Question: {question}");
    let answer = pipeline.answer(question)?;
    println!("Answer: {}", answer.text);
    if !answer.sources.is_empty() {
        println!("\n--- Sources ---");
        print_sources(&answer.sources);
    }
    Ok(())
}

fn ping(settings: &Settings) -> Result<()> {
    let api_key = settings.require_api_key()?;
    let generator = OpenAiGenerator::new(&api_key, &settings.generation)?;
    tracing::info!(endpoint = generator.endpoint(), model = %settings.generation.model, "pinging generator");
    println!("{}", generator.generate(PING_PROMPT)?);
    Ok(())
}

fn print_sources(hits: &[ScoredSegment]) {
    for (rank, hit) in hits.iter().enumerate() {
        let page = hit.segment.meta("page").map(|p| format!(" page {p}")).unwrap_or_default();
        let snippet: String = hit.segment.text.chars().take(SNIPPET_CHARS).collect();
        println!("\n[{}] {} (score {:.4}{page})\n{snippet}...", rank + 1, hit.segment.id, hit.score);
    }
}
