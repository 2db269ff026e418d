use clap::{Parser, Subcommand};
use docent_embed::EmbeddingMode;
use docent_retriever::{
    EngineConfig, LoadedIndex, RetrievalEngine, ScoredChunk, SplitStrategy,
};
use serde::Serialize;
use std::path::PathBuf;
use std::process;

/// A CLI tool to index PDF knowledge bases and query them with docent-retriever.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory scanned for PDFs when no files are given
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Use deterministic offline embeddings instead of the live API
    #[arg(long, global = true)]
    dev: bool,

    /// Maximum chunk size in characters
    #[arg(long, global = true)]
    chunk_size: Option<usize>,

    /// Characters of overlap between consecutive chunks
    #[arg(long, global = true)]
    chunk_overlap: Option<usize>,

    /// Split pages into fixed-size windows instead of on text boundaries
    #[arg(long, global = true)]
    fixed_window: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build an index and report what was loaded
    Index {
        /// PDF files to index (defaults to the data directory)
        files: Vec<PathBuf>,
        /// Output format
        #[arg(short, long, default_value = "summary")]
        format: OutputFormat,
    },
    /// Retrieve the chunks most similar to a query
    Query {
        /// Query text
        text: String,
        /// PDF files to index (defaults to the data directory)
        #[arg(long, num_args = 1..)]
        files: Vec<PathBuf>,
        /// Number of results (defaults to top_k from the configuration)
        #[arg(short, long)]
        k: Option<usize>,
        /// Minimum similarity threshold (-1.0 to 1.0)
        #[arg(short, long)]
        threshold: Option<f32>,
        /// Output format
        #[arg(short, long, default_value = "summary")]
        format: OutputFormat,
    },
    /// Print the context block a chat prompt would receive for a query
    Context {
        /// Query text
        text: String,
        /// PDF files to index (defaults to the data directory)
        #[arg(long, num_args = 1..)]
        files: Vec<PathBuf>,
        /// Number of passages (defaults to top_k from the configuration)
        #[arg(short, long)]
        k: Option<usize>,
    },
}

#[derive(Debug, Clone, PartialEq)]
enum OutputFormat {
    Summary,
    Full,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "summary" => Ok(OutputFormat::Summary),
            "full" => Ok(OutputFormat::Full),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid format: {s}")),
        }
    }
}

#[derive(Serialize)]
struct QueryOutput<'a> {
    query: &'a str,
    mode: EmbeddingMode,
    results: &'a [ScoredChunk],
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn build_config(args: &Args) -> anyhow::Result<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };
    config.apply_env()?;

    if let Some(dir) = &args.data_dir {
        config.knowledge_base_directory = dir.clone();
    }
    if args.dev {
        config.embedding.mode = EmbeddingMode::DeterministicFallback;
    }
    if let Some(size) = args.chunk_size {
        config.chunking.chunk_size = size;
    }
    if let Some(overlap) = args.chunk_overlap {
        config.chunking.chunk_overlap = overlap;
    }
    if args.fixed_window {
        config.chunking.strategy = SplitStrategy::FixedWindow;
    }

    config.validate()?;
    Ok(config)
}

async fn load(engine: &RetrievalEngine, files: &[PathBuf]) -> anyhow::Result<Option<LoadedIndex>> {
    let paths = (!files.is_empty()).then_some(files);
    Ok(engine.load_index(paths).await?)
}

async fn run() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = build_config(&args)?;
    let top_k = config.top_k;
    let engine = RetrievalEngine::new(config)?;

    match args.command {
        Commands::Index { files, format } => {
            let Some(loaded) = load(&engine, &files).await? else {
                println!("No documents to index.");
                return Ok(());
            };
            let stats = loaded.retriever.stats();

            match format {
                OutputFormat::Json => {
                    #[derive(Serialize)]
                    struct IndexOutput<'a> {
                        report: &'a docent_retriever::BuildReport,
                        index: docent_retriever::IndexStats,
                    }
                    let output = IndexOutput {
                        report: &loaded.report,
                        index: stats,
                    };
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
                OutputFormat::Summary | OutputFormat::Full => {
                    let report = &loaded.report;
                    println!("Index Statistics:");
                    println!(
                        "  Files loaded: {} of {}",
                        report.files_loaded, report.files_requested
                    );
                    println!("  Pages: {}", report.pages);
                    println!("  Chunks: {}", report.chunks);
                    println!("  Embedding dimension: {}", stats.dimension);
                    println!("  Embedding mode: {}", stats.mode);
                    if !report.failures.is_empty() {
                        println!("  Skipped files:");
                        for failure in &report.failures {
                            println!("    {failure}");
                        }
                    }
                }
            }
            Ok(())
        }
        Commands::Query {
            text,
            files,
            k,
            threshold,
            format,
        } => {
            let Some(loaded) = load(&engine, &files).await? else {
                println!("No documents to search.");
                return Ok(());
            };
            let k = k.unwrap_or(top_k);
            let results = loaded
                .retriever
                .retrieve_with_threshold(&text, k, threshold)
                .await?;

            match format {
                OutputFormat::Json => {
                    let output = QueryOutput {
                        query: &text,
                        mode: engine.mode(),
                        results: &results,
                    };
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
                OutputFormat::Summary => {
                    println!("Found {} similar chunks:", results.len());
                    for result in &results {
                        let chunk = &result.chunk;
                        println!(
                            "  Similarity: {:.3} | File: {} | Page: {} | Offset: {}",
                            result.similarity, chunk.source_path, chunk.page_number, chunk.chunk_start
                        );
                        println!(
                            "    {}",
                            chunk.chunk_text.chars().take(100).collect::<String>().replace('\n', " ")
                        );
                    }
                }
                OutputFormat::Full => {
                    for result in &results {
                        let chunk = &result.chunk;
                        println!("Similarity: {:.3}", result.similarity);
                        println!("File: {}", chunk.source_path);
                        println!("Page: {}", chunk.page_number);
                        println!("Characters: {}-{}", chunk.chunk_start, chunk.chunk_end());
                        println!("Content:\n{}", chunk.chunk_text);
                        println!("---");
                    }
                }
            }
            Ok(())
        }
        Commands::Context { text, files, k } => {
            let k = k.unwrap_or(top_k);
            let paths = (!files.is_empty()).then_some(files.as_slice());
            let results = engine.retrieve_from(paths, &text, k).await;
            let context = docent_context::build_context_block(results.iter().map(|r| &r.chunk));
            if context.is_empty() {
                eprintln!("No relevant context found.");
            } else {
                println!("{context}");
            }
            Ok(())
        }
    }
}
