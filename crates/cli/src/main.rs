use anyhow::{Context, Result};
use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};
use config::{EmbedMode, FileConfig, Overrides, Settings, ENV_CONFIG};
use docindex_indexer::{
    load_documents, DirectorySource, IngestOptions, IngestReport, IngestionPipeline,
    PersistOutcome,
};
use docindex_search::{QueryEngine, QueryOptions, QueryOutcome};
use docindex_vector_store::{IndexHandle, IngestMode};
use serde::Serialize;
use std::env;
use std::path::PathBuf;

mod config;
mod embedder;

#[derive(Parser)]
#[command(name = "docindex")]
#[command(about = "Embed documents into a local vector index and query it", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to docindex.toml (default: ./docindex.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Snapshot file of the index
    #[arg(long, global = true)]
    snapshot: Option<PathBuf>,

    /// Override embedding backend
    #[arg(long, global = true, value_enum)]
    embed_mode: Option<EmbedModeFlag>,

    /// Embeddings endpoint for --embed-mode http
    #[arg(long, global = true)]
    embed_url: Option<String>,

    /// Override embedding model id
    #[arg(long, global = true)]
    embed_model: Option<String>,

    /// Expected vector dimension (also the stub embedder's output size)
    #[arg(long, global = true)]
    dimension: Option<usize>,

    /// Print machine-readable JSON on stdout
    #[arg(long, global = true)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Embed documents and add them to the index
    Ingest(IngestArgs),

    /// Retrieve the documents closest to a question
    Query(QueryArgs),

    /// Show index size and dimension
    Stats,
}

#[derive(Args)]
#[command(group(ArgGroup::new("source").required(true).args(["file", "dir"])))]
struct IngestArgs {
    /// JSON array or JSON-lines file of {id, name, text}
    #[arg(long)]
    file: Option<PathBuf>,

    /// Directory of text files (.gitignore aware)
    #[arg(long)]
    dir: Option<PathBuf>,

    /// What to do with ids that are already indexed
    #[arg(long, value_enum)]
    mode: Option<IngestModeFlag>,
}

#[derive(Args)]
struct QueryArgs {
    /// Question text
    text: String,

    /// Number of documents to return
    #[arg(short = 'k', long = "limit")]
    k: Option<usize>,

    /// Excerpt length in characters
    #[arg(long)]
    excerpt: Option<usize>,

    /// Print the rendered context block instead of a ranked list
    #[arg(long)]
    context: bool,
}

#[derive(Copy, Clone, ValueEnum)]
enum EmbedModeFlag {
    Stub,
    Http,
}

impl EmbedModeFlag {
    const fn as_domain(self) -> EmbedMode {
        match self {
            EmbedModeFlag::Stub => EmbedMode::Stub,
            EmbedModeFlag::Http => EmbedMode::Http,
        }
    }
}

#[derive(Copy, Clone, ValueEnum)]
enum IngestModeFlag {
    Append,
    UpsertById,
}

impl IngestModeFlag {
    const fn as_domain(self) -> IngestMode {
        match self {
            IngestModeFlag::Append => IngestMode::Append,
            IngestModeFlag::UpsertById => IngestMode::UpsertById,
        }
    }
}

#[derive(Serialize)]
struct StatsOutput {
    snapshot_path: String,
    documents: usize,
    dimension: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut cli = Cli::parse();

    // Keep stdout clean for JSON parsing.
    if cli.json {
        cli.quiet = true;
    }

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let config_path = cli.config.clone().or_else(|| {
        env::var(ENV_CONFIG)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
    });
    let file = FileConfig::load(config_path.as_deref())?;
    let overrides = Overrides {
        snapshot: cli.snapshot.clone(),
        embed_mode: cli.embed_mode.map(EmbedModeFlag::as_domain),
        embed_url: cli.embed_url.clone(),
        embed_model: cli.embed_model.clone(),
        dimension: cli.dimension,
    };
    let settings = Settings::resolve(file, overrides, |key| env::var(key).ok())?;
    log::debug!(
        "Snapshot {} (embedder {} / {})",
        settings.snapshot_path.display(),
        settings.embedder.mode.as_str(),
        settings.embedder.model
    );

    match cli.command {
        Commands::Ingest(args) => run_ingest(args, &settings, cli.json).await?,
        Commands::Query(args) => run_query(args, &settings, cli.json).await?,
        Commands::Stats => run_stats(&settings, cli.json).await?,
    }

    Ok(())
}

async fn open_index(settings: &Settings) -> Result<IndexHandle> {
    IndexHandle::open(&settings.snapshot_path, settings.dimension)
        .await
        .with_context(|| format!("Failed to open index {}", settings.snapshot_path.display()))
}

async fn run_ingest(args: IngestArgs, settings: &Settings, json: bool) -> Result<()> {
    let docs = match (&args.file, &args.dir) {
        (Some(file), _) => load_documents(file)
            .await
            .with_context(|| format!("Failed to load documents from {}", file.display()))?,
        (None, Some(dir)) => DirectorySource::new(dir)
            .load()
            .await
            .with_context(|| format!("Failed to read directory {}", dir.display()))?,
        (None, None) => anyhow::bail!("Either --file or --dir is required"),
    };

    let handle = open_index(settings).await?;
    let embedder = embedder::build_embedder(&settings.embedder)?;
    let options = IngestOptions {
        mode: args
            .mode
            .map(IngestModeFlag::as_domain)
            .unwrap_or(settings.ingest_mode),
        embed_timeout: settings.ingest_timeout,
        persist: true,
    };
    let report = IngestionPipeline::with_options(handle, embedder, options)
        .ingest(docs)
        .await
        .context("Ingestion aborted")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_ingest_report(&report, settings);
    }

    if let PersistOutcome::Failed { message } = &report.persistence {
        anyhow::bail!(
            "Snapshot {} was not saved: {message}",
            settings.snapshot_path.display()
        );
    }
    Ok(())
}

fn print_ingest_report(report: &IngestReport, settings: &Settings) {
    println!(
        "Indexed {}/{} documents ({} replaced) in {}ms",
        report.indexed, report.requested, report.replaced, report.time_ms
    );
    for failure in &report.failures {
        println!(
            "  skipped #{} '{}' ({:?}): {}",
            failure.position, failure.id, failure.kind, failure.message
        );
    }
    match &report.persistence {
        PersistOutcome::Saved => println!(
            "Saved {} documents to {}",
            report.total_documents,
            settings.snapshot_path.display()
        ),
        PersistOutcome::Skipped => println!("Nothing new to save"),
        PersistOutcome::Failed { message } => println!("Snapshot not saved: {message}"),
    }
}

async fn run_query(args: QueryArgs, settings: &Settings, json: bool) -> Result<()> {
    let handle = open_index(settings).await?;
    let embedder = embedder::build_embedder(&settings.embedder)?;
    let options = QueryOptions {
        k: settings.query_k,
        excerpt_chars: settings.excerpt_chars,
        embed_timeout: settings.query_timeout,
    };
    let engine = QueryEngine::with_options(handle, embedder, options);

    let k = args.k.unwrap_or(settings.query_k);
    let excerpt = args.excerpt.or(settings.excerpt_chars);
    let outcome = engine
        .query_with(&args.text, k, excerpt)
        .await
        .context("Query failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else if args.context {
        println!("{}", outcome.render_context());
    } else {
        print_query_outcome(&outcome);
    }
    Ok(())
}

fn print_query_outcome(outcome: &QueryOutcome) {
    if outcome.is_empty() {
        println!("{}", outcome.render_context());
        return;
    }
    for (rank, doc) in outcome.results.iter().enumerate() {
        println!(
            "{}. {} [{}] distance={:.4}",
            rank + 1,
            doc.name,
            doc.id,
            doc.distance
        );
        let preview: String = doc.text_excerpt.chars().take(160).collect();
        println!("   {}", preview.replace('\n', " "));
    }
}

async fn run_stats(settings: &Settings, json: bool) -> Result<()> {
    let handle = open_index(settings).await?;
    let stats = StatsOutput {
        snapshot_path: settings.snapshot_path.display().to_string(),
        documents: handle.len().await,
        dimension: handle.dimension().await,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("Snapshot:  {}", stats.snapshot_path);
        println!("Documents: {}", stats.documents);
        match stats.dimension {
            Some(dimension) => println!("Dimension: {dimension}"),
            None => println!("Dimension: unset"),
        }
    }
    Ok(())
}
