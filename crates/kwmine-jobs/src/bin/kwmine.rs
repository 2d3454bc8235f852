//! kwmine: keyword extraction and clustering for place reviews.
//!
//! Runs the pipeline in-process, queues pipeline jobs, or serves them from
//! a polling worker.

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use kwmine_cluster::{ClusterConfig, PlaceClusterer};
use kwmine_core::{
    EmbeddingBackend, JobKind, JobRepository, KeywordFilter, ProgressSink, Stopwords,
};
use kwmine_db::{log_pool_metrics, Database, PoolConfig};
use kwmine_inference::{LinderaAnalyzer, MockEmbedder, OllamaEmbedder};
use kwmine_jobs::{KeywordPipeline, KeywordPipelineHandler, PipelineBuilder, WorkerBuilder, WorkerConfig};

#[derive(Parser)]
#[command(name = "kwmine")]
#[command(author, version, about = "Keyword mining for place reviews")]
#[command(propagate_version = true)]
struct Cli {
    /// Use deterministic mock embeddings instead of the embedding server
    #[arg(long, global = true)]
    mock_embeddings: bool,

    /// Skip applying database migrations at startup
    #[arg(long, global = true)]
    skip_migrations: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline once in-process and print the report
    Run {
        /// Stages to run: extract_and_cluster, extract_only, cluster_only
        #[arg(short, long, default_value = "extract_and_cluster")]
        kind: JobKind,
    },

    /// Rebuild keyword counts only
    Extract,

    /// Rebuild clusters from stored keyword counts only
    Cluster,

    /// Queue a pipeline job and print its id
    Enqueue {
        /// Stages to run: extract_and_cluster, extract_only, cluster_only
        #[arg(short, long, default_value = "extract_and_cluster")]
        kind: JobKind,
    },

    /// Process queued jobs until Ctrl-C
    Worker,

    /// Print a job record as JSON
    Status {
        /// Job id returned by `enqueue`
        job_id: Uuid,
    },

    /// List the most recent jobs
    Jobs {
        /// Maximum number of jobs to list
        #[arg(short, long, default_value_t = 20)]
        limit: i64,
    },
}

/// Logs every progress report at info.
struct LogProgress;

impl ProgressSink for LogProgress {
    fn report(&self, percent: i32, stage: &str) {
        info!(percent, stage, "Progress");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let _log_guard = init_tracing();

    let cli = Cli::parse();

    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "postgres://localhost/kwmine".to_string());
    let db = Database::connect_with_config(&database_url, PoolConfig::from_env())
        .await
        .context("Failed to connect to database")?;
    if !cli.skip_migrations {
        db.migrate().await.context("Failed to run migrations")?;
    }

    match cli.command {
        Commands::Run { kind } => run_once(&db, kind, cli.mock_embeddings).await?,
        Commands::Extract => run_once(&db, JobKind::ExtractOnly, cli.mock_embeddings).await?,
        Commands::Cluster => run_once(&db, JobKind::ClusterOnly, cli.mock_embeddings).await?,
        Commands::Enqueue { kind } => {
            let job_id = db.jobs.create(kind).await?;
            println!("{}", job_id);
        }
        Commands::Worker => run_worker(&db, cli.mock_embeddings).await?,
        Commands::Status { job_id } => {
            let job = db
                .jobs
                .get(job_id)
                .await?
                .with_context(|| format!("Job {} not found", job_id))?;
            println!("{}", serde_json::to_string_pretty(&job)?);
        }
        Commands::Jobs { limit } => {
            let jobs = db.jobs.list_recent(limit).await?;
            println!("{}", serde_json::to_string_pretty(&jobs)?);
        }
    }
    Ok(())
}

/// Configure tracing.
///
/// Environment variables:
///   LOG_FORMAT - "json" or "text" (default: "text")
///   LOG_FILE   - path to log file (optional, daily rotation)
///   RUST_LOG   - standard env filter (default: "kwmine=info,kwmine_jobs=info")
fn init_tracing() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "kwmine=info,kwmine_jobs=info".into());
    let registry = tracing_subscriber::registry().with(env_filter);

    let guard = if let Some(ref path) = log_file {
        let file_dir = std::path::Path::new(path)
            .parent()
            .unwrap_or(std::path::Path::new("."));
        let file_name = std::path::Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("kwmine.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(non_blocking),
                )
                .init();
        }
        Some(guard)
    } else {
        // Logs go to stderr so stdout carries only command output.
        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        } else {
            registry
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
        None
    };

    info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stderr)"),
        "Logging initialized"
    );
    guard
}

fn build_embedder(mock: bool) -> anyhow::Result<Arc<dyn EmbeddingBackend>> {
    if mock {
        let dimension = std::env::var("KWMINE_EMBED_DIM")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(kwmine_core::defaults::EMBED_DIMENSION);
        info!(dimension, "Using mock embeddings");
        return Ok(Arc::new(MockEmbedder::new(dimension)));
    }
    let embedder = OllamaEmbedder::from_env().context("Failed to configure embedding backend")?;
    info!(
        base_url = embedder.base_url(),
        model = embedder.model_name(),
        "Using embedding server"
    );
    Ok(Arc::new(embedder))
}

fn build_pipeline(db: &Database, mock_embeddings: bool) -> anyhow::Result<KeywordPipeline> {
    let stopwords = Stopwords::from_env().context("Failed to load stopwords")?;
    let analyzer = LinderaAnalyzer::new().context("Failed to load morphological analyzer")?;
    let embedder = build_embedder(mock_embeddings)?;

    Ok(PipelineBuilder::new(
        Arc::new(db.reviews.clone()),
        Arc::new(db.keywords.clone()),
        Arc::new(db.clusters.clone()),
        Arc::new(analyzer),
        embedder,
        KeywordFilter::new(stopwords),
    )
    .with_clusterer(PlaceClusterer::new(ClusterConfig::from_env()))
    .build())
}

async fn run_once(db: &Database, kind: JobKind, mock_embeddings: bool) -> anyhow::Result<()> {
    let pipeline = build_pipeline(db, mock_embeddings)?;
    let report = pipeline.run(kind, &LogProgress).await?;
    log_pool_metrics(db.pool());
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn run_worker(db: &Database, mock_embeddings: bool) -> anyhow::Result<()> {
    let pipeline = build_pipeline(db, mock_embeddings)?;
    let worker = WorkerBuilder::new(Arc::new(db.jobs.clone()))
        .with_config(WorkerConfig::from_env())
        .with_handler(KeywordPipelineHandler::new(pipeline))
        .build();
    info!(pending = worker.pending_count().await?, "Starting job worker");

    let handle = worker.start();
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    info!("Shutdown requested, waiting for the current job to finish");
    handle.stop().await?;
    log_pool_metrics(db.pool());
    Ok(())
}
