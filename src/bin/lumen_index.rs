// CLI front-end (§6 "Indexing API", exit codes). Grounded on the teacher's
// own `[[bin]]` entrypoints for argument parsing and logging setup,
// generalized to wire the Symbol Store, BM25, Vector, embedder, indexer, and
// search engine together behind two subcommands.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use lumen_search_core::config::Config;
use lumen_search_core::observability::logging::init_default_logging;
use lumen_search_core::search::bm25::Bm25Index;
use lumen_search_core::search::vector_index::VectorIndex;
use lumen_search_core::{
    EmbedderClient, IndexOptions, IndexerCoordinator, SearchEngine, SearchOptions, SymbolStore,
};

#[derive(Parser)]
#[command(name = "lumen-index", about = "Index and search a codebase with hybrid BM25/vector retrieval")]
struct Cli {
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Index one or more paths.
    Index { paths: Vec<PathBuf> },
    /// Run a single query and print the ranked hits.
    Search {
        query: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Print store sizes and last indexing time.
    Status,
}

#[tokio::main]
async fn main() -> ExitCode {
    if init_default_logging().is_err() {
        eprintln!("warning: failed to initialize logging, continuing without it");
    }

    match run().await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "fatal error");
            ExitCode::from(1)
        }
    }
}

async fn run() -> lumen_search_core::Result<ExitCode> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load_or_default(".index/config.json")?,
    };
    if let Err(e) = config.validate() {
        tracing::error!(error = %e, "configuration invalid");
        return Ok(ExitCode::from(2));
    }

    std::fs::create_dir_all(&config.storage.index_dir)?;

    let symbols = Arc::new(SymbolStore::open(config.storage.index_dir.join("symbols.db"))?);
    let bm25_db = sled::open(config.storage.index_dir.join("bm25.db"))?;
    let bm25 = Arc::new(Bm25Index::open(&bm25_db, &config.bm25)?);
    let vectors_db = sled::open(config.storage.index_dir.join("vectors.hnsw"))?;
    let vectors = Arc::new(VectorIndex::open(&vectors_db, config.embedder.dimension, config.hnsw.clone())?);
    let embedder = Arc::new(EmbedderClient::new(&config.embedder)?);

    match cli.command {
        Command::Index { paths } => {
            let coordinator =
                IndexerCoordinator::new(symbols, bm25.clone(), vectors.clone(), embedder, config.clone());
            if let Err(e) = coordinator.reconcile_orphans() {
                tracing::warn!(error = %e, "startup reconciliation sweep failed");
            }

            let paths = if paths.is_empty() { vec![PathBuf::from(".")] } else { paths };
            let report = coordinator
                .index(&paths, IndexOptions::default(), |event| {
                    tracing::info!(
                        files_seen = event.files_seen,
                        files_changed = event.files_changed,
                        chunks_embedded = event.chunks_embedded,
                        elapsed_s = event.elapsed.as_secs_f64(),
                        "indexing progress"
                    );
                })
                .await?;

            lumen_search_core::observability::metrics::metrics().record_indexing_run(
                report.files_seen as u64,
                report.files_changed as u64,
                report.files_deleted as u64,
                report.chunks_embedded as u64,
                report.failed.len() as u64,
                report.elapsed,
            );

            println!(
                "indexed: {} seen, {} changed, {} deleted, {} chunks embedded, {} failed ({:.2}s)",
                report.files_seen,
                report.files_changed,
                report.files_deleted,
                report.chunks_embedded,
                report.failed.len(),
                report.elapsed.as_secs_f64()
            );
            for (path, error) in &report.failed {
                eprintln!("  failed: {path}: {error}");
            }

            bm25.save()?;
            vectors.save()?;

            Ok(if report.failed.is_empty() { ExitCode::SUCCESS } else { ExitCode::from(1) })
        }

        Command::Search { query, limit } => {
            let engine = SearchEngine::new(bm25, vectors, symbols, embedder, config);
            let options = SearchOptions { limit: Some(limit), ..SearchOptions::default() };
            let results = engine.search(&query, options).await?;

            for hit in &results.hits {
                println!(
                    "{:.4}  {}:{}-{}  {} {}",
                    hit.final_score, hit.path, hit.byte_start, hit.byte_end, hit.symbol_kind, hit.symbol_name
                );
            }
            for warning in &results.warnings {
                eprintln!("warning: {warning}");
            }

            Ok(ExitCode::SUCCESS)
        }

        Command::Status => {
            let coordinator = IndexerCoordinator::new(
                symbols,
                bm25,
                vectors,
                embedder,
                config,
            );
            let status = coordinator.status()?;
            println!(
                "files={} chunks={} last_indexed_at={:?} health={:?}",
                status.files, status.chunks, status.last_indexed_at, status.index_health
            );
            Ok(ExitCode::SUCCESS)
        }
    }
}
