//! # Catalog Search CLI (`catsearch`)
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `catsearch serve` | Run the sync scheduler and the HTTP server |
//! | `catsearch sync` | Run one sync pass and print the report |
//! | `catsearch search "<query>"` | Query the index from the command line |
//!
//! All commands accept `--config` pointing to a TOML file; a missing file
//! means defaults for everything. The embedding credential is read from
//! `OPENAI_API_KEY`; without it the deterministic fallback embeddings are
//! used, which keeps every command functional offline.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use catalog_search::config::{load_config, Config};
use catalog_search::embedding::Embedder;
use catalog_search::index::qdrant::QdrantIndex;
use catalog_search::index::VectorIndex;
use catalog_search::ledger::LedgerClient;
use catalog_search::models::SearchRequest;
use catalog_search::scheduler;
use catalog_search::search::QueryEngine;
use catalog_search::server::run_server;
use catalog_search::sync::Synchronizer;

#[derive(Parser)]
#[command(
    name = "catsearch",
    about = "Semantic search over a ledger's dataset catalog",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). Missing file = defaults.
    #[arg(long, global = true, default_value = "./config/catalog.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the service: initial sync, periodic resync, HTTP API.
    Serve,

    /// Run one sync pass against the ledger and print the report.
    Sync,

    /// Query the index once and print the results as JSON.
    Search {
        query: String,

        /// Maximum result count (default 10).
        #[arg(long)]
        limit: Option<i64>,

        /// Only return datasets from this agency.
        #[arg(long)]
        agency: Option<String>,

        /// Only return datasets in this category.
        #[arg(long)]
        category: Option<String>,
    },
}

/// Construct the shared clients. Failure to reach the vector store here
/// is fatal — the process is useless without its collection.
async fn build_pipeline(config: &Config) -> Result<(Arc<Embedder>, Arc<dyn VectorIndex>)> {
    let embedder = Arc::new(Embedder::from_env(&config.embedding)?);

    let index = QdrantIndex::new(
        &config.qdrant.url,
        &config.qdrant.collection,
        embedder.dims(),
    )?;
    index.ensure_collection().await?;
    let index: Arc<dyn VectorIndex> = Arc::new(index);

    Ok((embedder, index))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Serve => {
            let (embedder, index) = build_pipeline(&config).await?;
            let ledger = Arc::new(LedgerClient::new(
                &config.ledger.base_url,
                &config.ledger.catalog_path,
            )?);

            let synchronizer = Arc::new(Synchronizer::new(
                ledger,
                embedder.clone(),
                index.clone(),
            ));
            let sync_handle = scheduler::spawn(
                synchronizer,
                Duration::from_secs(config.sync.interval_secs),
            );

            let engine = Arc::new(QueryEngine::new(embedder, index));
            run_server(&config, engine, sync_handle).await?;
        }

        Commands::Sync => {
            let (embedder, index) = build_pipeline(&config).await?;
            let ledger = Arc::new(LedgerClient::new(
                &config.ledger.base_url,
                &config.ledger.catalog_path,
            )?);

            let synchronizer = Synchronizer::new(ledger, embedder, index);
            let report = synchronizer.sync().await?;

            println!("sync finished");
            println!("  fetched: {}", report.fetched);
            println!("  indexed: {}", report.indexed);
            println!("  failed:  {}", report.failures.len());
            for failure in &report.failures {
                println!(
                    "    {} ({:?}): {}",
                    failure.dataset_id, failure.kind, failure.message
                );
            }
        }

        Commands::Search {
            query,
            limit,
            agency,
            category,
        } => {
            let (embedder, index) = build_pipeline(&config).await?;
            let engine = QueryEngine::new(embedder, index);

            let response = engine
                .search(&SearchRequest {
                    query,
                    limit: limit.unwrap_or(0),
                    agency,
                    category,
                })
                .await?;

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }

    Ok(())
}
