//! ESL Search Server - HTTP backend for the unified search endpoint.
//!
//! This binary serves `GET /api/search` over a SQLite content store built by
//! the esl-search library.

use anyhow::Result;
use clap::Parser;
use esl_search::{SearchConfig, SearchOptions, SearchService, SqliteStore};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "esl-search-server")]
#[command(about = "Unified search server for ESL learning content")]
struct Args {
    /// Port to listen on (0 = auto-assign)
    #[arg(short, long, default_value = "0")]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// SQLite content database
    #[arg(long, default_value = "esl-content.db")]
    database: PathBuf,

    /// JSON fixture file to load into the database at start-up
    #[arg(long)]
    fixtures: Option<PathBuf>,

    /// Per-entity query timeout in milliseconds
    #[arg(long, default_value_t = SearchConfig::ADAPTER_TIMEOUT.as_millis() as u64)]
    adapter_timeout_ms: u64,

    /// Maximum rows fetched from one entity table per request
    #[arg(long, default_value_t = SearchConfig::PER_ENTITY_CAP)]
    per_entity_cap: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging; RUST_LOG overrides --debug
    if std::env::var_os("RUST_LOG").is_some() {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_target(false)
            .compact()
            .init();
    } else {
        let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
        FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_target(false)
            .with_thread_ids(false)
            .compact()
            .init();
    }

    info!("Starting ESL Search Server");
    info!("Content database: {}", args.database.display());

    let store = SqliteStore::open(args.database.clone())?;
    if let Some(fixtures) = &args.fixtures {
        let loaded = store.load_fixtures(fixtures)?;
        info!("Loaded {} fixture rows from {}", loaded, fixtures.display());
    }

    let options = SearchOptions::default()
        .with_adapter_timeout(Duration::from_millis(args.adapter_timeout_ms))
        .with_per_entity_cap(args.per_entity_cap);
    let service = SearchService::with_options(Arc::new(store), options)?;

    // Start the server
    let addr = esl_search_server::start_server(service, &args.host, args.port).await?;

    // Print port for process supervisors (intentional stdout)
    println!("SEARCH_PORT={}", addr.port());

    info!("Search server running on {}", addr);

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, exiting");

    Ok(())
}
