//! nutri-ingest - nutrition dataset loader and query service
//!
//! Opens (or creates) the store under the resolved root folder, loads the
//! dataset in two phases when needed, then serves the HTTP query surface.

use anyhow::{Context, Result};
use clap::Parser;
use nutri_common::config::{resolve_dataset_path, resolve_root_folder, RootFolder, TomlConfig, ROOT_FOLDER_ENV};
use nutri_common::ReadinessPublisher;
use nutri_ingest::provider::StoreProvider;
use nutri_ingest::source::FileSource;
use nutri_ingest::{build_router, AppState};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "nutri-ingest")]
#[command(about = "Nutrition dataset ingestion and query service")]
#[command(version)]
struct Args {
    /// Root folder holding the database (overrides NUTRI_ROOT_FOLDER and config.toml)
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Source dataset (overrides NUTRI_DATASET and config.toml)
    #[arg(short, long)]
    dataset: Option<PathBuf>,

    /// Address to listen on
    #[arg(short, long, env = "NUTRI_BIND_ADDR")]
    bind: Option<String>,

    /// Discard stored records and reload the dataset
    #[arg(long)]
    reinitialize: bool,

    /// Run ingestion (if needed) and exit without serving
    #[arg(long)]
    ingest_only: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = TomlConfig::load_or_default();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.log_level())),
        )
        .init();

    info!(
        "Starting nutri-ingest v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    // Root folder: CLI > env > config.toml > OS default
    let root = RootFolder::new(resolve_root_folder(
        args.root_folder.as_deref(),
        ROOT_FOLDER_ENV,
        &config,
    ));
    root.ensure_exists()
        .with_context(|| format!("Failed to create root folder {}", root.path().display()))?;

    let db_path = root.database_path();
    let dataset = resolve_dataset_path(args.dataset.as_deref(), &config, root.path());
    info!("Database: {}", db_path.display());
    info!("Dataset: {}", dataset.display());

    let provider = Arc::new(StoreProvider::new(
        db_path,
        Arc::new(FileSource::new(dataset)),
        ReadinessPublisher::new(),
    ));

    if args.reinitialize {
        provider.reinitialize().await?;
    }

    provider.store().await.context("Failed to open store")?;

    if args.ingest_only {
        provider.join_ingestion().await;
        match provider.last_report().await {
            Some(report) => info!(
                run_id = %report.run_id,
                readiness = ?report.readiness,
                rows = report.full.rows_parsed,
                rows_failed = report.full.rows_failed,
                "Ingestion complete"
            ),
            None if provider.marker().is_set() => {
                warn!("Ingestion did not complete; it will be retried on next start")
            }
            None => info!(readiness = ?provider.readiness().current(), "No ingestion needed"),
        }
        return Ok(());
    }

    let app = build_router(AppState::new(provider));

    let bind_addr = args.bind.unwrap_or_else(|| config.bind_addr().to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Listening on http://{}", bind_addr);
    info!("Health check: http://{}/health", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
