pub mod api;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod ingest;
pub mod log;
pub mod providers;
pub mod query;
pub mod store;

use crate::core::{PairCatalog, PriceStore, StaticCatalog};
use anyhow::Result;
use ingest::IngestionPipeline;
use query::LatestPriceService;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub enum AppCommand {
    Serve,
    FetchOnce,
    Latest(String),
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    let config = match config_path {
        Some(path) => config::AppConfig::load_from_path(path)?,
        None => config::AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let store = store::open_store(&config)?;
    let catalog: Arc<dyn PairCatalog> = Arc::new(StaticCatalog::from_config(&config.catalog));

    let result = match command {
        AppCommand::Serve => serve(&config, catalog, Arc::clone(&store)).await,
        AppCommand::FetchOnce => {
            let client = providers::http::build_client(&config.ingest)?;
            let pipeline =
                IngestionPipeline::new(&config.ingest, client, catalog, Arc::clone(&store));
            cli::fetch::run(&pipeline).await
        }
        AppCommand::Latest(pair) => {
            let service = LatestPriceService::new(catalog, Arc::clone(&store));
            cli::latest::run(&service, &pair).await
        }
    };

    // Runs after the pipeline has stopped, so every accepted row is flushed.
    if let Err(e) = store.flush().await {
        warn!(error = %e, "Failed to flush price store");
    }
    result
}

/// Ingests in the background and serves the read API until Ctrl-C.
async fn serve(
    config: &config::AppConfig,
    catalog: Arc<dyn PairCatalog>,
    store: Arc<dyn PriceStore>,
) -> Result<()> {
    info!("spotfeed starting...");

    let client = providers::http::build_client(&config.ingest)?;
    let pipeline =
        IngestionPipeline::new(&config.ingest, client, Arc::clone(&catalog), Arc::clone(&store));
    let service = Arc::new(LatestPriceService::new(catalog, store));

    pipeline.start().await?;
    let served = api::serve(&config.server.bind, api::router(service), shutdown_signal()).await;

    pipeline.stop().await;
    info!("spotfeed stopped");
    served
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown requested"),
        Err(e) => {
            error!(error = %e, "Failed to listen for Ctrl-C, running until killed");
            std::future::pending::<()>().await;
        }
    }
}
