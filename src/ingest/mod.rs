//! Ingestion pipeline: scheduler → orchestrator → price store

pub mod orchestrator;
pub mod scheduler;
pub mod snapshot;

use crate::config::IngestConfig;
use crate::core::catalog::PairCatalog;
use crate::core::store::PriceStore;
use crate::providers::AdapterRegistry;
use anyhow::Result;
use orchestrator::FetchOrchestrator;
use reqwest::Client;
use scheduler::{Scheduler, SchedulerState};
use snapshot::CatalogSnapshot;
use std::sync::Arc;
use tracing::info;

pub use orchestrator::{SourceTally, TickReport};

/// Owns everything a tick needs. The HTTP client and store are handed in by
/// the caller, who must `stop` the pipeline before releasing them.
pub struct IngestionPipeline {
    catalog: Arc<dyn PairCatalog>,
    orchestrator: Arc<FetchOrchestrator>,
    scheduler: Scheduler,
}

impl IngestionPipeline {
    /// Pipeline with the built-in adapter of every source, all sharing `client`.
    pub fn new(
        config: &IngestConfig,
        client: Client,
        catalog: Arc<dyn PairCatalog>,
        store: Arc<dyn PriceStore>,
    ) -> Self {
        Self::with_adapters(config, AdapterRegistry::with_defaults(client), catalog, store)
    }

    pub fn with_adapters(
        config: &IngestConfig,
        adapters: AdapterRegistry,
        catalog: Arc<dyn PairCatalog>,
        store: Arc<dyn PriceStore>,
    ) -> Self {
        let orchestrator = FetchOrchestrator::new(adapters, store, config.max_concurrent_fetches);
        Self {
            catalog,
            orchestrator: Arc::new(orchestrator),
            scheduler: Scheduler::new(config.poll_interval()),
        }
    }

    /// Runs one tick outside the scheduler.
    pub async fn run_once(&self) -> Result<TickReport> {
        run_tick(self.catalog.as_ref(), &self.orchestrator).await
    }

    pub async fn start(&self) -> Result<()> {
        let catalog = Arc::clone(&self.catalog);
        let orchestrator = Arc::clone(&self.orchestrator);
        self.scheduler
            .start(move || {
                let catalog = Arc::clone(&catalog);
                let orchestrator = Arc::clone(&orchestrator);
                async move {
                    run_tick(catalog.as_ref(), &orchestrator).await?;
                    Ok(())
                }
            })
            .await
    }

    /// Stops scheduling and waits for the in-flight tick to persist its results.
    pub async fn stop(&self) {
        self.scheduler.stop().await;
    }

    pub async fn state(&self) -> SchedulerState {
        self.scheduler.state().await
    }
}

async fn run_tick(catalog: &dyn PairCatalog, orchestrator: &FetchOrchestrator) -> Result<TickReport> {
    let snapshot = CatalogSnapshot::resolve(catalog, orchestrator.sources()).await?;
    let report = orchestrator.run_tick(&snapshot).await;
    info!(
        pairs = report.pairs,
        succeeded = report.succeeded(),
        failed = report.failed(),
        unknown_pairs = report.unknown_pairs.len(),
        elapsed_ms = report.elapsed.as_millis() as u64,
        "Tick finished"
    );
    Ok(report)
}
