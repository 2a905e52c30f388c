use super::snapshot::CatalogSnapshot;
use crate::core::price::{CurrencyPair, Source};
use crate::core::store::PriceStore;
use crate::error::{FetchFailure, IngestError};
use crate::providers::{AdapterRegistry, SourceAdapter};
use futures::FutureExt;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SourceTally {
    pub succeeded: usize,
    pub fetch_failures: usize,
    pub store_failures: usize,
}

impl SourceTally {
    pub fn failed(&self) -> usize {
        self.fetch_failures + self.store_failures
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobFailure {
    pub pair: String,
    pub source: Source,
    pub kind: &'static str,
}

/// Summary of one tick, for logs and the CLI. Never persisted.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TickReport {
    pub pairs: usize,
    pub sources: BTreeMap<Source, SourceTally>,
    pub failures: Vec<JobFailure>,
    pub unknown_pairs: Vec<String>,
    pub missing_endpoints: Vec<Source>,
    pub elapsed: Duration,
}

impl TickReport {
    fn for_snapshot(snapshot: &CatalogSnapshot) -> Self {
        Self {
            pairs: snapshot.pairs.len(),
            sources: snapshot
                .endpoints
                .keys()
                .map(|source| (*source, SourceTally::default()))
                .collect(),
            unknown_pairs: snapshot.unknown_pairs.clone(),
            missing_endpoints: snapshot.missing_endpoints.clone(),
            ..Self::default()
        }
    }

    pub fn tally(&self, source: Source) -> SourceTally {
        self.sources.get(&source).copied().unwrap_or_default()
    }

    pub fn succeeded(&self) -> usize {
        self.sources.values().map(|t| t.succeeded).sum()
    }

    pub fn failed(&self) -> usize {
        self.sources.values().map(SourceTally::failed).sum()
    }

    fn record(&mut self, pair: &CurrencyPair, source: Source, outcome: &Result<(), IngestError>) {
        let tally = self.sources.entry(source).or_default();
        match outcome {
            Ok(()) => tally.succeeded += 1,
            Err(e) => {
                match e {
                    IngestError::StoreWrite(_) => tally.store_failures += 1,
                    _ => tally.fetch_failures += 1,
                }
                self.failures.push(JobFailure {
                    pair: pair.symbol.clone(),
                    source,
                    kind: e.kind(),
                });
            }
        }
    }
}

/// Fans out one fetch per (pair, source) and writes every success to the store.
pub struct FetchOrchestrator {
    adapters: AdapterRegistry,
    store: Arc<dyn PriceStore>,
    max_concurrency: usize,
}

impl FetchOrchestrator {
    pub fn new(adapters: AdapterRegistry, store: Arc<dyn PriceStore>, max_concurrency: usize) -> Self {
        Self {
            adapters,
            store,
            max_concurrency: max_concurrency.max(1),
        }
    }

    pub fn sources(&self) -> Vec<Source> {
        self.adapters.sources().collect()
    }

    /// Runs every job of the snapshot to completion. Individual failures are
    /// logged and counted; they never abort the other jobs.
    pub async fn run_tick(&self, snapshot: &CatalogSnapshot) -> TickReport {
        let started = Instant::now();
        let mut report = TickReport::for_snapshot(snapshot);

        // Futures are built up front and boxed so the tick stays `Send` for the scheduler.
        let mut jobs = Vec::new();
        for pair in &snapshot.pairs {
            for (source, endpoint) in &snapshot.endpoints {
                let Some(adapter) = self.adapters.get(*source) else {
                    continue;
                };
                let (pair, source) = (pair.clone(), *source);
                let (endpoint, adapter) = (endpoint.clone(), Arc::clone(adapter));
                jobs.push(
                    async move {
                        let outcome = self.fetch_and_store(&pair, adapter.as_ref(), &endpoint).await;
                        (pair, source, outcome)
                    }
                    .boxed(),
                );
            }
        }

        let outcomes: Vec<_> = stream::iter(jobs)
            .buffer_unordered(self.max_concurrency)
            .collect()
            .await;

        for (pair, source, outcome) in outcomes {
            report.record(&pair, source, &outcome);
        }
        report.elapsed = started.elapsed();
        report
    }

    async fn fetch_and_store(
        &self,
        pair: &CurrencyPair,
        adapter: &dyn SourceAdapter,
        endpoint: &str,
    ) -> Result<(), IngestError> {
        let source = adapter.source();
        let observation = adapter
            .fetch(pair, endpoint)
            .await
            .inspect_err(|failure| log_fetch_failure(pair, source, failure))?;

        let price = observation.price;
        self.store
            .append(observation)
            .await
            .inspect_err(|e| {
                warn!(pair = %pair.symbol, %source, kind = "store_write_failure", error = %e, "Dropping observation")
            })?;

        info!(pair = %pair.symbol, %source, %price, "Saved price");
        Ok(())
    }
}

fn log_fetch_failure(pair: &CurrencyPair, source: Source, failure: &FetchFailure) {
    match failure {
        FetchFailure::UnexpectedStatus { code, body } => warn!(
            pair = %pair.symbol,
            %source,
            kind = failure.kind(),
            status = code,
            body = body.as_deref().unwrap_or(""),
            "Failed to fetch price"
        ),
        _ => warn!(
            pair = %pair.symbol,
            %source,
            kind = failure.kind(),
            error = %failure,
            "Failed to fetch price"
        ),
    }
}
