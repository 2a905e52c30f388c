use crate::core::catalog::PairCatalog;
use crate::core::price::{CurrencyPair, Source};
use anyhow::Result;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Catalog state resolved once at the start of a tick.
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    pub pairs: Vec<CurrencyPair>,
    /// Listed symbols the catalog could not resolve to an id.
    pub unknown_pairs: Vec<String>,
    pub endpoints: BTreeMap<Source, String>,
    /// Registered sources without an endpoint; skipped this tick.
    pub missing_endpoints: Vec<Source>,
}

impl CatalogSnapshot {
    pub async fn resolve(
        catalog: &dyn PairCatalog,
        sources: impl IntoIterator<Item = Source>,
    ) -> Result<Self> {
        let mut snapshot = Self::default();

        for symbol in catalog.list_pairs().await? {
            match catalog.resolve_pair(&symbol).await {
                Ok(Some(pair)) => snapshot.pairs.push(pair),
                Ok(None) => {
                    warn!(pair = %symbol, kind = "unknown_pair", "Pair id not found, skipping");
                    snapshot.unknown_pairs.push(symbol);
                }
                Err(e) => {
                    warn!(pair = %symbol, error = %e, "Failed to resolve pair, skipping");
                    snapshot.unknown_pairs.push(symbol);
                }
            }
        }

        for source in sources {
            match catalog.resolve_source_endpoint(source).await {
                Ok(Some(endpoint)) => {
                    snapshot.endpoints.insert(source, endpoint);
                }
                Ok(None) => {
                    warn!(%source, kind = "missing_endpoint", "No endpoint configured, skipping source");
                    snapshot.missing_endpoints.push(source);
                }
                Err(e) => {
                    warn!(%source, error = %e, "Failed to resolve endpoint, skipping source");
                    snapshot.missing_endpoints.push(source);
                }
            }
        }

        debug!(
            pairs = snapshot.pairs.len(),
            sources = snapshot.endpoints.len(),
            "Resolved catalog snapshot"
        );
        Ok(snapshot)
    }
}
