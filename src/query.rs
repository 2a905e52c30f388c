use crate::core::catalog::PairCatalog;
use crate::core::price::PriceObservation;
use crate::core::store::PriceStore;
use crate::error::StoreError;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Read side of the pipeline. Answers only from what ingestion already stored;
/// it never contacts a source.
pub struct LatestPriceService {
    catalog: Arc<dyn PairCatalog>,
    store: Arc<dyn PriceStore>,
}

impl LatestPriceService {
    pub fn new(catalog: Arc<dyn PairCatalog>, store: Arc<dyn PriceStore>) -> Self {
        Self { catalog, store }
    }

    /// Latest stored observation for `symbol` across all sources.
    ///
    /// `Ok(None)` covers both a symbol the catalog does not know and a known
    /// pair with nothing stored yet. Only store failures are errors.
    #[instrument(name = "LatestPrice", skip(self))]
    pub async fn get_latest_price(
        &self,
        symbol: &str,
    ) -> Result<Option<PriceObservation>, StoreError> {
        let pair_id = match self.catalog.resolve_pair_id(symbol).await {
            Ok(Some(id)) => id,
            Ok(None) => {
                debug!("Unknown pair");
                return Ok(None);
            }
            Err(e) => {
                warn!(error = %e, "Catalog lookup failed, treating pair as unknown");
                return Ok(None);
            }
        };

        let latest = self.store.latest(pair_id).await?;
        if latest.is_none() {
            debug!(%pair_id, "No observations stored yet");
        }
        Ok(latest)
    }
}
