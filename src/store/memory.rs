use crate::core::price::{PairId, PriceObservation};
use crate::core::store::PriceStore;
use crate::error::StoreError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

struct StoredRow {
    row_id: u64,
    observation: PriceObservation,
}

/// Volatile store; contents are lost when the process exits.
#[derive(Default)]
pub struct MemoryPriceStore {
    rows: RwLock<HashMap<PairId, Vec<StoredRow>>>,
    next_row_id: AtomicU64,
}

impl MemoryPriceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every observation stored for a pair, in append order.
    pub async fn observations(&self, pair_id: PairId) -> Vec<PriceObservation> {
        let rows = self.rows.read().await;
        rows.get(&pair_id)
            .map(|rows| rows.iter().map(|row| row.observation.clone()).collect())
            .unwrap_or_default()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.values().map(Vec::len).sum()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl PriceStore for MemoryPriceStore {
    async fn append(&self, observation: PriceObservation) -> Result<(), StoreError> {
        let row_id = self.next_row_id.fetch_add(1, Ordering::Relaxed);
        debug!(pair_id = %observation.pair_id, source = %observation.source, row_id, "Store APPEND");
        let mut rows = self.rows.write().await;
        rows.entry(observation.pair_id)
            .or_default()
            .push(StoredRow {
                row_id,
                observation,
            });
        Ok(())
    }

    async fn latest(&self, pair_id: PairId) -> Result<Option<PriceObservation>, StoreError> {
        let rows = self.rows.read().await;
        let latest = rows.get(&pair_id).and_then(|rows| {
            rows.iter()
                .max_by_key(|row| (row.observation.observed_at, row.row_id))
                .map(|row| row.observation.clone())
        });
        Ok(latest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::price::Source;
    use chrono::{DateTime, Duration, Utc};
    use rust_decimal::Decimal;

    fn observation(pair: i32, price: i64, source: Source, at: DateTime<Utc>) -> PriceObservation {
        PriceObservation {
            pair_id: PairId(pair),
            price: Decimal::from(price),
            source,
            observed_at: at,
        }
    }

    #[tokio::test]
    async fn test_latest_is_none_when_empty() {
        let store = MemoryPriceStore::new();
        assert!(store.latest(PairId(1)).await.unwrap().is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_latest_picks_max_observed_at_across_sources() {
        let store = MemoryPriceStore::new();
        let t0 = Utc::now();

        // Arrival order differs from timestamp order.
        store
            .append(observation(1, 2, Source::Bybit, t0 + Duration::seconds(2)))
            .await
            .unwrap();
        store
            .append(observation(1, 1, Source::Binance, t0))
            .await
            .unwrap();
        store
            .append(observation(2, 9, Source::Binance, t0 + Duration::seconds(5)))
            .await
            .unwrap();

        let latest = store.latest(PairId(1)).await.unwrap().unwrap();
        assert_eq!(latest.price, Decimal::from(2));
        assert_eq!(latest.source, Source::Bybit);
        assert_eq!(store.len().await, 3);
        assert_eq!(store.observations(PairId(1)).await.len(), 2);
    }

    #[tokio::test]
    async fn test_timestamp_tie_resolves_to_last_appended() {
        let store = MemoryPriceStore::new();
        let t0 = Utc::now();

        store
            .append(observation(1, 1, Source::Binance, t0))
            .await
            .unwrap();
        store
            .append(observation(1, 2, Source::Bybit, t0))
            .await
            .unwrap();

        let latest = store.latest(PairId(1)).await.unwrap().unwrap();
        assert_eq!(latest.source, Source::Bybit);
    }
}
