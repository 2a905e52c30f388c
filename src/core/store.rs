//! Storage contract for price observations

use crate::core::price::{PairId, PriceObservation};
use crate::error::StoreError;
use async_trait::async_trait;

/// Append-only store of observations.
///
/// Implementations must accept concurrent `append` calls. `latest` returns the
/// row with the greatest `observed_at` for the pair across every source; rows
/// sharing a timestamp resolve to the one appended last.
#[async_trait]
pub trait PriceStore: Send + Sync {
    async fn append(&self, observation: PriceObservation) -> Result<(), StoreError>;

    async fn latest(&self, pair_id: PairId) -> Result<Option<PriceObservation>, StoreError>;

    /// Makes appended rows durable. No-op for volatile stores.
    async fn flush(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
