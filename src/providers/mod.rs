pub mod binance;
pub mod bybit;
pub mod http;
pub mod registry;

use crate::core::price::{CurrencyPair, PriceObservation, Source};
use crate::error::FetchFailure;
use async_trait::async_trait;

pub use registry::AdapterRegistry;

/// Normalizes one exchange's ticker endpoint into a [`PriceObservation`].
///
/// Adapters hold no per-request state and are shared across every pair of a tick.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn source(&self) -> Source;

    async fn fetch(
        &self,
        pair: &CurrencyPair,
        endpoint: &str,
    ) -> Result<PriceObservation, FetchFailure>;
}
