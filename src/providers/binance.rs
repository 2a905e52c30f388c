use super::SourceAdapter;
use super::http::{describe_shape, get_ticker};
use crate::core::price::{CurrencyPair, PriceObservation, Source, parse_price};
use crate::error::FetchFailure;
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::{debug, instrument};

/// Binance `/api/v3/ticker/price`: the price sits at the top level,
/// e.g. `{"symbol": "BTCUSDT", "price": "50000.50"}`.
pub struct BinanceAdapter {
    client: Client,
}

impl BinanceAdapter {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

/// Extracts the price from a flat ticker payload.
pub fn normalize(body: &Value) -> Result<Decimal, FetchFailure> {
    let price = body.get("price").ok_or_else(|| {
        FetchFailure::malformed(format!("missing 'price': {}", describe_shape(body)))
    })?;
    parse_price(price).map_err(FetchFailure::malformed)
}

#[async_trait]
impl SourceAdapter for BinanceAdapter {
    fn source(&self) -> Source {
        Source::Binance
    }

    #[instrument(
        name = "BinancePriceFetch",
        skip(self, pair),
        fields(pair = %pair.symbol)
    )]
    async fn fetch(
        &self,
        pair: &CurrencyPair,
        endpoint: &str,
    ) -> Result<PriceObservation, FetchFailure> {
        let body = get_ticker(&self.client, endpoint, pair.symbol_for(Source::Binance)).await?;
        let price = normalize(&body)?;
        debug!(%price, "Received Binance price");
        Ok(PriceObservation::now(pair.id, price, Source::Binance))
    }
}
