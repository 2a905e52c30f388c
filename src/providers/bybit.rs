use super::SourceAdapter;
use super::http::{describe_shape, get_ticker};
use crate::core::price::{CurrencyPair, PriceObservation, Source, parse_price};
use crate::error::FetchFailure;
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::{debug, instrument};

/// Bybit `/spot/v3/public/quote/ticker/price`: the price is wrapped in a
/// `result` object, e.g.
/// `{"retCode": 0, "retMsg": "OK", "result": {"symbol": "BTCUSDT", "price": "50010.0"}}`.
pub struct BybitAdapter {
    client: Client,
}

impl BybitAdapter {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

/// Extracts the price from a nested ticker payload.
pub fn normalize(body: &Value) -> Result<Decimal, FetchFailure> {
    let result = match body.get("result") {
        Some(Value::Object(result)) => result,
        Some(other) => {
            return Err(FetchFailure::malformed(format!(
                "'result' is not an object: {}{}",
                describe_shape(other),
                ret_msg(body)
            )));
        }
        None => {
            return Err(FetchFailure::malformed(format!(
                "missing 'result': {}",
                describe_shape(body)
            )));
        }
    };

    let price = result.get("price").ok_or_else(|| {
        FetchFailure::malformed(format!(
            "missing 'result.price': {}{}",
            describe_shape(&Value::Object(result.clone())),
            ret_msg(body)
        ))
    })?;
    parse_price(price).map_err(FetchFailure::malformed)
}

// Bybit reports errors in-band with HTTP 200, so surface its message when present.
fn ret_msg(body: &Value) -> String {
    match (body.get("retCode"), body.get("retMsg")) {
        (Some(code), Some(Value::String(msg))) => format!(" (retCode {code}: {msg})"),
        _ => String::new(),
    }
}

#[async_trait]
impl SourceAdapter for BybitAdapter {
    fn source(&self) -> Source {
        Source::Bybit
    }

    #[instrument(
        name = "BybitPriceFetch",
        skip(self, pair),
        fields(pair = %pair.symbol)
    )]
    async fn fetch(
        &self,
        pair: &CurrencyPair,
        endpoint: &str,
    ) -> Result<PriceObservation, FetchFailure> {
        let body = get_ticker(&self.client, endpoint, pair.symbol_for(Source::Bybit)).await?;
        let price = normalize(&body)?;
        debug!(%price, "Received Bybit price");
        Ok(PriceObservation::now(pair.id, price, Source::Bybit))
    }
}
