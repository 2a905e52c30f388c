//! Price observation types shared by adapters, stores and the read path

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

/// Exchanges we know how to read a spot price from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Source {
    Binance,
    Bybit,
}

impl Source {
    pub const ALL: [Source; 2] = [Source::Binance, Source::Bybit];

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Binance => "Binance",
            Source::Bybit => "Bybit",
        }
    }
}

impl Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "binance" => Ok(Source::Binance),
            "bybit" => Ok(Source::Bybit),
            _ => Err(anyhow::anyhow!("Unknown price source: {}", s)),
        }
    }
}

/// Internal catalog id of a pair, used as the storage key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PairId(pub i32);

impl Display for PairId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A tracked pair as resolved from the catalog for one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencyPair {
    pub id: PairId,
    pub symbol: String,
    /// Per-source spelling of the symbol, when it differs from `symbol`.
    pub native_symbols: BTreeMap<Source, String>,
}

impl CurrencyPair {
    pub fn new(id: PairId, symbol: impl Into<String>) -> Self {
        Self {
            id,
            symbol: symbol.into(),
            native_symbols: BTreeMap::new(),
        }
    }

    pub fn symbol_for(&self, source: Source) -> &str {
        self.native_symbols
            .get(&source)
            .map(String::as_str)
            .unwrap_or(&self.symbol)
    }
}

/// One normalized price reading. Immutable once built; stores only append these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceObservation {
    pub pair_id: PairId,
    pub price: Decimal,
    pub source: Source,
    pub observed_at: DateTime<Utc>,
}

impl PriceObservation {
    /// Stamps the observation with the current wall-clock time.
    pub fn now(pair_id: PairId, price: Decimal, source: Source) -> Self {
        Self {
            pair_id,
            price,
            source,
            observed_at: Utc::now(),
        }
    }
}

/// Reads a price out of a JSON value that is either a decimal string or a number.
///
/// Numbers go through their textual form so `50000.5` stays exact instead of
/// passing through `f64`.
pub fn parse_price(value: &Value) -> Result<Decimal, String> {
    let price = match value {
        Value::String(s) => parse_decimal(s.trim())?,
        Value::Number(n) => parse_decimal(&n.to_string())?,
        other => return Err(format!("price is not a string or number: {other}")),
    };

    if price.is_sign_negative() && !price.is_zero() {
        return Err(format!("price is negative: {price}"));
    }
    Ok(price)
}

fn parse_decimal(s: &str) -> Result<Decimal, String> {
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .map_err(|_| format!("price is not numeric: {s:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_price_from_string_and_number() {
        assert_eq!(
            parse_price(&json!("50000.5")).unwrap(),
            Decimal::from_str("50000.5").unwrap()
        );
        assert_eq!(
            parse_price(&json!(0.1)).unwrap(),
            Decimal::from_str("0.1").unwrap()
        );
        assert_eq!(parse_price(&json!(" 12 ")).unwrap(), Decimal::from(12));
        assert_eq!(parse_price(&json!("0")).unwrap(), Decimal::ZERO);
        assert_eq!(parse_price(&json!("1e3")).unwrap(), Decimal::from(1000));
    }

    #[test]
    fn test_parse_price_rejects_bad_values() {
        assert!(parse_price(&json!("abc")).is_err());
        assert!(parse_price(&json!("")).is_err());
        assert!(parse_price(&json!("-1.5")).is_err());
        assert!(parse_price(&json!(-3)).is_err());
        assert!(parse_price(&json!(null)).is_err());
        assert!(parse_price(&json!({"price": "1"})).is_err());
        assert!(parse_price(&json!(true)).is_err());
    }

    #[test]
    fn test_source_round_trip_through_str() {
        for source in Source::ALL {
            assert_eq!(source.to_string().parse::<Source>().unwrap(), source);
        }
        assert_eq!("BYBIT".parse::<Source>().unwrap(), Source::Bybit);
        assert!("kraken".parse::<Source>().is_err());
    }

    #[test]
    fn test_symbol_for_prefers_native_symbol() {
        let mut pair = CurrencyPair::new(PairId(1), "BTCUSDT");
        assert_eq!(pair.symbol_for(Source::Bybit), "BTCUSDT");

        pair.native_symbols
            .insert(Source::Bybit, "BTCUSDT-SPOT".to_string());
        assert_eq!(pair.symbol_for(Source::Bybit), "BTCUSDT-SPOT");
        assert_eq!(pair.symbol_for(Source::Binance), "BTCUSDT");
    }

    #[test]
    fn test_observation_serializes_expected_fields() {
        let obs = PriceObservation {
            pair_id: PairId(7),
            price: Decimal::from_str("1.25").unwrap(),
            source: Source::Bybit,
            observed_at: DateTime::parse_from_rfc3339("2024-10-14T12:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
        };
        let value = serde_json::to_value(&obs).unwrap();
        assert_eq!(value["pair_id"], json!(7));
        assert_eq!(value["price"], json!("1.25"));
        assert_eq!(value["source"], json!("Bybit"));
        assert_eq!(value["observed_at"], json!("2024-10-14T12:00:00Z"));
    }
}
