//! Pair catalog: which pairs are tracked and where each source lives

use crate::config::CatalogConfig;
use crate::core::price::{CurrencyPair, PairId, Source};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

#[async_trait]
pub trait PairCatalog: Send + Sync {
    /// Symbols of every tracked pair.
    async fn list_pairs(&self) -> Result<Vec<String>>;

    async fn resolve_pair_id(&self, symbol: &str) -> Result<Option<PairId>>;

    /// Per-source spelling of a symbol; defaults to the symbol itself.
    async fn native_symbols(&self, _symbol: &str) -> Result<BTreeMap<Source, String>> {
        Ok(BTreeMap::new())
    }

    async fn resolve_source_endpoint(&self, source: Source) -> Result<Option<String>>;

    /// Resolves a symbol into a full pair, or `None` when the catalog does not know it.
    async fn resolve_pair(&self, symbol: &str) -> Result<Option<CurrencyPair>> {
        let Some(id) = self.resolve_pair_id(symbol).await? else {
            return Ok(None);
        };
        Ok(Some(CurrencyPair {
            id,
            symbol: symbol.to_string(),
            native_symbols: self.native_symbols(symbol).await?,
        }))
    }
}

/// Catalog held in memory, built from the `catalog` section of the config.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    pairs: Vec<CurrencyPair>,
    by_symbol: HashMap<String, usize>,
    endpoints: BTreeMap<Source, String>,
}

impl StaticCatalog {
    pub fn new(pairs: Vec<CurrencyPair>, endpoints: BTreeMap<Source, String>) -> Self {
        let by_symbol = pairs
            .iter()
            .enumerate()
            .map(|(index, pair)| (pair.symbol.clone(), index))
            .collect();
        Self {
            pairs,
            by_symbol,
            endpoints,
        }
    }

    pub fn from_config(config: &CatalogConfig) -> Self {
        let pairs = config
            .pairs
            .iter()
            .map(|entry| CurrencyPair {
                id: PairId(entry.id),
                symbol: entry.symbol.clone(),
                native_symbols: entry.native_symbols.clone(),
            })
            .collect();
        let endpoints = config
            .sources
            .iter()
            .map(|(source, entry)| (*source, entry.endpoint.clone()))
            .collect();
        Self::new(pairs, endpoints)
    }

    fn find(&self, symbol: &str) -> Option<&CurrencyPair> {
        self.by_symbol.get(symbol).map(|index| &self.pairs[*index])
    }
}

#[async_trait]
impl PairCatalog for StaticCatalog {
    async fn list_pairs(&self) -> Result<Vec<String>> {
        Ok(self.pairs.iter().map(|pair| pair.symbol.clone()).collect())
    }

    async fn resolve_pair_id(&self, symbol: &str) -> Result<Option<PairId>> {
        let id = self.find(symbol).map(|pair| pair.id);
        match id {
            Some(id) => debug!(pair = %symbol, %id, "Resolved pair"),
            None => debug!(pair = %symbol, "Pair not in catalog"),
        }
        Ok(id)
    }

    async fn native_symbols(&self, symbol: &str) -> Result<BTreeMap<Source, String>> {
        Ok(self
            .find(symbol)
            .map(|pair| pair.native_symbols.clone())
            .unwrap_or_default())
    }

    async fn resolve_source_endpoint(&self, source: Source) -> Result<Option<String>> {
        Ok(self.endpoints.get(&source).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> StaticCatalog {
        let mut eth = CurrencyPair::new(PairId(2), "ETHUSDT");
        eth.native_symbols.insert(Source::Bybit, "ETH-USDT".to_string());
        StaticCatalog::new(
            vec![CurrencyPair::new(PairId(1), "BTCUSDT"), eth],
            BTreeMap::from([(Source::Binance, "http://binance.test/price".to_string())]),
        )
    }

    #[tokio::test]
    async fn test_list_and_resolve() {
        let catalog = catalog();
        assert_eq!(catalog.list_pairs().await.unwrap(), vec!["BTCUSDT", "ETHUSDT"]);
        assert_eq!(
            catalog.resolve_pair_id("ETHUSDT").await.unwrap(),
            Some(PairId(2))
        );
        assert_eq!(catalog.resolve_pair_id("XYZABC").await.unwrap(), None);
        // Symbols are matched exactly.
        assert_eq!(catalog.resolve_pair_id("btcusdt").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_resolve_pair_carries_native_symbols() {
        let catalog = catalog();
        let pair = catalog.resolve_pair("ETHUSDT").await.unwrap().unwrap();
        assert_eq!(pair.symbol_for(Source::Bybit), "ETH-USDT");
        assert!(catalog.resolve_pair("XYZABC").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_resolve_source_endpoint() {
        let catalog = catalog();
        assert_eq!(
            catalog
                .resolve_source_endpoint(Source::Binance)
                .await
                .unwrap()
                .as_deref(),
            Some("http://binance.test/price")
        );
        assert!(
            catalog
                .resolve_source_endpoint(Source::Bybit)
                .await
                .unwrap()
                .is_none()
        );
    }
}
