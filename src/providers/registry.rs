use super::SourceAdapter;
use super::binance::BinanceAdapter;
use super::bybit::BybitAdapter;
use crate::core::price::Source;
use reqwest::Client;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Built-in adapter for a source. Adding an exchange means adding a variant
/// to [`Source`] and an arm here.
pub fn adapter_for(source: Source, client: Client) -> Arc<dyn SourceAdapter> {
    match source {
        Source::Binance => Arc::new(BinanceAdapter::new(client)),
        Source::Bybit => Arc::new(BybitAdapter::new(client)),
    }
}

/// Adapters keyed by the source they serve.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: BTreeMap<Source, Arc<dyn SourceAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in adapter of every known source, all sharing `client`.
    pub fn with_defaults(client: Client) -> Self {
        let mut registry = Self::new();
        for source in Source::ALL {
            registry.register(adapter_for(source, client.clone()));
        }
        registry
    }

    /// Adds an adapter, replacing any previous one for the same source.
    pub fn register(&mut self, adapter: Arc<dyn SourceAdapter>) -> &mut Self {
        let source = adapter.source();
        if self.adapters.insert(source, adapter).is_some() {
            debug!(%source, "Replaced adapter");
        }
        self
    }

    pub fn get(&self, source: Source) -> Option<&Arc<dyn SourceAdapter>> {
        self.adapters.get(&source)
    }

    pub fn sources(&self) -> impl Iterator<Item = Source> + '_ {
        self.adapters.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}
