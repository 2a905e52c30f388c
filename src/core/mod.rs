//! Core abstractions: price types, the pair catalog and the price store

pub mod catalog;
pub mod price;
pub mod store;

// Re-export main types for cleaner imports
pub use catalog::{PairCatalog, StaticCatalog};
pub use price::{CurrencyPair, PairId, PriceObservation, Source};
pub use store::PriceStore;
