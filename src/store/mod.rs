pub mod disk;
pub mod memory;

use crate::config::{AppConfig, StorageBackend};
use crate::core::store::PriceStore;
use anyhow::Result;
use disk::DiskPriceStore;
use memory::MemoryPriceStore;
use std::sync::Arc;
use tracing::info;

/// Opens the price store selected by `storage.backend`.
pub fn open_store(config: &AppConfig) -> Result<Arc<dyn PriceStore>> {
    match config.storage.backend {
        StorageBackend::Memory => {
            info!("Using in-memory price store");
            Ok(Arc::new(MemoryPriceStore::new()))
        }
        StorageBackend::Disk => {
            let path = config.data_path()?;
            Ok(Arc::new(DiskPriceStore::open(&path)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::price::PairId;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_open_store_for_each_backend() {
        let mut config = AppConfig::default();
        config.storage.backend = StorageBackend::Memory;
        let store = open_store(&config).unwrap();
        assert!(store.latest(PairId(1)).await.unwrap().is_none());

        let dir = tempdir().unwrap();
        config.storage.backend = StorageBackend::Disk;
        config.storage.data_path = Some(dir.path().to_string_lossy().into_owned());
        let store = open_store(&config).unwrap();
        assert!(store.latest(PairId(1)).await.unwrap().is_none());
        assert!(dir.path().join("prices_db").exists());
    }
}
