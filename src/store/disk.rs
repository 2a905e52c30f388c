use crate::core::price::{PairId, PriceObservation};
use crate::core::store::PriceStore;
use crate::error::StoreError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

const PRICES_PARTITION: &str = "prices";
const META_PARTITION: &str = "meta";
const NEXT_ROW_ID_KEY: &str = "next_row_id";
const KEY_LEN: usize = 4 + 8 + 8;

/// Observations persisted in an fjall keyspace.
///
/// Keys are `pair_id | observed_at | row_id`, all big-endian with the signed
/// parts flipped so byte order equals numeric order. The last key under a pair
/// prefix is therefore the latest observation, and equal timestamps fall back
/// to the higher row id.
///
/// The next row id lives in a `meta` partition and is written in the same
/// batch as each row, so opening never scans the prices.
pub struct DiskPriceStore {
    keyspace: Keyspace,
    prices: PartitionHandle,
    meta: PartitionHandle,
    // Held across id assignment and commit so the stored counter never goes backwards.
    next_row_id: Mutex<u64>,
}

impl DiskPriceStore {
    pub fn open(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create data directory: {}", path.display()))?;

        let keyspace = Config::new(path.join("prices_db"))
            .open()
            .with_context(|| format!("Failed to open price store at {}", path.display()))?;
        let prices = keyspace
            .open_partition(PRICES_PARTITION, PartitionCreateOptions::default())
            .context("Failed to open prices partition")?;
        let meta = keyspace
            .open_partition(META_PARTITION, PartitionCreateOptions::default())
            .context("Failed to open meta partition")?;

        let next_row_id = read_next_row_id(&meta)?;
        info!(path = %path.display(), next_row_id, "Opened price store");

        Ok(Self {
            keyspace,
            prices,
            meta,
            next_row_id: Mutex::new(next_row_id),
        })
    }

    fn next_row_id(&self) -> Result<MutexGuard<'_, u64>, StoreError> {
        self.next_row_id.lock().map_err(|_| StoreError::Poisoned)
    }
}

fn read_next_row_id(meta: &PartitionHandle) -> Result<u64> {
    match meta.get(NEXT_ROW_ID_KEY)? {
        Some(bytes) => {
            let bytes: [u8; 8] = bytes
                .as_ref()
                .try_into()
                .map_err(|_| StoreError::CorruptKey(bytes.len()))?;
            Ok(u64::from_be_bytes(bytes))
        }
        None => Ok(0),
    }
}

fn encode_key(pair_id: PairId, observed_at: DateTime<Utc>, row_id: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(KEY_LEN);
    key.extend_from_slice(&pair_prefix(pair_id));
    key.extend_from_slice(&((observed_at.timestamp_micros() as u64) ^ (1 << 63)).to_be_bytes());
    key.extend_from_slice(&row_id.to_be_bytes());
    key
}

fn decode_key(key: &[u8]) -> Result<(PairId, i64, u64), StoreError> {
    if key.len() != KEY_LEN {
        return Err(StoreError::CorruptKey(key.len()));
    }
    let read_u32 = |bytes: &[u8]| u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let read_u64 = |bytes: &[u8]| {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        u64::from_be_bytes(buf)
    };
    let pair_id = PairId((read_u32(&key[0..4]) ^ (1 << 31)) as i32);
    let micros = (read_u64(&key[4..12]) ^ (1 << 63)) as i64;
    let row_id = read_u64(&key[12..20]);
    Ok((pair_id, micros, row_id))
}

fn pair_prefix(pair_id: PairId) -> [u8; 4] {
    ((pair_id.0 as u32) ^ (1 << 31)).to_be_bytes()
}

#[async_trait]
impl PriceStore for DiskPriceStore {
    async fn append(&self, observation: PriceObservation) -> Result<(), StoreError> {
        let value = serde_json::to_vec(&observation)?;
        let mut next_row_id = self.next_row_id()?;
        let row_id = *next_row_id;
        let key = encode_key(observation.pair_id, observation.observed_at, row_id);

        let mut batch = self.keyspace.batch();
        batch.insert(&self.prices, key, value);
        batch.insert(&self.meta, NEXT_ROW_ID_KEY, (row_id + 1).to_be_bytes().to_vec());
        batch.commit()?;
        *next_row_id = row_id + 1;
        drop(next_row_id);

        debug!(pair_id = %observation.pair_id, source = %observation.source, row_id, "Store APPEND");
        Ok(())
    }

    async fn latest(&self, pair_id: PairId) -> Result<Option<PriceObservation>, StoreError> {
        match self.prices.prefix(pair_prefix(pair_id)).next_back() {
            Some(item) => {
                let (key, value) = item?;
                decode_key(&key)?;
                Ok(Some(serde_json::from_slice(&value)?))
            }
            None => Ok(None),
        }
    }

    async fn flush(&self) -> Result<(), StoreError> {
        self.keyspace.persist(PersistMode::SyncAll)?;
        debug!("Store FLUSH");
        Ok(())
    }
}
