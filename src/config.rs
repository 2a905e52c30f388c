use crate::core::price::Source;
use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 15;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8000".to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct IngestConfig {
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,
    /// Skip TLS certificate verification. Only for exchanges behind broken proxies.
    #[serde(default)]
    pub accept_invalid_certs: bool,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl IngestConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
            accept_invalid_certs: false,
            user_agent: default_user_agent(),
        }
    }
}

fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_max_concurrent_fetches() -> usize {
    16
}

fn default_user_agent() -> String {
    format!("spotfeed/{}", env!("CARGO_PKG_VERSION"))
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PairEntry {
    pub id: i32,
    pub symbol: String,
    #[serde(default)]
    pub native_symbols: BTreeMap<Source, String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SourceEntry {
    pub endpoint: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct CatalogConfig {
    #[serde(default)]
    pub pairs: Vec<PairEntry>,
    #[serde(default)]
    pub sources: BTreeMap<Source, SourceEntry>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    #[default]
    Disk,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    pub data_path: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("io", "spotfeed", "spotfeed")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.storage.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("io", "spotfeed", "spotfeed")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config = Self::from_yaml(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.ingest.poll_interval_secs == 0 {
            bail!("ingest.poll_interval_secs must be greater than zero");
        }
        if self.ingest.request_timeout_secs == 0 {
            bail!("ingest.request_timeout_secs must be greater than zero");
        }
        if self.ingest.max_concurrent_fetches == 0 {
            bail!("ingest.max_concurrent_fetches must be greater than zero");
        }

        let mut ids = HashSet::new();
        let mut symbols = HashSet::new();
        for pair in &self.catalog.pairs {
            if !ids.insert(pair.id) {
                bail!("Duplicate pair id {} in catalog", pair.id);
            }
            if pair.symbol.trim().is_empty() {
                bail!("Pair {} has an empty symbol", pair.id);
            }
            if !symbols.insert(pair.symbol.as_str()) {
                bail!("Duplicate pair symbol {} in catalog", pair.symbol);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
server:
  bind: "127.0.0.1:9000"
ingest:
  poll_interval_secs: 5
  accept_invalid_certs: true
catalog:
  pairs:
    - id: 1
      symbol: BTCUSDT
    - id: 2
      symbol: ETHUSDT
      native_symbols:
        Bybit: ETHUSDT-SPOT
  sources:
    Binance:
      endpoint: "https://api.binance.com/api/v3/ticker/price"
    Bybit:
      endpoint: "https://api.bybit.com/spot/v3/public/quote/ticker/price"
storage:
  backend: memory
"#;

        let config = AppConfig::from_yaml(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.server.bind, "127.0.0.1:9000");
        assert_eq!(config.ingest.poll_interval(), Duration::from_secs(5));
        assert_eq!(config.ingest.request_timeout_secs, 10);
        assert_eq!(config.ingest.max_concurrent_fetches, 16);
        assert!(config.ingest.accept_invalid_certs);
        assert_eq!(config.catalog.pairs.len(), 2);
        assert_eq!(config.catalog.pairs[1].symbol, "ETHUSDT");
        assert_eq!(
            config.catalog.pairs[1].native_symbols.get(&Source::Bybit),
            Some(&"ETHUSDT-SPOT".to_string())
        );
        assert_eq!(
            config.catalog.sources[&Source::Binance].endpoint,
            "https://api.binance.com/api/v3/ticker/price"
        );
        assert_eq!(config.storage.backend, StorageBackend::Memory);
    }

    #[test]
    fn test_defaults_apply() {
        let config = AppConfig::from_yaml("catalog: {}").unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:8000");
        assert_eq!(config.ingest.poll_interval_secs, DEFAULT_POLL_INTERVAL_SECS);
        assert!(!config.ingest.accept_invalid_certs);
        assert_eq!(config.storage.backend, StorageBackend::Disk);
        assert!(config.catalog.pairs.is_empty());
    }

    #[test]
    fn test_validation_rejects_duplicates() {
        let duplicate_id = r#"
catalog:
  pairs:
    - { id: 1, symbol: BTCUSDT }
    - { id: 1, symbol: ETHUSDT }
"#;
        let err = AppConfig::from_yaml(duplicate_id).unwrap_err();
        assert!(err.to_string().contains("Duplicate pair id 1"));

        let duplicate_symbol = r#"
catalog:
  pairs:
    - { id: 1, symbol: BTCUSDT }
    - { id: 2, symbol: BTCUSDT }
"#;
        let err = AppConfig::from_yaml(duplicate_symbol).unwrap_err();
        assert!(err.to_string().contains("Duplicate pair symbol BTCUSDT"));
    }

    #[test]
    fn test_validation_rejects_zero_interval() {
        let yaml = r#"
ingest:
  poll_interval_secs: 0
catalog: {}
"#;
        assert!(AppConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_validation_rejects_zero_request_timeout() {
        let yaml = r#"
ingest:
  request_timeout_secs: 0
catalog: {}
"#;
        let err = AppConfig::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("request_timeout_secs"));
    }

    #[test]
    fn test_unknown_source_is_rejected() {
        let yaml = r#"
catalog:
  sources:
    Kraken:
      endpoint: "https://api.kraken.com"
"#;
        assert!(AppConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_data_path_override() {
        let yaml = r#"
catalog: {}
storage:
  data_path: /tmp/spotfeed-test
"#;
        let config = AppConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.data_path().unwrap(), PathBuf::from("/tmp/spotfeed-test"));
    }
}
