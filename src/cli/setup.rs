use crate::config::AppConfig;
use anyhow::{Context, Result};
use std::path::Path;

/// Creates a default configuration file at the platform config location.
pub fn setup() -> Result<()> {
    let path = AppConfig::default_config_path()?;
    setup_at_path(path)
}

/// Creates a default configuration file with the stock catalog at `path`.
pub fn setup_at_path<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();

    if path.exists() {
        anyhow::bail!("Configuration file already exists at {}", path.display());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let default_config = include_str!("../../docs/example_config.yaml");

    std::fs::write(path, default_config)
        .with_context(|| format!("Failed to write config file to {}", path.display()))?;

    tracing::info!("Created default configuration at {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageBackend;
    use crate::core::price::Source;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_setup_creates_config_file() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("nested").join("config.yaml");

        setup_at_path(&config_path)?;

        assert!(config_path.exists());
        let content = fs::read_to_string(&config_path)?;
        assert!(content.contains("# Example configuration file for spotfeed"));
        assert!(content.contains("catalog:"));

        Ok(())
    }

    #[test]
    fn test_setup_fails_if_config_exists() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("config.yaml");
        std::fs::write(&config_path, "test")?;

        let result = setup_at_path(&config_path);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("already exists"));
        // Existing file is untouched.
        assert_eq!(fs::read_to_string(&config_path)?, "test");

        Ok(())
    }

    #[test]
    fn test_example_config_is_valid() -> Result<()> {
        let example_config = include_str!("../../docs/example_config.yaml");
        let config = AppConfig::from_yaml(example_config)
            .context("Failed to parse example config")?;

        let symbols: Vec<&str> = config
            .catalog
            .pairs
            .iter()
            .map(|p| p.symbol.as_str())
            .collect();
        assert_eq!(symbols, vec!["BTCUSDT", "ETHUSDT", "BNBUSDT", "DOGEUSDT"]);
        assert_eq!(
            config.catalog.sources[&Source::Binance].endpoint,
            "https://api.binance.com/api/v3/ticker/price"
        );
        assert_eq!(
            config.catalog.sources[&Source::Bybit].endpoint,
            "https://api.bybit.com/spot/v3/public/quote/ticker/price"
        );
        assert_eq!(config.ingest.poll_interval_secs, 15);
        assert!(!config.ingest.accept_invalid_certs);
        assert_eq!(config.storage.backend, StorageBackend::Disk);

        Ok(())
    }
}
