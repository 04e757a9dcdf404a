use crate::core::currency::Currency;
use crate::core::market::DEFAULT_PER_PAGE;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

pub const DEFAULT_COINGECKO_URL: &str = "https://api.coingecko.com/api/v3";
pub const API_KEY_ENV: &str = "COINBOARD_API_KEY";

fn default_per_page() -> u32 {
    DEFAULT_PER_PAGE
}

fn default_cache_ttl_secs() -> u64 {
    60
}

/// A coin held in the portfolio.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Holding {
    /// API coin id, e.g. `bitcoin`.
    pub id: String,
    pub amount: f64,
    /// Total amount paid, in the display currency.
    #[serde(default)]
    pub cost_basis: Option<f64>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CoinGeckoProviderConfig {
    pub base_url: String,
    /// Key sent as `X-RapidAPI-Key` when set.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Sent as `X-RapidAPI-Host`; derived from `base_url` when unset.
    #[serde(default)]
    pub api_host: Option<String>,
}

impl Default for CoinGeckoProviderConfig {
    fn default() -> Self {
        CoinGeckoProviderConfig {
            base_url: DEFAULT_COINGECKO_URL.to_string(),
            api_key: None,
            api_host: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub coingecko: CoinGeckoProviderConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// Used when no currency has been chosen yet.
    #[serde(default)]
    pub currency: Option<Currency>,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default)]
    pub portfolio: Vec<Holding>,
    pub data_path: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            currency: None,
            providers: ProvidersConfig::default(),
            per_page: default_per_page(),
            cache_ttl_secs: default_cache_ttl_secs(),
            portfolio: Vec::new(),
            data_path: None,
        }
    }
}

impl AppConfig {
    /// Loads the default config file, falling back to defaults when it does not exist.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!("No config at {}, using defaults", config_path.display());
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "coinboard", "coinboard")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("dev", "coinboard", "coinboard")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    /// API key from the config file, or from the environment.
    pub fn api_key(&self) -> Option<String> {
        self.providers
            .coingecko
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
currency: "aud"
per_page: 50
portfolio:
  - id: "bitcoin"
    amount: 0.25
    cost_basis: 12000
  - id: "ethereum"
    amount: 3
providers:
  coingecko:
    base_url: "https://coingecko.p.rapidapi.com"
    api_key: "secret"
data_path: "/tmp/coinboard"
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.currency, Some(Currency::Aud));
        assert_eq!(config.per_page, 50);
        assert_eq!(config.cache_ttl_secs, 60);
        assert_eq!(config.portfolio.len(), 2);
        assert_eq!(
            config.portfolio[0],
            Holding {
                id: "bitcoin".to_string(),
                amount: 0.25,
                cost_basis: Some(12000.0),
            }
        );
        assert_eq!(config.portfolio[1].cost_basis, None);
        assert_eq!(
            config.providers.coingecko.base_url,
            "https://coingecko.p.rapidapi.com"
        );
        assert_eq!(config.api_key().as_deref(), Some("secret"));
        assert_eq!(config.data_path().unwrap(), PathBuf::from("/tmp/coinboard"));
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: AppConfig = serde_yaml::from_str("portfolio: []").unwrap();
        assert_eq!(config.currency, None);
        assert_eq!(config.per_page, DEFAULT_PER_PAGE);
        assert_eq!(config.providers.coingecko.base_url, DEFAULT_COINGECKO_URL);
        assert!(config.providers.coingecko.api_host.is_none());
    }

    #[test]
    fn test_invalid_currency_is_rejected() {
        let result = serde_yaml::from_str::<AppConfig>("currency: \"XYZ\"");
        assert!(result.is_err());
    }
}
