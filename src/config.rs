//! Configuration file handling with TOML support.

use crate::market::MarketEndpoints;
use crate::symbol::SymbolRules;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration loaded from TOML file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// General settings
    #[serde(default)]
    pub general: GeneralConfig,

    /// MarketBrief backend
    #[serde(default)]
    pub backend: BackendConfig,

    /// Yahoo Finance endpoints and relay
    #[serde(default)]
    pub market: MarketEndpoints,

    /// Symbol normalization rules
    #[serde(default)]
    pub symbols: SymbolRules,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// API timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Live quote refresh interval
    #[serde(default = "default_quote_interval", with = "human_duration")]
    pub quote_interval: Duration,

    /// Intraday chart refresh interval
    #[serde(default = "default_chart_interval", with = "human_duration")]
    pub chart_interval: Duration,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            quote_interval: default_quote_interval(),
            chart_interval: default_chart_interval(),
        }
    }
}

fn default_timeout() -> u64 {
    10
}
fn default_quote_interval() -> Duration {
    Duration::from_secs(10)
}
fn default_chart_interval() -> Duration {
    Duration::from_secs(5)
}

/// Backend connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8080/api".to_string()
}

/// Durations are written the human way in the file: `"10s"`, `"1m 30s"`.
mod human_duration {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*value).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(D::Error::custom)
    }
}

impl Config {
    /// Load configuration from file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load configuration from default location or create default.
    pub fn load_or_default() -> Self {
        if let Some(path) = Self::default_config_path() {
            if path.exists() {
                match Self::load(&path) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to load config: {:#}", e);
                    }
                }
            }
        }
        Config::default()
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("marketbrief").join("config.toml"))
    }

    /// Save configuration to file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }
}

/// Generate a sample configuration file content.
pub fn sample_config() -> &'static str {
    r##"# MarketBrief Configuration File

[general]
# HTTP timeout in seconds
timeout = 10
# How often the live quote refreshes
quote_interval = "10s"
# How often the intraday chart refreshes
chart_interval = "5s"

[backend]
base_url = "http://localhost:8080/api"

[market]
quote_url = "https://query1.finance.yahoo.com/v7/finance/quote"
summary_url = "https://query2.finance.yahoo.com/v10/finance/quoteSummary"
chart_url = "https://query1.finance.yahoo.com/v8/finance/chart"
# CORS relay used when a direct request fails
proxy_url = "https://api.allorigins.win/raw"

[symbols]
# Appended to plain domestic tickers (TCS -> TCS.NS)
domestic_suffix = ".NS"
# Plain tickers that are US-listed and left alone
us_listed = ["AAPL", "MSFT", "GOOGL", "AMZN", "META", "TSLA", "NVDA", "NFLX"]
"##
}
