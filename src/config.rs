use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable that overrides `api.base_url`.
pub const API_URL_ENV: &str = "BOOK_INVENTORY_API_URL";

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub list: ListConfig,
    pub tui: TuiConfig,
}

/// Catalog API connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL; `/books` is appended to it.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Optional bearer token sent with every request.
    pub token: Option<String>,
}

/// Books list behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListConfig {
    /// Books per page.
    pub page_size: u32,
    /// Quiet period before the title search is sent, in milliseconds.
    pub search_debounce_ms: u64,
}

/// TUI-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TuiConfig {
    /// Tick interval in milliseconds for the event loop.
    pub tick_rate_ms: u64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000/api".to_string(),
            timeout_secs: 15,
            token: None,
        }
    }
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            page_size: crate::core::books::query::DEFAULT_PAGE_SIZE,
            search_debounce_ms: 400,
        }
    }
}

impl Default for TuiConfig {
    fn default() -> Self {
        Self { tick_rate_ms: 50 }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

impl ListConfig {
    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }
}

impl TuiConfig {
    pub fn tick_rate(&self) -> Duration {
        Duration::from_millis(self.tick_rate_ms.max(1))
    }
}

impl AppConfig {
    /// Load configuration from `~/.config/book-inventory/config.toml`.
    /// Returns `Default` if the file is missing or unparseable.
    /// `BOOK_INVENTORY_API_URL` wins over the file either way.
    pub fn load() -> Self {
        let config_path = Self::config_path();
        let mut config = match Self::load_from(&config_path) {
            Ok(config) => {
                log::info!("Loaded config from {}", config_path.display());
                config
            }
            Err(ConfigError::Io(_)) => {
                log::debug!(
                    "No config file at {}, using defaults",
                    config_path.display()
                );
                Self::default()
            }
            Err(e) => {
                log::warn!(
                    "Failed to parse config at {}: {e}, using defaults",
                    config_path.display()
                );
                Self::default()
            }
        };

        if let Ok(url) = std::env::var(API_URL_ENV) {
            config.apply_api_url_override(url);
        }
        config
    }

    /// Parse a specific config file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    fn apply_api_url_override(&mut self, url: String) {
        let url = url.trim();
        if !url.is_empty() {
            log::info!("Using catalog URL from {API_URL_ENV}: {url}");
            self.api.base_url = url.to_string();
        }
    }

    fn config_path() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("book-inventory").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }
}
