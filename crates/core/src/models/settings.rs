use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::errors::CoreError;
use crate::net::retry::RetryPolicy;

/// API key names used in [`Settings::api_keys`].
pub const NEWS_API_KEY: &str = "newsapi";
pub const THREE_COMMAS_KEY: &str = "3commas_key";
pub const THREE_COMMAS_SECRET: &str = "3commas_secret";

/// Application configuration. Constructed once at startup and handed to
/// [`crate::PortfolioTracker`]; nothing in the library reads globals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Quote currency for market data and display (e.g., "USD")
    pub default_currency: String,

    /// App-private directory for cache blobs and the transaction log
    pub data_dir: PathBuf,

    /// Provider credentials. Keys: see the `*_KEY` constants in this module.
    pub api_keys: HashMap<String, String>,

    /// Connect timeout per request
    pub request_timeout_secs: u64,

    /// Upper bound for a whole request including the body
    pub resource_timeout_secs: u64,

    pub order_book_poll_secs: u64,

    /// Days of history in the portfolio chart
    pub history_days: u32,

    pub retry: RetryPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_currency: "USD".to_string(),
            data_dir: PathBuf::from("portfolio-data"),
            api_keys: HashMap::new(),
            request_timeout_secs: 30,
            resource_timeout_secs: 60,
            order_book_poll_secs: 5,
            history_days: 30,
            retry: RetryPolicy::default(),
        }
    }
}

impl Settings {
    /// Defaults overridden by environment variables where set.
    ///
    /// `PORTFOLIO_CURRENCY`, `PORTFOLIO_DATA_DIR`, `NEWSAPI_KEY`,
    /// `THREECOMMAS_API_KEY`, `THREECOMMAS_API_SECRET`.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`Settings::from_env`] with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();
        if let Some(currency) = lookup("PORTFOLIO_CURRENCY").filter(|c| !c.trim().is_empty()) {
            settings.default_currency = currency.trim().to_uppercase();
        }
        if let Some(dir) = lookup("PORTFOLIO_DATA_DIR").filter(|d| !d.trim().is_empty()) {
            settings.data_dir = PathBuf::from(dir);
        }
        for (var, key) in [
            ("NEWSAPI_KEY", NEWS_API_KEY),
            ("THREECOMMAS_API_KEY", THREE_COMMAS_KEY),
            ("THREECOMMAS_API_SECRET", THREE_COMMAS_SECRET),
        ] {
            if let Some(value) = lookup(var).filter(|v| !v.is_empty()) {
                settings.api_keys.insert(key.to_string(), value);
            }
        }
        settings
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let text = std::fs::read_to_string(path)?;
        let settings = serde_json::from_str(&text)?;
        Ok(settings)
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), CoreError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| CoreError::Serialization(format!("Failed to serialize settings: {e}")))?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn api_key(&self, name: &str) -> Option<&str> {
        self.api_keys.get(name).map(String::as_str)
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.data_dir.join("cache")
    }

    pub fn transaction_log_path(&self) -> PathBuf {
        self.data_dir.join("transactions.json")
    }
}
