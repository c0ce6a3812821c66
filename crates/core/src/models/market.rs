use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ── Market data provider ────────────────────────────────────────────

/// Envelope of the global market statistics endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalMarketResponse {
    pub data: GlobalMarketData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalMarketData {
    #[serde(default)]
    pub active_cryptocurrencies: u64,

    #[serde(default)]
    pub markets: u64,

    /// Currency code (lowercase) → total market cap
    #[serde(default)]
    pub total_market_cap: HashMap<String, f64>,

    #[serde(default)]
    pub total_volume: HashMap<String, f64>,

    /// Coin symbol (lowercase) → dominance percent
    #[serde(default)]
    pub market_cap_percentage: HashMap<String, f64>,

    #[serde(default)]
    pub market_cap_change_percentage_24h_usd: Option<f64>,

    #[serde(default)]
    pub updated_at: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sparkline {
    #[serde(default)]
    pub price: Vec<f64>,
}

/// One row of the coin markets list. Most numeric fields are nullable upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinMarket {
    pub id: String,
    pub symbol: String,
    pub name: String,

    #[serde(default)]
    pub image: Option<String>,

    #[serde(default)]
    pub current_price: Option<f64>,

    #[serde(default)]
    pub market_cap: Option<f64>,

    #[serde(default)]
    pub market_cap_rank: Option<u32>,

    #[serde(default)]
    pub total_volume: Option<f64>,

    #[serde(default)]
    pub high_24h: Option<f64>,

    #[serde(default)]
    pub low_24h: Option<f64>,

    #[serde(default)]
    pub price_change_percentage_24h: Option<f64>,

    #[serde(default)]
    pub price_change_percentage_1h_in_currency: Option<f64>,

    #[serde(default)]
    pub price_change_percentage_24h_in_currency: Option<f64>,

    #[serde(default)]
    pub price_change_percentage_7d_in_currency: Option<f64>,

    #[serde(default)]
    pub sparkline_in_7d: Option<Sparkline>,
}

impl CoinMarket {
    /// 24h change, preferring the per-currency figure when it was requested.
    pub fn change_24h(&self) -> f64 {
        self.price_change_percentage_24h_in_currency
            .or(self.price_change_percentage_24h)
            .unwrap_or(0.0)
    }

    /// Latest price as a ledger quote, if the provider sent one.
    pub fn to_quote(&self) -> Option<PriceQuote> {
        self.current_price
            .map(|price| PriceQuote::new(&self.symbol, price, self.change_24h()))
    }
}

/// Latest price for one coin, as fed into the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub symbol: String,
    pub price: f64,
    pub change_percent_24h: f64,
}

impl PriceQuote {
    pub fn new(symbol: impl Into<String>, price: f64, change_percent_24h: f64) -> Self {
        Self {
            symbol: symbol.into().to_uppercase(),
            price,
            change_percent_24h,
        }
    }
}

// ── News provider ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsResponse {
    pub status: String,

    #[serde(default)]
    pub total_results: u64,

    #[serde(default)]
    pub articles: Vec<NewsArticle>,

    /// Present only on error envelopes
    #[serde(default)]
    pub code: Option<String>,

    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsSource {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsArticle {
    pub title: String,
    pub url: String,

    #[serde(default)]
    pub source: Option<NewsSource>,

    #[serde(default)]
    pub author: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub url_to_image: Option<String>,

    #[serde(default)]
    pub published_at: Option<String>,
}
