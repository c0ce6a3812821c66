use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use crate::errors::CoreError;
use crate::models::order_book::{OrderBook, OrderBookEntry};
use crate::net::transport::{HttpRequest, HttpTransport};

use super::traits::OrderBookSource;

const BASE_URL: &str = "https://api.binance.com/api/v3";
const PROVIDER: &str = "Binance";

/// Binance spot depth endpoint: `/depth?symbol=BTCUSDT&limit=N`.
///
/// Levels arrive as `[["price","qty"], ...]`, already as decimal strings.
pub struct BinanceOrderBook {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
    quote: String,
    depth: usize,
}

impl BinanceOrderBook {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            base_url: BASE_URL.to_string(),
            quote: "USDT".to_string(),
            depth: 20,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// "btc" → "BTCUSDT"
    pub fn pair_for(&self, symbol: &str) -> String {
        format!("{}{}", symbol.trim().to_uppercase(), self.quote)
    }
}

// ── Binance API response types ──────────────────────────────────────

#[derive(Deserialize)]
struct DepthResponse {
    bids: Vec<[String; 2]>,
    asks: Vec<[String; 2]>,
}

fn to_entries(levels: Vec<[String; 2]>) -> Vec<OrderBookEntry> {
    levels
        .into_iter()
        .map(|[price, qty]| OrderBookEntry { price, qty })
        .collect()
}

#[async_trait]
impl OrderBookSource for BinanceOrderBook {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn fetch_order_book(&self, symbol: &str) -> Result<OrderBook, CoreError> {
        let request = HttpRequest::get(format!("{}/depth", self.base_url))
            .query("symbol", self.pair_for(symbol))
            .query("limit", self.depth.to_string());

        let response = self.transport.send(&request).await?;
        if !response.is_success() {
            return Err(CoreError::BadResponse {
                provider: PROVIDER.into(),
                message: format!("HTTP {} for {}", response.status, self.pair_for(symbol)),
            });
        }

        let depth: DepthResponse =
            serde_json::from_str(&response.body).map_err(|e| CoreError::BadResponse {
                provider: PROVIDER.into(),
                message: format!("Failed to parse depth for {symbol}: {e}"),
            })?;

        Ok(OrderBook::new(to_entries(depth.bids), to_entries(depth.asks)).truncated(self.depth))
    }
}
