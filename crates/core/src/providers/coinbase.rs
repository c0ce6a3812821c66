use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use crate::errors::CoreError;
use crate::models::order_book::{OrderBook, OrderBookEntry};
use crate::net::transport::{HttpRequest, HttpTransport};

use super::traits::OrderBookSource;

const BASE_URL: &str = "https://api.exchange.coinbase.com";
const PROVIDER: &str = "Coinbase";

/// Coinbase Exchange level-2 book: `/products/BTC-USD/book?level=2`.
///
/// Rows are `[price, size, num_orders]`; only the first two are kept.
pub struct CoinbaseOrderBook {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
    quote: String,
    depth: usize,
}

impl CoinbaseOrderBook {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            base_url: BASE_URL.to_string(),
            quote: "USD".to_string(),
            depth: 20,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// "btc" → "BTC-USD"
    pub fn product_for(&self, symbol: &str) -> String {
        format!("{}-{}", symbol.trim().to_uppercase(), self.quote)
    }
}

// ── Coinbase API response types ─────────────────────────────────────

#[derive(Deserialize)]
struct BookResponse {
    bids: Vec<Vec<Value>>,
    asks: Vec<Vec<Value>>,
}

fn value_to_decimal_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn to_entries(rows: &[Vec<Value>]) -> Result<Vec<OrderBookEntry>, CoreError> {
    rows.iter()
        .map(|row| {
            let price = row.first().and_then(value_to_decimal_string);
            let qty = row.get(1).and_then(value_to_decimal_string);
            match (price, qty) {
                (Some(price), Some(qty)) => Ok(OrderBookEntry { price, qty }),
                _ => Err(CoreError::BadResponse {
                    provider: PROVIDER.into(),
                    message: format!("Malformed book row: {row:?}"),
                }),
            }
        })
        .collect()
}

#[async_trait]
impl OrderBookSource for CoinbaseOrderBook {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn fetch_order_book(&self, symbol: &str) -> Result<OrderBook, CoreError> {
        let product = self.product_for(symbol);
        // Coinbase rejects requests without a User-Agent.
        let request = HttpRequest::get(format!("{}/products/{product}/book", self.base_url))
            .query("level", "2")
            .header("User-Agent", "crypto-portfolio-core");

        let response = self.transport.send(&request).await?;
        if !response.is_success() {
            return Err(CoreError::BadResponse {
                provider: PROVIDER.into(),
                message: format!("HTTP {} for {product}", response.status),
            });
        }

        let book: BookResponse =
            serde_json::from_str(&response.body).map_err(|e| CoreError::BadResponse {
                provider: PROVIDER.into(),
                message: format!("Failed to parse book for {product}: {e}"),
            })?;

        let bids = to_entries(&book.bids)?;
        let asks = to_entries(&book.asks)?;
        Ok(OrderBook::new(bids, asks).truncated(self.depth))
    }
}
