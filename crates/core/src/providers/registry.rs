use std::sync::Arc;
use tracing::{debug, warn};

use crate::errors::CoreError;
use crate::models::order_book::OrderBook;
use crate::net::transport::HttpTransport;

use super::binance::BinanceOrderBook;
use super::coinbase::CoinbaseOrderBook;
use super::traits::OrderBookSource;

/// Ordered list of order book venues.
///
/// `fetch` walks the list in registration order and returns the first
/// complete snapshot; the primary venue is simply the first one registered.
pub struct OrderBookVenues {
    sources: Vec<Box<dyn OrderBookSource>>,
}

impl OrderBookVenues {
    /// Create an empty list.
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    /// Binance first, Coinbase as fallback.
    pub fn new_with_defaults(transport: Arc<dyn HttpTransport>) -> Self {
        let mut venues = Self::new();
        venues.register(Box::new(BinanceOrderBook::new(Arc::clone(&transport))));
        venues.register(Box::new(CoinbaseOrderBook::new(transport)));
        venues
    }

    /// Append a venue at the lowest priority.
    pub fn register(&mut self, source: Box<dyn OrderBookSource>) {
        self.sources.push(source);
    }

    pub fn names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Try each venue in order. Returns the winning venue's name with its book,
    /// or the last venue's error if all of them failed.
    pub async fn fetch(&self, symbol: &str) -> Result<(String, OrderBook), CoreError> {
        let mut last_error = None;
        for source in &self.sources {
            match source.fetch_order_book(symbol).await {
                Ok(book) => {
                    debug!(venue = source.name(), symbol, "order book fetched");
                    return Ok((source.name().to_string(), book));
                }
                Err(e) => {
                    warn!(venue = source.name(), symbol, error = %e, "order book venue failed");
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| CoreError::NoProvider("order book".into())))
    }
}

impl Default for OrderBookVenues {
    fn default() -> Self {
        Self::new()
    }
}
