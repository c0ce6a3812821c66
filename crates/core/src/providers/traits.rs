use async_trait::async_trait;

use crate::errors::CoreError;
use crate::models::order_book::OrderBook;

/// A venue that can return a complete order book snapshot for one coin.
///
/// Each exchange (Binance, Coinbase) implements this trait and normalizes
/// its own wire schema into [`OrderBook`]. Venues are tried in order by
/// [`super::registry::OrderBookVenues`]; adding one touches nothing else.
#[async_trait]
pub trait OrderBookSource: Send + Sync {
    /// Human-readable name of this venue (for logs/errors).
    fn name(&self) -> &str;

    /// Fetch the current snapshot for a base coin symbol such as "BTC".
    /// Any failure (network, status, parse) is an error; never a partial book.
    async fn fetch_order_book(&self, symbol: &str) -> Result<OrderBook, CoreError>;
}
