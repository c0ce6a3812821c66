use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One price level. Price and quantity stay decimal strings exactly as the
/// venue sent them, so rendering never shows float artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBookEntry {
    pub price: String,
    pub qty: String,
}

impl OrderBookEntry {
    pub fn new(price: impl Into<String>, qty: impl Into<String>) -> Self {
        Self {
            price: price.into(),
            qty: qty.into(),
        }
    }

    /// Numeric price, used only for ordering and spread math.
    pub fn price_value(&self) -> Option<f64> {
        self.price.parse().ok()
    }
}

/// A complete top-of-book snapshot: bids descending, asks ascending.
///
/// Always replaced as a whole; there is no incremental diffing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBook {
    pub bids: Vec<OrderBookEntry>,
    pub asks: Vec<OrderBookEntry>,
}

impl OrderBook {
    pub fn new(bids: Vec<OrderBookEntry>, asks: Vec<OrderBookEntry>) -> Self {
        Self { bids, asks }.normalized()
    }

    /// Sort both sides into canonical order (bids desc, asks asc).
    /// Levels with unparseable prices sink to the end.
    pub fn normalized(mut self) -> Self {
        self.bids.sort_by(|a, b| {
            let (pa, pb) = (a.price_value(), b.price_value());
            pb.partial_cmp(&pa).unwrap_or(std::cmp::Ordering::Equal)
        });
        self.asks.sort_by(|a, b| match (a.price_value(), b.price_value()) {
            (Some(pa), Some(pb)) => pa.partial_cmp(&pb).unwrap_or(std::cmp::Ordering::Equal),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
        self
    }

    /// Keep at most `depth` levels per side.
    pub fn truncated(mut self, depth: usize) -> Self {
        self.bids.truncate(depth);
        self.asks.truncate(depth);
        self
    }

    pub fn best_bid(&self) -> Option<&OrderBookEntry> {
        self.bids.first()
    }

    pub fn best_ask(&self) -> Option<&OrderBookEntry> {
        self.asks.first()
    }

    /// Best ask minus best bid.
    pub fn spread(&self) -> Option<f64> {
        let bid = self.best_bid()?.price_value()?;
        let ask = self.best_ask()?.price_value()?;
        Some(ask - bid)
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }
}

/// Lifecycle of the order book poller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PollerStatus {
    Idle,
    Polling { symbol: String },
}

/// Everything a consumer of the poller sees, published as one value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBookState {
    pub status: PollerStatus,

    /// Last valid snapshot for the current symbol
    pub book: OrderBook,

    /// Venue that produced `book`, if it came from the network
    pub source: Option<String>,

    /// Message from the most recent failed tick, cleared on success
    pub error: Option<String>,

    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for OrderBookState {
    fn default() -> Self {
        Self {
            status: PollerStatus::Idle,
            book: OrderBook::default(),
            source: None,
            error: None,
            updated_at: None,
        }
    }
}
