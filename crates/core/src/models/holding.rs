use serde::{Deserialize, Serialize};

/// Aggregated position in one coin, derived from the transaction log
/// plus the latest price feed. Never authoritative on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    /// Coin ticker, uppercased
    pub coin_symbol: String,

    /// Units currently held
    pub quantity: f64,

    /// Quantity-weighted average purchase price of the units held
    pub average_cost_basis: f64,

    /// Latest known market price (0 until a price feed arrives)
    pub current_price: f64,

    /// 24h price change in percent, from the price feed
    pub daily_change_percent: f64,

    pub is_favorite: bool,
}

impl Holding {
    pub fn new(coin_symbol: impl Into<String>, quantity: f64, average_cost_basis: f64) -> Self {
        Self {
            coin_symbol: coin_symbol.into().to_uppercase(),
            quantity,
            average_cost_basis,
            current_price: 0.0,
            daily_change_percent: 0.0,
            is_favorite: false,
        }
    }

    pub fn current_value(&self) -> f64 {
        self.quantity * self.current_price
    }

    /// What the held units cost.
    pub fn cost_value(&self) -> f64 {
        self.quantity * self.average_cost_basis
    }

    pub fn unrealized_pl(&self) -> f64 {
        self.current_value() - self.cost_value()
    }

    /// Unrealized P/L relative to cost, in percent. 0 when nothing was paid.
    pub fn unrealized_pl_percent(&self) -> f64 {
        let cost = self.cost_value();
        if cost.abs() < f64::EPSILON {
            0.0
        } else {
            self.unrealized_pl() / cost * 100.0
        }
    }

    pub fn matches_symbol(&self, symbol: &str) -> bool {
        self.coin_symbol.eq_ignore_ascii_case(symbol.trim())
    }
}
