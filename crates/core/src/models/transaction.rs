use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::CoreError;

/// A single buy/sell record in the transaction log.
///
/// Transactions are never mutated in place: an edit replaces the whole
/// record and the ledger rebuilds holdings from scratch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique identifier
    pub id: Uuid,

    /// Coin ticker, uppercased (e.g., "BTC")
    pub coin_symbol: String,

    /// Number of units bought or sold (always positive)
    pub quantity: f64,

    /// Price paid or received per unit (always positive)
    pub price_per_unit: f64,

    /// When the trade happened
    pub date: DateTime<Utc>,

    /// `true` for a buy, `false` for a sell
    pub is_buy: bool,

    /// `true` when entered by the user; synced records are read-only
    pub is_manual: bool,
}

impl Transaction {
    pub fn new(
        coin_symbol: impl Into<String>,
        quantity: f64,
        price_per_unit: f64,
        date: DateTime<Utc>,
        is_buy: bool,
        is_manual: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            coin_symbol: coin_symbol.into().trim().to_uppercase(),
            quantity,
            price_per_unit,
            date,
            is_buy,
            is_manual,
        }
    }

    /// A user-entered buy.
    pub fn buy(
        coin_symbol: impl Into<String>,
        quantity: f64,
        price_per_unit: f64,
        date: DateTime<Utc>,
    ) -> Self {
        Self::new(coin_symbol, quantity, price_per_unit, date, true, true)
    }

    /// A user-entered sell.
    pub fn sell(
        coin_symbol: impl Into<String>,
        quantity: f64,
        price_per_unit: f64,
        date: DateTime<Utc>,
    ) -> Self {
        Self::new(coin_symbol, quantity, price_per_unit, date, false, true)
    }

    /// A record imported from an exchange account. Cannot be edited or deleted.
    pub fn synced(
        coin_symbol: impl Into<String>,
        quantity: f64,
        price_per_unit: f64,
        date: DateTime<Utc>,
        is_buy: bool,
    ) -> Self {
        Self::new(coin_symbol, quantity, price_per_unit, date, is_buy, false)
    }

    /// Override the id, e.g. to keep an edited record under its original id.
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    /// Notional value of the trade.
    pub fn total_value(&self) -> f64 {
        self.quantity * self.price_per_unit
    }

    /// Reject records the ledger cannot apply.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.coin_symbol.is_empty() {
            return Err(CoreError::ValidationError("Coin symbol must not be empty".into()));
        }
        if !(self.quantity.is_finite() && self.quantity > 0.0) {
            return Err(CoreError::ValidationError(format!(
                "Quantity must be positive, got {}",
                self.quantity
            )));
        }
        if !(self.price_per_unit.is_finite() && self.price_per_unit > 0.0) {
            return Err(CoreError::ValidationError(format!(
                "Price per unit must be positive, got {}",
                self.price_per_unit
            )));
        }
        Ok(())
    }
}
