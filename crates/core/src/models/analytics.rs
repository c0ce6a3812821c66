use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Share of one holding in the total portfolio value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationSlice {
    pub coin_symbol: String,

    /// Current value of the holding
    pub value: f64,

    /// Percentage of total value (0–100). All zeros when the portfolio is worth nothing.
    pub percentage: f64,
}

/// Read-only display metrics for the whole portfolio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    /// Date this summary was computed for
    pub as_of_date: NaiveDate,

    /// Σ quantity × current price
    pub total_value: f64,

    /// Σ quantity × average cost basis
    pub total_cost: f64,

    /// total_value − total_cost
    pub unrealized_pl: f64,

    /// Change against the value one day earlier, in percent
    pub daily_change_percent: f64,

    /// Sorted by value, largest first
    pub allocation: Vec<AllocationSlice>,
}
