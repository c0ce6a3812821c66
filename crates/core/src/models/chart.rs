use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single point of a portfolio value series.
///
/// Generated for charts, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Time window selected in the chart UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChartRange {
    Week,
    Month,
    ThreeMonths,
    Year,
    /// Everything since the first transaction
    All,
}

impl ChartRange {
    /// Number of days covered, `None` for the unbounded range.
    pub fn days(&self) -> Option<i64> {
        match self {
            ChartRange::Week => Some(7),
            ChartRange::Month => Some(30),
            ChartRange::ThreeMonths => Some(90),
            ChartRange::Year => Some(365),
            ChartRange::All => None,
        }
    }
}

impl std::fmt::Display for ChartRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChartRange::Week => write!(f, "1W"),
            ChartRange::Month => write!(f, "1M"),
            ChartRange::ThreeMonths => write!(f, "3M"),
            ChartRange::Year => write!(f, "1Y"),
            ChartRange::All => write!(f, "ALL"),
        }
    }
}
