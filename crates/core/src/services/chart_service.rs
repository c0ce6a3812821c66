use chrono::{Duration, NaiveDate};
use tracing::debug;

use crate::errors::CoreError;
use crate::models::chart::{ChartPoint, ChartRange};
use crate::models::holding::Holding;
use crate::models::transaction::Transaction;
use crate::services::ledger_service::HoldingsLedger;

/// Maximum chart date range in days (10 years).
const MAX_CHART_RANGE_DAYS: i64 = 3650;

/// Generates the portfolio value series for charts.
///
/// Each day is valued by replaying every transaction dated on or before it
/// and summing quantity × cost basis. This is a cost-basis proxy, not a
/// historical market valuation: no historical prices are fetched.
pub struct ChartService;

impl ChartService {
    pub fn new() -> Self {
        Self
    }

    /// One point per day for the `days` days ending at `today` (inclusive),
    /// oldest first.
    ///
    /// Uses incremental replay: O(days + transactions).
    pub fn history(
        &self,
        transactions: &[Transaction],
        days: u32,
        today: NaiveDate,
    ) -> Result<Vec<ChartPoint>, CoreError> {
        if days as i64 > MAX_CHART_RANGE_DAYS {
            return Err(CoreError::ValidationError(format!(
                "Chart range of {days} days exceeds maximum of {MAX_CHART_RANGE_DAYS} days (10 years)"
            )));
        }
        if days == 0 {
            return Ok(Vec::new());
        }

        let mut ordered: Vec<&Transaction> = transactions.iter().collect();
        ordered.sort_by_key(|t| t.date);

        let start = today - Duration::days(days as i64 - 1);
        let mut holdings: Vec<Holding> = Vec::new();
        let mut next = 0;
        let mut points = Vec::with_capacity(days as usize);

        let mut day = start;
        while day <= today {
            while next < ordered.len() && ordered[next].date.date_naive() <= day {
                let tx = ordered[next];
                // The chart is display-only; a bad record must not blank it.
                if let Err(e) = HoldingsLedger::apply(tx, &mut holdings) {
                    debug!(id = %tx.id, error = %e, "skipping unreplayable transaction in history");
                }
                next += 1;
            }
            let value = holdings.iter().map(Holding::cost_value).sum();
            points.push(ChartPoint { date: day, value });
            day += Duration::days(1);
        }

        Ok(points)
    }

    /// Series for a chart range. `All` starts at the first transaction.
    pub fn series_for_range(
        &self,
        transactions: &[Transaction],
        range: ChartRange,
        today: NaiveDate,
    ) -> Result<Vec<ChartPoint>, CoreError> {
        let days = match range.days() {
            Some(days) => days,
            None => transactions
                .iter()
                .map(|t| t.date.date_naive())
                .min()
                .map(|first| (today - first).num_days() + 1)
                .unwrap_or(1)
                .clamp(1, MAX_CHART_RANGE_DAYS),
        };
        self.history(transactions, days as u32, today)
    }
}

impl Default for ChartService {
    fn default() -> Self {
        Self::new()
    }
}
