use chrono::NaiveDate;

use crate::models::analytics::{AllocationSlice, PortfolioSummary};
use crate::models::chart::ChartPoint;
use crate::models::holding::Holding;

/// Computes read-only display metrics from holdings.
///
/// Pure functions over snapshots: no I/O, no state.
pub struct AnalyticsService;

impl AnalyticsService {
    pub fn new() -> Self {
        Self
    }

    /// Σ quantity × current price.
    pub fn total_value(&self, holdings: &[Holding]) -> f64 {
        holdings.iter().map(Holding::current_value).sum()
    }

    /// Σ quantity × average cost basis.
    pub fn total_cost(&self, holdings: &[Holding]) -> f64 {
        holdings.iter().map(Holding::cost_value).sum()
    }

    /// Σ (current value − cost basis × quantity).
    pub fn unrealized_pl(&self, holdings: &[Holding]) -> f64 {
        holdings.iter().map(Holding::unrealized_pl).sum()
    }

    /// Change of the current total against the history point dated the day
    /// before `today`. With no such point the change is 0%.
    pub fn daily_change_percent(
        &self,
        holdings: &[Holding],
        history: &[ChartPoint],
        today: NaiveDate,
    ) -> f64 {
        let total = self.total_value(holdings);
        let value_one_day_ago = today
            .pred_opt()
            .and_then(|yesterday| history.iter().find(|p| p.date == yesterday))
            .map(|p| p.value)
            .unwrap_or(total);

        if value_one_day_ago.abs() < f64::EPSILON {
            0.0
        } else {
            (total - value_one_day_ago) / value_one_day_ago * 100.0
        }
    }

    /// Per-holding share of the total value, largest first.
    /// Every share is 0% when the portfolio is worth nothing.
    pub fn allocation(&self, holdings: &[Holding]) -> Vec<AllocationSlice> {
        let total = self.total_value(holdings);
        let mut slices: Vec<AllocationSlice> = holdings
            .iter()
            .map(|h| {
                let value = h.current_value();
                AllocationSlice {
                    coin_symbol: h.coin_symbol.clone(),
                    value,
                    percentage: if total > 0.0 { value / total * 100.0 } else { 0.0 },
                }
            })
            .collect();
        slices.sort_by(|a, b| {
            b.value
                .partial_cmp(&a.value)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.coin_symbol.cmp(&b.coin_symbol))
        });
        slices
    }

    pub fn summary(
        &self,
        holdings: &[Holding],
        history: &[ChartPoint],
        today: NaiveDate,
    ) -> PortfolioSummary {
        let total_value = self.total_value(holdings);
        let total_cost = self.total_cost(holdings);
        PortfolioSummary {
            as_of_date: today,
            total_value,
            total_cost,
            unrealized_pl: total_value - total_cost,
            daily_change_percent: self.daily_change_percent(holdings, history, today),
            allocation: self.allocation(holdings),
        }
    }
}

impl Default for AnalyticsService {
    fn default() -> Self {
        Self::new()
    }
}

// ── Formatting ──────────────────────────────────────────────────────

/// `1234.5, "USD"` → `"$1,234.50"`; unknown codes get a suffix: `"1,234.50 PLN"`.
pub fn format_currency(value: f64, code: &str) -> String {
    let code = code.trim().to_uppercase();
    let sign = if value < 0.0 { "-" } else { "" };
    let amount = group_thousands(value.abs());
    match currency_symbol(&code) {
        Some(symbol) => format!("{sign}{symbol}{amount}"),
        None => format!("{sign}{amount} {code}"),
    }
}

/// Signed, two decimals: `"+1.23%"`, `"-0.50%"`, `"0.00%"`.
pub fn format_percent(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded > 0.0 {
        format!("+{rounded:.2}%")
    } else if rounded < 0.0 {
        format!("{rounded:.2}%")
    } else {
        "0.00%".to_string()
    }
}

fn currency_symbol(code: &str) -> Option<&'static str> {
    match code {
        "USD" => Some("$"),
        "EUR" => Some("€"),
        "GBP" => Some("£"),
        "JPY" => Some("¥"),
        _ => None,
    }
}

fn group_thousands(value: f64) -> String {
    let fixed = format!("{value:.2}");
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    format!("{grouped}.{frac_part}")
}
