use rand::seq::SliceRandom;
use rand::Rng;

use crate::models::analytics::PortfolioSummary;
use crate::models::insight::Insight;

/// Share of the portfolio in one coin above which we warn about concentration.
const CONCENTRATION_PCT: f64 = 50.0;
/// Daily move (either direction) worth calling out.
const BIG_MOVE_PCT: f64 = 5.0;
/// Unrealized P/L relative to cost worth calling out.
const PL_PCT: f64 = 10.0;

/// General advice shown when nothing specific stands out.
pub const TIPS: &[&str] = &[
    "Dollar-cost averaging smooths out the impact of volatility on your entry price.",
    "Review your allocation periodically and rebalance when it drifts from your plan.",
    "Keep a record of every trade; accurate cost basis makes tax time easier.",
    "Never invest more than you can afford to lose.",
    "Consider moving long-term holdings to self-custody.",
];

/// Produces a short text insight for the portfolio summary.
pub struct InsightService;

impl InsightService {
    pub fn new() -> Self {
        Self
    }

    pub fn generate(&self, summary: &PortfolioSummary) -> Insight {
        self.generate_with_rng(summary, &mut rand::thread_rng())
    }

    /// Rules in priority order: concentration, big daily move, large
    /// unrealized P/L. Falls back to a random tip.
    pub fn generate_with_rng<R: Rng + ?Sized>(
        &self,
        summary: &PortfolioSummary,
        rng: &mut R,
    ) -> Insight {
        if summary.total_value > 0.0 {
            if let Some(top) = summary.allocation.first() {
                if top.percentage > CONCENTRATION_PCT && summary.allocation.len() > 1 {
                    return Insight::new(
                        "Concentration risk",
                        format!(
                            "{} makes up {:.1}% of your portfolio. Diversifying could reduce volatility.",
                            top.coin_symbol, top.percentage
                        ),
                    );
                }
            }

            if summary.daily_change_percent.abs() > BIG_MOVE_PCT {
                let direction = if summary.daily_change_percent > 0.0 { "up" } else { "down" };
                return Insight::new(
                    "Big move today",
                    format!(
                        "Your portfolio is {direction} {:.1}% since yesterday.",
                        summary.daily_change_percent.abs()
                    ),
                );
            }

            if summary.total_cost > 0.0 {
                let pl_pct = summary.unrealized_pl / summary.total_cost * 100.0;
                if pl_pct > PL_PCT {
                    return Insight::new(
                        "In profit",
                        format!("Your holdings are {pl_pct:.1}% above cost. Consider whether to take some profit."),
                    );
                }
                if pl_pct < -PL_PCT {
                    return Insight::new(
                        "Below cost",
                        format!(
                            "Your holdings are {:.1}% below cost. Check your plan before reacting.",
                            pl_pct.abs()
                        ),
                    );
                }
            }
        }

        let tip = TIPS.choose(rng).copied().unwrap_or(TIPS[0]);
        Insight::new("Tip", tip)
    }
}

impl Default for InsightService {
    fn default() -> Self {
        Self::new()
    }
}
