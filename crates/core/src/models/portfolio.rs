use serde::{Deserialize, Serialize};

use super::holding::Holding;
use super::transaction::Transaction;

/// Point-in-time pairing of holdings and the transactions they came from.
///
/// Built on demand as an export artifact or as input to analytics and
/// insights. Has no lifecycle of its own.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    pub holdings: Vec<Holding>,
    pub transactions: Vec<Transaction>,
}

impl Portfolio {
    pub fn new(holdings: Vec<Holding>, transactions: Vec<Transaction>) -> Self {
        Self {
            holdings,
            transactions,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.holdings.is_empty() && self.transactions.is_empty()
    }
}
