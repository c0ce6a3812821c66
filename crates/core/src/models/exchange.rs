use serde::{Deserialize, Serialize};

/// An exchange account linked to the bot platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeAccount {
    pub id: u64,
    pub name: String,

    #[serde(default)]
    pub exchange_name: Option<String>,

    /// Total account value in USD, sent as a decimal string
    #[serde(default)]
    pub usd_amount: Option<String>,
}

/// One currency row of an account's balance table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountBalance {
    pub currency_code: String,

    #[serde(default)]
    pub currency_name: Option<String>,

    /// Units held, decimal string
    pub position: String,

    #[serde(default)]
    pub usd_value: Option<String>,

    #[serde(default)]
    pub current_price_usd: Option<String>,
}

/// Parameters for creating a simple DCA bot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotConfig {
    pub name: String,
    pub account_id: u64,

    /// Trading pairs in platform format, e.g. "USDT_BTC"
    pub pairs: Vec<String>,

    /// Base order volume in quote currency, decimal string
    pub base_order_volume: String,

    /// Safety order volume in quote currency, decimal string
    pub safety_order_volume: String,

    /// Take profit, percent as decimal string
    pub take_profit: String,

    pub max_safety_orders: u32,

    /// Price deviation to open safety orders, percent as decimal string
    pub safety_order_step_percentage: String,

    /// "long" or "short"
    #[serde(default = "default_strategy")]
    pub strategy: String,
}

fn default_strategy() -> String {
    "long".to_string()
}

/// A bot as returned by the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bot {
    pub id: u64,
    pub name: String,

    #[serde(default)]
    pub account_id: Option<u64>,

    #[serde(default)]
    pub is_enabled: bool,

    #[serde(default)]
    pub pairs: Vec<String>,
}
