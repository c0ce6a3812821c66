pub mod registry;
pub mod traits;

// API provider implementations
pub mod binance;
pub mod coinbase;
pub mod coingecko;
pub mod news;
pub mod three_commas;
