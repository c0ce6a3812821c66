use std::collections::HashSet;
use tracing::{debug, warn};

use crate::errors::CoreError;
use crate::models::market::{CoinMarket, GlobalMarketData, NewsArticle, PriceQuote};
use crate::providers::coingecko::{MarketDataClient, MarketsQuery};
use crate::providers::news::{NewsClient, NewsQuery};
use crate::services::ledger_service::HoldingsLedger;

/// Feeds market data into the rest of the core: live prices into the
/// ledger, plus market and news pass-throughs for display.
pub struct MarketService {
    market: MarketDataClient,
    news: NewsClient,
}

impl MarketService {
    pub fn new(market: MarketDataClient, news: NewsClient) -> Self {
        Self { market, news }
    }

    /// Fetch current prices and push quotes for every held coin into the
    /// ledger. Returns how many holdings received a price.
    ///
    /// When several listed coins share a ticker, the higher-ranked one
    /// (earlier in the market-cap ordered list) wins.
    pub async fn refresh_prices(
        &self,
        ledger: &mut HoldingsLedger,
        currency: &str,
    ) -> Result<usize, CoreError> {
        let markets = self
            .market
            .coin_markets(&MarketsQuery::for_currency(currency))
            .await?;

        let held: HashSet<String> = ledger
            .holdings()
            .iter()
            .map(|h| h.coin_symbol.clone())
            .collect();
        let quotes = Self::quotes_for(&markets, &held);

        let unpriced = Self::unpriced_symbols(&quotes, &held);
        if !unpriced.is_empty() {
            warn!(
                symbols = %unpriced.join(","),
                listed = markets.len(),
                "held coins missing from the markets page, their value counts as zero"
            );
        }

        debug!(fetched = markets.len(), matched = quotes.len(), "prices refreshed");
        let matched = quotes.len();
        ledger.update_prices(&quotes);
        Ok(matched)
    }

    /// First quote per symbol in `wanted`, matched case-insensitively.
    pub fn quotes_for(markets: &[CoinMarket], wanted: &HashSet<String>) -> Vec<PriceQuote> {
        let mut seen = HashSet::new();
        markets
            .iter()
            .filter(|m| {
                let symbol = m.symbol.to_uppercase();
                wanted.contains(&symbol) && seen.insert(symbol)
            })
            .filter_map(CoinMarket::to_quote)
            .collect()
    }

    /// Held symbols that received no quote, sorted.
    pub fn unpriced_symbols(quotes: &[PriceQuote], held: &HashSet<String>) -> Vec<String> {
        let priced: HashSet<String> = quotes.iter().map(|q| q.symbol.to_uppercase()).collect();
        let mut missing: Vec<String> = held
            .iter()
            .filter(|symbol| !priced.contains(&symbol.to_uppercase()))
            .cloned()
            .collect();
        missing.sort();
        missing
    }

    pub async fn markets(&self, query: &MarketsQuery) -> Result<Vec<CoinMarket>, CoreError> {
        self.market.coin_markets(query).await
    }

    pub async fn watchlist(
        &self,
        ids: &[String],
        currency: &str,
    ) -> Result<Vec<CoinMarket>, CoreError> {
        self.market.watchlist(ids, currency).await
    }

    pub async fn global_stats(&self) -> Result<GlobalMarketData, CoreError> {
        self.market.global_stats().await
    }

    pub async fn news(&self, query: &NewsQuery) -> Result<Vec<NewsArticle>, CoreError> {
        self.news.top_headlines(query).await
    }
}
