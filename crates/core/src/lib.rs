pub mod errors;
pub mod logging;
pub mod models;
pub mod net;
pub mod providers;
pub mod services;
pub mod storage;

use chrono::{NaiveDate, Utc};
use models::{
    analytics::PortfolioSummary,
    chart::{ChartPoint, ChartRange},
    exchange::{AccountBalance, Bot, BotConfig, ExchangeAccount},
    holding::Holding,
    insight::Insight,
    market::{CoinMarket, GlobalMarketData, NewsArticle},
    order_book::OrderBookState,
    portfolio::Portfolio,
    settings::{Settings, NEWS_API_KEY, THREE_COMMAS_KEY, THREE_COMMAS_SECRET},
    transaction::Transaction,
};
use net::{
    connectivity::{AlwaysOnline, Connectivity},
    fetcher::RemoteFetcher,
    transport::{HttpTransport, ReqwestTransport},
};
use providers::{
    coingecko::{MarketDataClient, MarketsQuery},
    news::{NewsClient, NewsQuery},
    registry::OrderBookVenues,
    three_commas::{ApiCredentials, ExchangeAccountClient},
};
use services::{
    analytics_service::AnalyticsService, chart_service::ChartService,
    insight_service::InsightService, ledger_service::HoldingsLedger,
    market_service::MarketService, order_book_service::OrderBookPoller,
};
use std::sync::Arc;
use std::time::Duration;
use storage::{cache::CacheStore, transaction_log::TransactionLogFile};
use tokio::sync::{mpsc, watch};
use uuid::Uuid;

use errors::CoreError;

/// Main entry point for the portfolio core library.
///
/// Every service is constructed here from [`Settings`] and owned by this
/// value; nothing is process-global. The host creates one at startup and
/// drops it at shutdown, which also stops the order book poller.
#[must_use]
pub struct PortfolioTracker {
    settings: Settings,
    ledger: HoldingsLedger,
    fetcher: Arc<RemoteFetcher>,
    market_service: MarketService,
    exchange: ExchangeAccountClient,
    poller: OrderBookPoller,
    analytics_service: AnalyticsService,
    chart_service: ChartService,
    insight_service: InsightService,
}

impl std::fmt::Debug for PortfolioTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortfolioTracker")
            .field("ledger", &self.ledger)
            .field("currency", &self.settings.default_currency)
            .field("data_dir", &self.settings.data_dir)
            .field("order_book_polling", &self.poller.is_polling())
            .finish()
    }
}

impl PortfolioTracker {
    /// Production wiring: reqwest transport, no reachability monitor.
    pub fn new(settings: Settings) -> Result<Self, CoreError> {
        let transport = Arc::new(ReqwestTransport::new(
            Duration::from_secs(settings.request_timeout_secs),
            Duration::from_secs(settings.resource_timeout_secs),
        ));
        Self::with_dependencies(settings, transport, Arc::new(AlwaysOnline))
    }

    /// Wire the tracker over an explicit transport and connectivity source.
    ///
    /// Loads the transaction log from `settings.data_dir`.
    pub fn with_dependencies(
        settings: Settings,
        transport: Arc<dyn HttpTransport>,
        connectivity: Arc<dyn Connectivity>,
    ) -> Result<Self, CoreError> {
        let cache = CacheStore::new(settings.cache_dir());
        let ledger = HoldingsLedger::open(TransactionLogFile::new(settings.transaction_log_path()))?;

        let fetcher = Arc::new(RemoteFetcher::new(
            Arc::clone(&transport),
            connectivity,
            cache.clone(),
            settings.retry.clone(),
        ));

        let market_service = MarketService::new(
            MarketDataClient::new(Arc::clone(&fetcher)),
            NewsClient::new(
                Arc::clone(&fetcher),
                settings.api_key(NEWS_API_KEY).map(str::to_string),
            ),
        );

        let credentials = match (
            settings.api_key(THREE_COMMAS_KEY),
            settings.api_key(THREE_COMMAS_SECRET),
        ) {
            (Some(key), Some(secret)) => Some(ApiCredentials::new(key, secret)),
            _ => None,
        };
        let exchange = ExchangeAccountClient::new(Arc::clone(&transport), credentials);

        let poller = OrderBookPoller::new(
            Arc::new(OrderBookVenues::new_with_defaults(transport)),
            cache,
            Duration::from_secs(settings.order_book_poll_secs.max(1)),
        );

        Ok(Self {
            settings,
            ledger,
            fetcher,
            market_service,
            exchange,
            poller,
            analytics_service: AnalyticsService::new(),
            chart_service: ChartService::new(),
            insight_service: InsightService::new(),
        })
    }

    /// Replace the order book venues (e.g. to reorder or add exchanges).
    /// Stops any running poll.
    pub fn set_order_book_venues(&mut self, venues: OrderBookVenues) {
        self.poller.stop();
        self.poller = OrderBookPoller::new(
            Arc::new(venues),
            self.fetcher.cache().clone(),
            Duration::from_secs(self.settings.order_book_poll_secs.max(1)),
        );
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    // ── Transactions ────────────────────────────────────────────────

    pub fn add_transaction(&mut self, tx: Transaction) -> Result<Uuid, CoreError> {
        let id = tx.id;
        self.ledger.add_transaction(tx)?;
        Ok(id)
    }

    /// Import records synced from an exchange. All-or-nothing.
    pub fn add_transactions(&mut self, txs: Vec<Transaction>) -> Result<(), CoreError> {
        self.ledger.add_transactions(txs)
    }

    pub fn update_transaction(&mut self, old_id: Uuid, new: Transaction) -> Result<(), CoreError> {
        self.ledger.update_transaction(old_id, new)
    }

    pub fn delete_transaction(&mut self, id: Uuid) -> Result<Transaction, CoreError> {
        self.ledger.delete_transaction(id)
    }

    #[must_use]
    pub fn transactions(&self) -> &[Transaction] {
        self.ledger.transactions()
    }

    #[must_use]
    pub fn transactions_for(&self, symbol: &str) -> Vec<&Transaction> {
        self.ledger.transactions_for(symbol)
    }

    // ── Holdings ────────────────────────────────────────────────────

    #[must_use]
    pub fn holdings(&self) -> &[Holding] {
        self.ledger.holdings()
    }

    #[must_use]
    pub fn holding(&self, symbol: &str) -> Option<&Holding> {
        self.ledger.holding(symbol)
    }

    pub fn set_favorite(&mut self, symbol: &str, favorite: bool) {
        self.ledger.set_favorite(symbol, favorite);
    }

    /// Receive a holdings snapshot after every ledger change.
    pub fn subscribe_holdings(&mut self) -> mpsc::UnboundedReceiver<Vec<Holding>> {
        self.ledger.subscribe_channel()
    }

    #[must_use]
    pub fn ledger(&self) -> &HoldingsLedger {
        &self.ledger
    }

    // ── Analytics & Charts ──────────────────────────────────────────

    /// Value series for the configured number of history days ending `today`.
    pub fn history(&self, today: NaiveDate) -> Result<Vec<ChartPoint>, CoreError> {
        self.chart_service
            .history(self.ledger.transactions(), self.settings.history_days, today)
    }

    pub fn chart_series(
        &self,
        range: ChartRange,
        today: NaiveDate,
    ) -> Result<Vec<ChartPoint>, CoreError> {
        self.chart_service
            .series_for_range(self.ledger.transactions(), range, today)
    }

    pub fn summary(&self, today: NaiveDate) -> Result<PortfolioSummary, CoreError> {
        let history = self.history(today)?;
        Ok(self
            .analytics_service
            .summary(self.ledger.holdings(), &history, today))
    }

    /// Summary as of the current UTC date.
    pub fn summary_now(&self) -> Result<PortfolioSummary, CoreError> {
        self.summary(Utc::now().date_naive())
    }

    pub fn insight(&self, today: NaiveDate) -> Result<Insight, CoreError> {
        let summary = self.summary(today)?;
        Ok(self.insight_service.generate(&summary))
    }

    // ── Market data ─────────────────────────────────────────────────

    /// Pull current prices for held coins into the ledger.
    pub async fn refresh_prices(&mut self) -> Result<usize, CoreError> {
        let currency = self.settings.default_currency.clone();
        self.market_service
            .refresh_prices(&mut self.ledger, &currency)
            .await
    }

    pub async fn markets(&self, query: &MarketsQuery) -> Result<Vec<CoinMarket>, CoreError> {
        self.market_service.markets(query).await
    }

    pub async fn watchlist(&self, ids: &[String]) -> Result<Vec<CoinMarket>, CoreError> {
        self.market_service
            .watchlist(ids, &self.settings.default_currency)
            .await
    }

    pub async fn global_stats(&self) -> Result<GlobalMarketData, CoreError> {
        self.market_service.global_stats().await
    }

    pub async fn news(&self, query: &NewsQuery) -> Result<Vec<NewsArticle>, CoreError> {
        self.market_service.news(query).await
    }

    // ── Order book ──────────────────────────────────────────────────

    /// Start polling the order book for `symbol`. Needs a Tokio runtime.
    pub fn start_order_book(&mut self, symbol: &str) {
        self.poller.start(symbol);
    }

    pub fn stop_order_book(&mut self) {
        self.poller.stop();
    }

    pub fn subscribe_order_book(&self) -> watch::Receiver<OrderBookState> {
        self.poller.subscribe()
    }

    #[must_use]
    pub fn order_book_state(&self) -> OrderBookState {
        self.poller.state()
    }

    pub async fn refresh_order_book(&self) -> Result<(), CoreError> {
        self.poller.refresh().await
    }

    // ── Exchange accounts & bots ────────────────────────────────────

    pub async fn exchange_accounts(&self) -> Result<Vec<ExchangeAccount>, CoreError> {
        self.exchange.list_accounts().await
    }

    pub async fn account_balances(&self, account_id: u64) -> Result<Vec<AccountBalance>, CoreError> {
        self.exchange.list_balances(account_id).await
    }

    pub async fn create_bot(&self, config: &BotConfig) -> Result<Bot, CoreError> {
        self.exchange.create_bot(config).await
    }

    pub async fn cancel_bot(&self, bot_id: u64) -> Result<(), CoreError> {
        self.exchange.cancel_bot(bot_id).await
    }

    // ── Export / Cache ──────────────────────────────────────────────

    #[must_use]
    pub fn portfolio(&self) -> Portfolio {
        self.ledger.snapshot()
    }

    /// Holdings and transactions as pretty JSON.
    pub fn export_portfolio_json(&self) -> Result<String, CoreError> {
        serde_json::to_string_pretty(&self.ledger.snapshot())
            .map_err(|e| CoreError::Serialization(format!("Failed to serialize portfolio: {e}")))
    }

    /// Merge the transactions of an exported snapshot into the ledger.
    /// Holdings in the snapshot are ignored and re-derived. All-or-nothing;
    /// returns the number of transactions imported.
    pub fn import_portfolio_json(&mut self, json: &str) -> Result<usize, CoreError> {
        let portfolio: Portfolio = serde_json::from_str(json)
            .map_err(|e| CoreError::Deserialization(format!("Invalid portfolio export: {e}")))?;
        let count = portfolio.transactions.len();
        self.ledger.add_transactions(portfolio.transactions)?;
        Ok(count)
    }

    /// Drop every cached market response and order book.
    pub fn clear_cache(&self) -> Result<usize, CoreError> {
        self.fetcher.cache().clear()
    }
}
