// ═══════════════════════════════════════════════════════════════════
// Integration Tests — PortfolioTracker facade over a routed mock
// transport and a temporary data directory
// ═══════════════════════════════════════════════════════════════════

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use std::sync::{Arc, Mutex};

use crypto_portfolio_core::errors::CoreError;
use crypto_portfolio_core::models::chart::ChartRange;
use crypto_portfolio_core::models::order_book::PollerStatus;
use crypto_portfolio_core::models::settings::{Settings, NEWS_API_KEY};
use crypto_portfolio_core::models::transaction::Transaction;
use crypto_portfolio_core::net::connectivity::ConnectivityFlag;
use crypto_portfolio_core::net::retry::RetryPolicy;
use crypto_portfolio_core::net::transport::{HttpRequest, HttpResponse, HttpTransport};
use crypto_portfolio_core::providers::coingecko::MarketsQuery;
use crypto_portfolio_core::providers::news::NewsQuery;
use crypto_portfolio_core::PortfolioTracker;

// ═══════════════════════════════════════════════════════════════════
// Mock Transport
// ═══════════════════════════════════════════════════════════════════

const MARKETS: &str = r#"[
    {"id":"bitcoin","symbol":"btc","name":"Bitcoin","current_price":15000.0,"price_change_percentage_24h":2.0},
    {"id":"ethereum","symbol":"eth","name":"Ethereum","current_price":1000.0,"price_change_percentage_24h":-1.0}
]"#;

const GLOBAL: &str = r#"{"data":{"active_cryptocurrencies":100,"markets":10}}"#;

const DEPTH: &str = r#"{"bids":[["14999.00","1.0"]],"asks":[["15001.00","2.0"]]}"#;

const NEWS: &str = r#"{"status":"ok","totalResults":1,"articles":[{"title":"Markets calm","url":"https://news.test/a"}]}"#;

/// Routes by URL fragment; anything unrouted fails as non-transient.
struct MockMarket {
    routes: Vec<(&'static str, &'static str)>,
    seen: Mutex<Vec<String>>,
}

impl MockMarket {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            routes: vec![
                ("/coins/markets", MARKETS),
                ("/global", GLOBAL),
                ("/depth", DEPTH),
                ("/everything", NEWS),
            ],
            seen: Mutex::new(Vec::new()),
        })
    }

    fn calls_to(&self, fragment: &str) -> usize {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .filter(|url| url.contains(fragment))
            .count()
    }
}

#[async_trait]
impl HttpTransport for MockMarket {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, CoreError> {
        self.seen.lock().unwrap().push(request.url.clone());
        self.routes
            .iter()
            .find(|(fragment, _)| request.url.contains(fragment))
            .map(|(_, body)| HttpResponse::new(200, *body))
            .ok_or_else(|| CoreError::Network(format!("unrouted: {}", request.url)))
    }
}

struct Fixture {
    _dir: tempfile::TempDir,
    settings: Settings,
    transport: Arc<MockMarket>,
    online: Arc<ConnectivityFlag>,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            data_dir: dir.path().to_path_buf(),
            retry: RetryPolicy::none(),
            ..Settings::default()
        };
        Self {
            _dir: dir,
            settings,
            transport: MockMarket::new(),
            online: Arc::new(ConnectivityFlag::new(true)),
        }
    }

    fn tracker(&self) -> PortfolioTracker {
        PortfolioTracker::with_dependencies(
            self.settings.clone(),
            self.transport.clone(),
            self.online.clone(),
        )
        .unwrap()
    }
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 10).unwrap()
}

fn seed(tracker: &mut PortfolioTracker) {
    let at = |d| Utc.with_ymd_and_hms(2025, 1, d, 9, 30, 0).unwrap();
    tracker.add_transaction(Transaction::buy("BTC", 1.0, 10_000.0, at(1))).unwrap();
    tracker.add_transaction(Transaction::buy("btc", 1.0, 20_000.0, at(2))).unwrap();
    tracker.add_transaction(Transaction::sell("BTC", 0.5, 18_000.0, at(3))).unwrap();
}

// ═══════════════════════════════════════════════════════════════════
// Portfolio lifecycle
// ═══════════════════════════════════════════════════════════════════

mod portfolio {
    use super::*;

    #[tokio::test]
    async fn prices_flow_into_summary() {
        let fx = Fixture::new();
        let mut tracker = fx.tracker();
        seed(&mut tracker);

        let priced = tracker.refresh_prices().await.unwrap();
        assert_eq!(priced, 1);

        let btc = tracker.holding("BTC").unwrap();
        assert_eq!(btc.current_price, 15_000.0);
        assert_eq!(btc.daily_change_percent, 2.0);

        let summary = tracker.summary(today()).unwrap();
        assert!((summary.total_value - 22_500.0).abs() < 1e-6);
        assert!(summary.unrealized_pl.abs() < 1e-6);
        assert!(summary.daily_change_percent.abs() < 1e-6);
        assert_eq!(summary.allocation.len(), 1);
        assert!((summary.allocation[0].percentage - 100.0).abs() < 1e-6);

        assert_eq!(tracker.insight(today()).unwrap().headline, "Tip");
    }

    #[tokio::test]
    async fn history_follows_settings_and_ranges() {
        let fx = Fixture::new();
        let mut tracker = fx.tracker();
        seed(&mut tracker);

        let history = tracker.history(today()).unwrap();
        assert_eq!(history.len(), 30);
        assert_eq!(history.last().map(|p| p.date), Some(today()));
        assert!((history.last().unwrap().value - 22_500.0).abs() < 1e-6);

        let all = tracker.chart_series(ChartRange::All, today()).unwrap();
        assert_eq!(all.len(), 10);
        assert_eq!(tracker.chart_series(ChartRange::Week, today()).unwrap().len(), 7);
    }

    #[test]
    fn log_survives_restart() {
        let fx = Fixture::new();
        {
            let mut tracker = fx.tracker();
            seed(&mut tracker);
            tracker.set_favorite("BTC", true);
        }

        let tracker = fx.tracker();
        assert_eq!(tracker.transactions().len(), 3);
        let btc = tracker.holding("BTC").unwrap();
        assert!((btc.quantity - 1.5).abs() < 1e-9);
        assert!((btc.average_cost_basis - 15_000.0).abs() < 1e-6);
        assert_eq!(tracker.transactions_for("BTC").len(), 3);
    }

    #[test]
    fn subscribers_see_every_change() {
        let fx = Fixture::new();
        let mut tracker = fx.tracker();
        let mut rx = tracker.subscribe_holdings();
        seed(&mut tracker);

        let mut snapshots = Vec::new();
        while let Ok(snapshot) = rx.try_recv() {
            snapshots.push(snapshot);
        }
        assert_eq!(snapshots.len(), 3);
        assert!((snapshots[2][0].quantity - 1.5).abs() < 1e-9);
    }

    #[test]
    fn edits_and_deletes_go_through_the_ledger() {
        let fx = Fixture::new();
        let mut tracker = fx.tracker();
        let at = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let id = tracker.add_transaction(Transaction::buy("ETH", 2.0, 1_000.0, at)).unwrap();

        tracker
            .update_transaction(id, Transaction::buy("ETH", 3.0, 1_000.0, at).with_id(id))
            .unwrap();
        assert!((tracker.holding("ETH").unwrap().quantity - 3.0).abs() < 1e-9);

        tracker.delete_transaction(id).unwrap();
        assert!(tracker.holdings().is_empty());
        assert!(tracker.portfolio().is_empty());
    }

    #[test]
    fn synced_import_is_read_only() {
        let fx = Fixture::new();
        let mut tracker = fx.tracker();
        let at = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let synced = Transaction::synced("SOL", 10.0, 100.0, at, true);
        let id = synced.id;
        tracker.add_transactions(vec![synced]).unwrap();

        assert!(matches!(
            tracker.delete_transaction(id),
            Err(CoreError::InvalidEdit(_))
        ));
    }

    #[test]
    fn export_is_pretty_json() {
        let fx = Fixture::new();
        let mut tracker = fx.tracker();
        seed(&mut tracker);

        let json = tracker.export_portfolio_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["transactions"].as_array().map(Vec::len), Some(3));
        assert_eq!(value["holdings"][0]["coin_symbol"], "BTC");
        assert!(json.contains('\n'));
    }

    #[test]
    fn export_then_import_into_a_fresh_install() {
        let source = Fixture::new();
        let mut tracker = source.tracker();
        seed(&mut tracker);
        let json = tracker.export_portfolio_json().unwrap();

        let target = Fixture::new();
        let mut fresh = target.tracker();
        assert_eq!(fresh.import_portfolio_json(&json).unwrap(), 3);
        assert_eq!(fresh.holdings(), tracker.holdings());

        // same ids again: rejected as a whole
        assert!(fresh.import_portfolio_json(&json).is_err());
        assert_eq!(fresh.transactions().len(), 3);
        assert!(matches!(
            fresh.import_portfolio_json("not json"),
            Err(CoreError::Deserialization(_))
        ));
    }
}

// ═══════════════════════════════════════════════════════════════════
// Market data and offline behavior
// ═══════════════════════════════════════════════════════════════════

mod market_data {
    use super::*;

    #[tokio::test]
    async fn offline_serves_last_known_markets() {
        let fx = Fixture::new();
        let tracker = fx.tracker();

        let online = tracker.markets(&MarketsQuery::default()).await.unwrap();
        assert_eq!(fx.transport.calls_to("/coins/markets"), 1);

        fx.online.set_online(false);
        let offline = tracker.markets(&MarketsQuery::default()).await.unwrap();
        assert_eq!(offline, online);
        assert_eq!(fx.transport.calls_to("/coins/markets"), 1);
    }

    #[tokio::test]
    async fn offline_without_cache_is_an_error() {
        let fx = Fixture::new();
        fx.online.set_online(false);
        let tracker = fx.tracker();

        assert!(matches!(tracker.global_stats().await, Err(CoreError::Offline)));
        assert!(fx.transport.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn clear_cache_forgets_responses() {
        let fx = Fixture::new();
        let tracker = fx.tracker();
        tracker.global_stats().await.unwrap();
        tracker.markets(&MarketsQuery::default()).await.unwrap();

        assert_eq!(tracker.clear_cache().unwrap(), 2);

        fx.online.set_online(false);
        assert!(matches!(tracker.global_stats().await, Err(CoreError::Offline)));
    }

    #[tokio::test]
    async fn news_needs_a_key() {
        let mut fx = Fixture::new();
        assert!(matches!(
            fx.tracker().news(&NewsQuery::default()).await,
            Err(CoreError::MissingCredentials(_))
        ));

        fx.settings.api_keys.insert(NEWS_API_KEY.to_string(), "k".to_string());
        let articles = fx.tracker().news(&NewsQuery::default()).await.unwrap();
        assert_eq!(articles[0].title, "Markets calm");
    }

    #[tokio::test]
    async fn exchange_calls_need_credentials() {
        let fx = Fixture::new();
        let tracker = fx.tracker();
        assert!(matches!(
            tracker.exchange_accounts().await,
            Err(CoreError::MissingCredentials(_))
        ));
        assert!(matches!(
            tracker.cancel_bot(1).await,
            Err(CoreError::MissingCredentials(_))
        ));
    }
}

// ═══════════════════════════════════════════════════════════════════
// Order book
// ═══════════════════════════════════════════════════════════════════

mod order_book {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn polls_primary_venue_and_stops() {
        let fx = Fixture::new();
        let mut tracker = fx.tracker();

        tracker.start_order_book("btc");
        let mut rx = tracker.subscribe_order_book();
        rx.changed().await.unwrap();

        let state = tracker.order_book_state();
        assert_eq!(state.status, PollerStatus::Polling { symbol: "BTC".into() });
        assert_eq!(state.source.as_deref(), Some("Binance"));
        assert_eq!(state.book.spread(), Some(2.0));
        assert_eq!(fx.transport.calls_to("/depth"), 1);

        tracker.refresh_order_book().await.unwrap();
        assert_eq!(fx.transport.calls_to("/depth"), 2);

        tracker.stop_order_book();
        assert_eq!(tracker.order_book_state().status, PollerStatus::Idle);
        assert!(tracker.refresh_order_book().await.is_err());
    }
}

// ═══════════════════════════════════════════════════════════════════
// Logging
// ═══════════════════════════════════════════════════════════════════

mod logging {
    use crypto_portfolio_core::logging::init_tracing;

    #[test]
    fn subscriber_installs_once() {
        let _ = init_tracing("crypto_portfolio_core=debug");
        assert!(!init_tracing("crypto_portfolio_core=debug"));
    }
}
