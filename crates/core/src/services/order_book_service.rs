use chrono::Utc;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::errors::CoreError;
use crate::models::order_book::{OrderBook, OrderBookState, PollerStatus};
use crate::providers::registry::OrderBookVenues;
use crate::storage::cache::CacheStore;

/// Cache key holding the last good book for a symbol.
pub fn cache_key_for(symbol: &str) -> String {
    format!("orderbook_{}", symbol.trim().to_uppercase())
}

/// State shared between the poller handle and its background task.
struct PollerShared {
    venues: Arc<OrderBookVenues>,
    cache: CacheStore,
    state: watch::Sender<OrderBookState>,
    /// Bumped on every start/stop; results from older generations are dropped.
    generation: AtomicU64,
}

impl PollerShared {
    async fn tick(&self, symbol: &str, generation: u64) -> Result<(), CoreError> {
        let result = self.venues.fetch(symbol).await;

        match result {
            Ok((source, book)) => {
                let applied = self.state.send_if_modified(|state| {
                    if self.generation.load(Ordering::SeqCst) != generation {
                        return false;
                    }
                    state.book = book.clone();
                    state.source = Some(source.clone());
                    state.error = None;
                    state.updated_at = Some(Utc::now());
                    true
                });
                if !applied {
                    debug!(symbol, "discarding order book for a stale poll");
                    return Ok(());
                }
                if let Err(e) = self.cache.save(&cache_key_for(symbol), &book) {
                    warn!(symbol, error = %e, "failed to cache order book");
                }
                Ok(())
            }
            Err(e) => {
                let message = e.to_string();
                self.state.send_if_modified(|state| {
                    if self.generation.load(Ordering::SeqCst) != generation {
                        return false;
                    }
                    state.error = Some(message);
                    true
                });
                Err(e)
            }
        }
    }
}

/// Keeps a near-real-time order book for one symbol.
///
/// `Idle → Polling(symbol) → Idle`. While polling, a background task
/// fetches immediately and then every `interval`, trying each venue in
/// order. A successful tick swaps both sides at once; a failed tick only
/// records the error, so consumers always see the last valid book.
pub struct OrderBookPoller {
    shared: Arc<PollerShared>,
    interval: Duration,
    task: Option<JoinHandle<()>>,
}

impl OrderBookPoller {
    pub fn new(venues: Arc<OrderBookVenues>, cache: CacheStore, interval: Duration) -> Self {
        let (state, _) = watch::channel(OrderBookState::default());
        Self {
            shared: Arc::new(PollerShared {
                venues,
                cache,
                state,
                generation: AtomicU64::new(0),
            }),
            interval,
            task: None,
        }
    }

    /// Receive every published state change.
    pub fn subscribe(&self) -> watch::Receiver<OrderBookState> {
        self.shared.state.subscribe()
    }

    /// Current state snapshot.
    pub fn state(&self) -> OrderBookState {
        self.shared.state.borrow().clone()
    }

    pub fn current_symbol(&self) -> Option<String> {
        match &self.shared.state.borrow().status {
            PollerStatus::Polling { symbol } => Some(symbol.clone()),
            PollerStatus::Idle => None,
        }
    }

    pub fn is_polling(&self) -> bool {
        self.task.is_some()
    }

    /// Start polling `symbol`, replacing any running loop.
    ///
    /// The cached book for the symbol (if any) is published before this
    /// returns. Must be called from within a Tokio runtime.
    pub fn start(&mut self, symbol: &str) {
        self.abort_task();
        let symbol = symbol.trim().to_uppercase();
        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let cached: OrderBook = match self.shared.cache.load(&cache_key_for(&symbol)) {
            Ok(book) => book.unwrap_or_default(),
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "unreadable cached order book");
                OrderBook::default()
            }
        };

        self.shared.state.send_replace(OrderBookState {
            status: PollerStatus::Polling {
                symbol: symbol.clone(),
            },
            book: cached,
            source: None,
            error: None,
            updated_at: None,
        });

        info!(symbol = %symbol, interval_ms = self.interval.as_millis() as u64, "order book polling started");

        let shared = Arc::clone(&self.shared);
        let period = self.interval;
        self.task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                // Errors are already recorded in the state.
                let _ = shared.tick(&symbol, generation).await;
            }
        }));
    }

    /// Stop polling. The last book stays visible; status becomes `Idle`.
    pub fn stop(&mut self) {
        self.abort_task();
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        self.shared.state.send_modify(|state| state.status = PollerStatus::Idle);
        info!("order book polling stopped");
    }

    /// Run one fetch for the current symbol outside the timer.
    ///
    /// The symbol is captured when this is called; the returned future does
    /// not borrow the poller, so it can be spawned. If the poller is
    /// restarted or stopped before the fetch lands, the result is dropped.
    pub fn refresh(&self) -> impl Future<Output = Result<(), CoreError>> + Send + 'static {
        let shared = Arc::clone(&self.shared);
        let target = self
            .current_symbol()
            .map(|symbol| (symbol, shared.generation.load(Ordering::SeqCst)));
        async move {
            let (symbol, generation) = target
                .ok_or_else(|| CoreError::ValidationError("Order book poller is idle".into()))?;
            shared.tick(&symbol, generation).await
        }
    }

    fn abort_task(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for OrderBookPoller {
    fn drop(&mut self) {
        self.abort_task();
    }
}
