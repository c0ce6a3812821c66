// ═══════════════════════════════════════════════════════════════════
// Fetcher Tests — offline cache, retry/backoff, bad responses,
// write-through caching
// ═══════════════════════════════════════════════════════════════════

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crypto_portfolio_core::errors::CoreError;
use crypto_portfolio_core::net::connectivity::{AlwaysOnline, ConnectivityFlag};
use crypto_portfolio_core::net::fetcher::{Endpoint, RemoteFetcher};
use crypto_portfolio_core::net::retry::RetryPolicy;
use crypto_portfolio_core::net::transport::{HttpRequest, HttpResponse, HttpTransport};
use crypto_portfolio_core::storage::cache::CacheStore;

// ═══════════════════════════════════════════════════════════════════
// Mock Transport
// ═══════════════════════════════════════════════════════════════════

/// Plays back scripted outcomes in order; errors once the script runs out.
struct ScriptedTransport {
    script: Mutex<VecDeque<Result<HttpResponse, CoreError>>>,
    calls: AtomicUsize,
}

impl ScriptedTransport {
    fn new(script: Vec<Result<HttpResponse, CoreError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, _request: &HttpRequest) -> Result<HttpResponse, CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(CoreError::Network("script exhausted".into())))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Stats {
    markets: u32,
}

fn ok(markets: u32) -> Result<HttpResponse, CoreError> {
    Ok(HttpResponse::new(200, format!(r#"{{"markets":{markets}}}"#)))
}

fn timeout() -> Result<HttpResponse, CoreError> {
    Err(CoreError::TransientNetwork("timed out".into()))
}

fn endpoint() -> Endpoint {
    Endpoint::new(
        "TestProvider",
        HttpRequest::get("https://example.test/global"),
        "global_market",
    )
}

fn fetcher_with(
    transport: Arc<ScriptedTransport>,
    online: bool,
    cache: CacheStore,
) -> RemoteFetcher {
    RemoteFetcher::new(
        transport,
        Arc::new(ConnectivityFlag::new(online)),
        cache,
        RetryPolicy::default(),
    )
}

// ═══════════════════════════════════════════════════════════════════
// Offline behavior
// ═══════════════════════════════════════════════════════════════════

mod offline {
    use super::*;

    #[tokio::test]
    async fn serves_cache_without_http_call() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheStore::new(dir.path());
        cache.save("global_market", &Stats { markets: 7 }).unwrap();

        let transport = ScriptedTransport::new(vec![ok(99)]);
        let fetcher = fetcher_with(Arc::clone(&transport), false, cache);

        let stats: Stats = fetcher.fetch(&endpoint()).await.unwrap();
        assert_eq!(stats, Stats { markets: 7 });
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn cache_miss_is_offline_error() {
        let dir = tempfile::tempdir().unwrap();
        let transport = ScriptedTransport::new(vec![ok(1)]);
        let fetcher = fetcher_with(Arc::clone(&transport), false, CacheStore::new(dir.path()));

        let err = fetcher.fetch::<Stats>(&endpoint()).await.unwrap_err();
        assert!(matches!(err, CoreError::Offline));
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn connectivity_flag_can_be_flipped() {
        let dir = tempfile::tempdir().unwrap();
        let transport = ScriptedTransport::new(vec![ok(3)]);
        let flag = Arc::new(ConnectivityFlag::new(false));
        let fetcher = RemoteFetcher::new(
            transport.clone(),
            flag.clone(),
            CacheStore::new(dir.path()),
            RetryPolicy::default(),
        );

        assert!(fetcher.fetch::<Stats>(&endpoint()).await.is_err());
        flag.set_online(true);
        let stats: Stats = fetcher.fetch(&endpoint()).await.unwrap();
        assert_eq!(stats.markets, 3);
        assert_eq!(transport.calls(), 1);
    }
}

// ═══════════════════════════════════════════════════════════════════
// Online success
// ═══════════════════════════════════════════════════════════════════

mod online {
    use super::*;

    #[tokio::test]
    async fn success_writes_through_to_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheStore::new(dir.path());
        let transport = ScriptedTransport::new(vec![ok(42)]);
        let fetcher = fetcher_with(Arc::clone(&transport), true, cache.clone());

        let stats: Stats = fetcher.fetch(&endpoint()).await.unwrap();
        assert_eq!(stats.markets, 42);
        assert_eq!(cache.load::<Stats>("global_market").unwrap(), Some(Stats { markets: 42 }));
    }

    #[tokio::test]
    async fn success_overwrites_existing_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheStore::new(dir.path());
        cache.save("global_market", &Stats { markets: 1 }).unwrap();
        let transport = ScriptedTransport::new(vec![ok(2)]);
        let fetcher = fetcher_with(transport, true, cache.clone());

        let stats: Stats = fetcher.fetch(&endpoint()).await.unwrap();
        assert_eq!(stats.markets, 2);
        assert_eq!(cache.load::<Stats>("global_market").unwrap(), Some(Stats { markets: 2 }));
    }

    #[tokio::test]
    async fn online_prefers_network_over_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheStore::new(dir.path());
        cache.save("global_market", &Stats { markets: 1 }).unwrap();
        let transport = ScriptedTransport::new(vec![ok(5)]);
        let fetcher = RemoteFetcher::new(
            transport.clone(),
            Arc::new(AlwaysOnline),
            cache,
            RetryPolicy::default(),
        );

        let stats: Stats = fetcher.fetch(&endpoint()).await.unwrap();
        assert_eq!(stats.markets, 5);
        assert_eq!(transport.calls(), 1);
    }
}

// ═══════════════════════════════════════════════════════════════════
// Retry and backoff
// ═══════════════════════════════════════════════════════════════════

mod retry {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn two_transient_failures_then_success() {
        let dir = tempfile::tempdir().unwrap();
        let transport = ScriptedTransport::new(vec![timeout(), timeout(), ok(8)]);
        let fetcher = fetcher_with(Arc::clone(&transport), true, CacheStore::new(dir.path()));

        let started = tokio::time::Instant::now();
        let stats: Stats = fetcher.fetch(&endpoint()).await.unwrap();

        assert_eq!(stats.markets, 8);
        assert_eq!(transport.calls(), 3);
        // 0.5s + 1.0s of backoff, nothing else
        assert_eq!(started.elapsed(), Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_fall_back_to_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheStore::new(dir.path());
        cache.save("global_market", &Stats { markets: 11 }).unwrap();
        let transport = ScriptedTransport::new(vec![timeout(), timeout(), timeout(), ok(1)]);
        let fetcher = fetcher_with(Arc::clone(&transport), true, cache);

        let stats: Stats = fetcher.fetch(&endpoint()).await.unwrap();
        assert_eq!(stats.markets, 11);
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_without_cache_surface_last_error() {
        let dir = tempfile::tempdir().unwrap();
        let transport = ScriptedTransport::new(vec![timeout(), timeout(), timeout()]);
        let fetcher = fetcher_with(Arc::clone(&transport), true, CacheStore::new(dir.path()));

        let err = fetcher.fetch::<Stats>(&endpoint()).await.unwrap_err();
        assert!(matches!(err, CoreError::TransientNetwork(_)));
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn non_transient_network_error_is_not_retried() {
        let dir = tempfile::tempdir().unwrap();
        let transport = ScriptedTransport::new(vec![
            Err(CoreError::Network("certificate invalid".into())),
            ok(1),
        ]);
        let fetcher = fetcher_with(Arc::clone(&transport), true, CacheStore::new(dir.path()));

        let err = fetcher.fetch::<Stats>(&endpoint()).await.unwrap_err();
        assert!(matches!(err, CoreError::Network(_)));
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn custom_policy_without_retries() {
        let dir = tempfile::tempdir().unwrap();
        let transport = ScriptedTransport::new(vec![timeout(), ok(1)]);
        let fetcher = RemoteFetcher::new(
            transport.clone(),
            Arc::new(AlwaysOnline),
            CacheStore::new(dir.path()),
            RetryPolicy::none(),
        );

        assert!(fetcher.fetch::<Stats>(&endpoint()).await.is_err());
        assert_eq!(transport.calls(), 1);
    }
}

// ═══════════════════════════════════════════════════════════════════
// Bad responses
// ═══════════════════════════════════════════════════════════════════

mod bad_response {
    use super::*;

    #[tokio::test]
    async fn non_2xx_fails_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let transport = ScriptedTransport::new(vec![Ok(HttpResponse::new(503, "busy")), ok(1)]);
        let fetcher = fetcher_with(Arc::clone(&transport), true, CacheStore::new(dir.path()));

        let err = fetcher.fetch::<Stats>(&endpoint()).await.unwrap_err();
        match err {
            CoreError::BadResponse { provider, message } => {
                assert_eq!(provider, "TestProvider");
                assert!(message.contains("503"));
            }
            other => panic!("expected BadResponse, got {other:?}"),
        }
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn undecodable_body_fails_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let transport = ScriptedTransport::new(vec![Ok(HttpResponse::new(200, "<html>"))]);
        let fetcher = fetcher_with(Arc::clone(&transport), true, CacheStore::new(dir.path()));

        let err = fetcher.fetch::<Stats>(&endpoint()).await.unwrap_err();
        assert!(matches!(err, CoreError::BadResponse { .. }));
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn bad_response_does_not_touch_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheStore::new(dir.path());
        cache.save("global_market", &Stats { markets: 4 }).unwrap();
        let transport = ScriptedTransport::new(vec![Ok(HttpResponse::new(500, ""))]);
        let fetcher = fetcher_with(transport, true, cache.clone());

        assert!(fetcher.fetch::<Stats>(&endpoint()).await.is_err());
        assert_eq!(cache.load::<Stats>("global_market").unwrap(), Some(Stats { markets: 4 }));
    }

    fn no_empty_markets(stats: &Stats) -> Result<(), CoreError> {
        if stats.markets == 0 {
            return Err(CoreError::Api {
                provider: "TestProvider".into(),
                message: "empty result".into(),
            });
        }
        Ok(())
    }

    #[tokio::test]
    async fn rejected_body_keeps_last_good_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheStore::new(dir.path());
        let flag = Arc::new(ConnectivityFlag::new(true));
        let transport = ScriptedTransport::new(vec![ok(6), ok(0), ok(9)]);
        let fetcher = RemoteFetcher::new(
            transport.clone(),
            flag.clone(),
            cache.clone(),
            RetryPolicy::default(),
        );

        let first: Stats = fetcher.fetch_checked(&endpoint(), no_empty_markets).await.unwrap();
        assert_eq!(first.markets, 6);

        let err = fetcher
            .fetch_checked::<Stats, _>(&endpoint(), no_empty_markets)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Api { .. }));
        assert_eq!(transport.calls(), 2);
        assert_eq!(cache.load::<Stats>("global_market").unwrap(), Some(Stats { markets: 6 }));

        flag.set_online(false);
        let offline: Stats = fetcher.fetch_checked(&endpoint(), no_empty_markets).await.unwrap();
        assert_eq!(offline.markets, 6);
    }
}
