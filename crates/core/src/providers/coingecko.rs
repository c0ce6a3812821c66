use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::errors::CoreError;
use crate::models::market::{CoinMarket, GlobalMarketData, GlobalMarketResponse};
use crate::net::fetcher::{Endpoint, RemoteFetcher};
use crate::net::transport::HttpRequest;

const BASE_URL: &str = "https://api.coingecko.com/api/v3";
const PROVIDER: &str = "CoinGecko";

/// Id lists longer than this are hashed to keep cache file names short.
const MAX_INLINE_IDS_LEN: usize = 96;

/// Cache key for a watchlist: currency plus the sorted, de-duplicated ids,
/// so the same set in any order shares one entry and different sets never
/// collide.
pub fn watchlist_cache_key(ids: &[String], vs_currency: &str) -> String {
    let mut ids: Vec<String> = ids.iter().map(|id| id.trim().to_lowercase()).collect();
    ids.sort();
    ids.dedup();
    let joined = ids.join(".");
    let suffix = if joined.len() <= MAX_INLINE_IDS_LEN {
        joined
    } else {
        hex::encode(&Sha256::digest(joined.as_bytes())[..16])
    };
    format!("watchlist_{}_{suffix}", vs_currency.to_lowercase())
}

/// Parameters of the coin markets list.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketsQuery {
    /// Quote currency, e.g. "usd"
    pub vs_currency: String,
    /// e.g. "market_cap_desc"
    pub order: String,
    pub per_page: u32,
    /// 1-based
    pub page: u32,
    pub sparkline: bool,
    /// Change windows, e.g. ["1h", "24h", "7d"]
    pub price_change_percentage: Vec<String>,
}

impl Default for MarketsQuery {
    fn default() -> Self {
        Self {
            vs_currency: "usd".to_string(),
            order: "market_cap_desc".to_string(),
            per_page: 100,
            page: 1,
            sparkline: true,
            price_change_percentage: vec!["1h".into(), "24h".into(), "7d".into()],
        }
    }
}

impl MarketsQuery {
    pub fn for_currency(currency: &str) -> Self {
        Self {
            vs_currency: currency.to_lowercase(),
            ..Self::default()
        }
    }
}

/// Market data provider (CoinGecko public API).
///
/// - **Free**: no API key required for the public tier.
/// - **Endpoints**: `/global`, `/coins/markets`.
///
/// Every call goes through [`RemoteFetcher`], so results are cached under a
/// fixed key per endpoint and served from there when offline.
pub struct MarketDataClient {
    fetcher: Arc<RemoteFetcher>,
    base_url: String,
}

impl MarketDataClient {
    pub fn new(fetcher: Arc<RemoteFetcher>) -> Self {
        Self {
            fetcher,
            base_url: BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Global market statistics (total cap, volume, dominance).
    pub async fn global_stats(&self) -> Result<GlobalMarketData, CoreError> {
        let endpoint = Endpoint::new(
            PROVIDER,
            HttpRequest::get(format!("{}/global", self.base_url)),
            "global_market",
        );
        let resp: GlobalMarketResponse = self.fetcher.fetch(&endpoint).await?;
        Ok(resp.data)
    }

    /// One page of the coin markets list.
    pub async fn coin_markets(&self, query: &MarketsQuery) -> Result<Vec<CoinMarket>, CoreError> {
        let endpoint = Endpoint::new(
            PROVIDER,
            self.markets_request(query),
            format!("coin_markets_{}_{}", query.vs_currency, query.page),
        );
        self.fetcher.fetch(&endpoint).await
    }

    /// The markets list restricted to the given coin ids (a watchlist).
    pub async fn watchlist(
        &self,
        ids: &[String],
        vs_currency: &str,
    ) -> Result<Vec<CoinMarket>, CoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = MarketsQuery {
            per_page: ids.len() as u32,
            ..MarketsQuery::for_currency(vs_currency)
        };
        let request = self.markets_request(&query).query("ids", ids.join(","));
        let endpoint = Endpoint::new(PROVIDER, request, watchlist_cache_key(ids, vs_currency));
        self.fetcher.fetch(&endpoint).await
    }

    fn markets_request(&self, query: &MarketsQuery) -> HttpRequest {
        let mut request = HttpRequest::get(format!("{}/coins/markets", self.base_url))
            .query("vs_currency", &query.vs_currency)
            .query("order", &query.order)
            .query("per_page", query.per_page.to_string())
            .query("page", query.page.to_string())
            .query("sparkline", query.sparkline.to_string());
        if !query.price_change_percentage.is_empty() {
            request = request.query(
                "price_change_percentage",
                query.price_change_percentage.join(","),
            );
        }
        request
    }
}
