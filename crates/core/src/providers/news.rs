use std::sync::Arc;

use crate::errors::CoreError;
use crate::models::market::{NewsArticle, NewsResponse};
use crate::net::fetcher::{Endpoint, RemoteFetcher};
use crate::net::transport::HttpRequest;

const BASE_URL: &str = "https://newsapi.org/v2";
const PROVIDER: &str = "NewsAPI";

#[derive(Debug, Clone, PartialEq)]
pub struct NewsQuery {
    /// Free-text search term
    pub query: String,
    /// ISO 639-1 code, e.g. "en"
    pub language: String,
    pub page_size: u32,
}

impl Default for NewsQuery {
    fn default() -> Self {
        Self {
            query: "cryptocurrency".to_string(),
            language: "en".to_string(),
            page_size: 20,
        }
    }
}

/// News headlines provider. Requires an API key sent as `X-Api-Key`.
pub struct NewsClient {
    fetcher: Arc<RemoteFetcher>,
    api_key: Option<String>,
    base_url: String,
}

impl NewsClient {
    pub fn new(fetcher: Arc<RemoteFetcher>, api_key: Option<String>) -> Self {
        Self {
            fetcher,
            api_key,
            base_url: BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Latest articles matching the query, newest first.
    pub async fn top_headlines(&self, query: &NewsQuery) -> Result<Vec<NewsArticle>, CoreError> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| CoreError::MissingCredentials(PROVIDER.into()))?;

        let request = HttpRequest::get(format!("{}/everything", self.base_url))
            .query("q", &query.query)
            .query("language", &query.language)
            .query("pageSize", query.page_size.to_string())
            .query("sortBy", "publishedAt")
            .header("X-Api-Key", api_key);

        let cache_key = format!("news_{}_{}", query.language, query.query.to_lowercase());
        let resp: NewsResponse = self
            .fetcher
            .fetch_checked(&Endpoint::new(PROVIDER, request, cache_key), check_envelope)
            .await?;

        Ok(resp.articles)
    }
}

/// NewsAPI reports failures as `{"status":"error",...}`, sometimes with a 2xx.
fn check_envelope(resp: &NewsResponse) -> Result<(), CoreError> {
    if resp.status == "ok" {
        return Ok(());
    }
    Err(CoreError::Api {
        provider: PROVIDER.into(),
        message: resp
            .message
            .clone()
            .or_else(|| resp.code.clone())
            .unwrap_or_else(|| format!("status {}", resp.status)),
    })
}
