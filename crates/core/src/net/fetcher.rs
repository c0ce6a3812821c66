use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::errors::CoreError;
use crate::storage::cache::CacheStore;

use super::connectivity::Connectivity;
use super::retry::RetryPolicy;
use super::transport::{HttpRequest, HttpTransport};

/// A cacheable remote resource: the request plus the fixed cache key it
/// is stored under.
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    /// Provider name, used in errors and logs
    pub provider: String,
    pub request: HttpRequest,
    pub cache_key: String,
}

impl Endpoint {
    pub fn new(
        provider: impl Into<String>,
        request: HttpRequest,
        cache_key: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            request,
            cache_key: cache_key.into(),
        }
    }
}

/// Fetches JSON resources with retry and a last-known-good cache fallback.
///
/// - Offline: serve from cache without touching the network, or fail with
///   [`CoreError::Offline`].
/// - Success: decode, overwrite the cache entry, return.
/// - Transient failure: retry with exponential backoff, then fall back to
///   the cache, else surface the last error.
/// - Non-2xx or undecodable body: [`CoreError::BadResponse`], no retry.
/// - Body rejected by the caller's check ([`RemoteFetcher::fetch_checked`]):
///   that error, no retry, and the cache keeps its last good entry.
pub struct RemoteFetcher {
    transport: Arc<dyn HttpTransport>,
    connectivity: Arc<dyn Connectivity>,
    cache: CacheStore,
    retry: RetryPolicy,
}

impl RemoteFetcher {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        connectivity: Arc<dyn Connectivity>,
        cache: CacheStore,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            connectivity,
            cache,
            retry,
        }
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub fn transport(&self) -> Arc<dyn HttpTransport> {
        Arc::clone(&self.transport)
    }

    pub fn is_online(&self) -> bool {
        self.connectivity.is_online()
    }

    pub async fn fetch<T>(&self, endpoint: &Endpoint) -> Result<T, CoreError>
    where
        T: DeserializeOwned + Serialize,
    {
        self.fetch_checked(endpoint, |_: &T| Ok(())).await
    }

    /// Like [`fetch`](Self::fetch), but a decoded body must pass `check`
    /// before it is returned or cached. Use it for APIs that report errors
    /// inside a 2xx body.
    pub async fn fetch_checked<T, C>(&self, endpoint: &Endpoint, check: C) -> Result<T, CoreError>
    where
        T: DeserializeOwned + Serialize,
        C: Fn(&T) -> Result<(), CoreError> + Send + Sync,
    {
        if !self.connectivity.is_online() {
            debug!(key = %endpoint.cache_key, "offline, reading cache");
            return self.load_cached(endpoint).ok_or(CoreError::Offline);
        }

        match self.fetch_with_retry(endpoint, &check).await {
            Ok(value) => Ok(value),
            Err(err @ (CoreError::BadResponse { .. } | CoreError::Api { .. })) => Err(err),
            Err(err) => match self.load_cached(endpoint) {
                Some(value) => {
                    warn!(
                        provider = %endpoint.provider,
                        key = %endpoint.cache_key,
                        error = %err,
                        "request failed, serving cached copy"
                    );
                    Ok(value)
                }
                None => Err(err),
            },
        }
    }

    async fn fetch_with_retry<T, C>(&self, endpoint: &Endpoint, check: &C) -> Result<T, CoreError>
    where
        T: DeserializeOwned + Serialize,
        C: Fn(&T) -> Result<(), CoreError> + Send + Sync,
    {
        let mut attempt = 0;
        loop {
            match self.fetch_once(endpoint, check).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.retry.max_retries => {
                    let delay = self.retry.delay_for_attempt(attempt);
                    warn!(
                        provider = %endpoint.provider,
                        attempt = attempt + 1,
                        max = self.retry.max_retries + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn fetch_once<T, C>(&self, endpoint: &Endpoint, check: &C) -> Result<T, CoreError>
    where
        T: DeserializeOwned + Serialize,
        C: Fn(&T) -> Result<(), CoreError> + Send + Sync,
    {
        debug!(provider = %endpoint.provider, url = %endpoint.request.url, "sending request");
        let response = self.transport.send(&endpoint.request).await?;

        if !response.is_success() {
            return Err(CoreError::BadResponse {
                provider: endpoint.provider.clone(),
                message: format!("HTTP {}", response.status),
            });
        }

        let value: T = serde_json::from_str(&response.body).map_err(|e| CoreError::BadResponse {
            provider: endpoint.provider.clone(),
            message: format!("Failed to decode {}: {e}", endpoint.cache_key),
        })?;
        check(&value)?;

        if let Err(e) = self.cache.save(&endpoint.cache_key, &value) {
            warn!(key = %endpoint.cache_key, error = %e, "failed to write cache");
        }

        Ok(value)
    }

    fn load_cached<T: DeserializeOwned>(&self, endpoint: &Endpoint) -> Option<T> {
        match self.cache.load(&endpoint.cache_key) {
            Ok(value) => value,
            Err(e) => {
                warn!(key = %endpoint.cache_key, error = %e, "unreadable cache entry");
                None
            }
        }
    }
}
