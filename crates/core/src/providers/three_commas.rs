use hmac::{Hmac, Mac};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use sha2::Sha256;
use std::sync::Arc;
use tracing::{debug, info};

use crate::errors::CoreError;
use crate::models::exchange::{AccountBalance, Bot, BotConfig, ExchangeAccount};
use crate::net::transport::{HttpRequest, HttpTransport};

const BASE_URL: &str = "https://api.3commas.io";
const API_PREFIX: &str = "/public/api";
const PROVIDER: &str = "3Commas";

/// API key/secret pair. Supplied by the host at runtime, never compiled in.
#[derive(Clone)]
pub struct ApiCredentials {
    api_key: String,
    api_secret: String,
}

impl ApiCredentials {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

impl std::fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("api_key", &"<redacted>")
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

/// Hex HMAC-SHA256 of `payload` under `secret`.
pub fn sign_payload(secret: &str, payload: &str) -> Result<String, CoreError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|e| CoreError::ValidationError(format!("Invalid signing key: {e}")))?;
    mac.update(payload.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// Exchange account and trading bot platform (3Commas).
///
/// Every call is signed: the `Signature` header carries the HMAC-SHA256 of
/// the request path (with query) followed by the JSON body, if any; the key
/// goes in `APIKEY`.
pub struct ExchangeAccountClient {
    transport: Arc<dyn HttpTransport>,
    credentials: Option<ApiCredentials>,
    base_url: String,
}

impl ExchangeAccountClient {
    pub fn new(transport: Arc<dyn HttpTransport>, credentials: Option<ApiCredentials>) -> Self {
        Self {
            transport,
            credentials,
            base_url: BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn has_credentials(&self) -> bool {
        self.credentials.is_some()
    }

    pub async fn list_accounts(&self) -> Result<Vec<ExchangeAccount>, CoreError> {
        let request = self.signed_get("/ver1/accounts", &[])?;
        self.execute(request).await
    }

    pub async fn list_balances(&self, account_id: u64) -> Result<Vec<AccountBalance>, CoreError> {
        let path = format!("/ver1/accounts/{account_id}/account_table_data");
        let request = self.signed_post(&path, "{}")?;
        self.execute(request).await
    }

    pub async fn create_bot(&self, config: &BotConfig) -> Result<Bot, CoreError> {
        let body = serde_json::to_string(config)
            .map_err(|e| CoreError::Serialization(format!("Failed to serialize bot config: {e}")))?;
        let request = self.signed_post("/ver1/bots/create_bot", &body)?;
        let bot: Bot = self.execute(request).await?;
        info!(bot_id = bot.id, name = %bot.name, "bot created");
        Ok(bot)
    }

    pub async fn cancel_bot(&self, bot_id: u64) -> Result<(), CoreError> {
        let path = format!("/ver1/bots/{bot_id}/delete");
        let request = self.signed_post(&path, "{}")?;
        let _: serde_json::Value = self.execute(request).await?;
        info!(bot_id, "bot cancelled");
        Ok(())
    }

    // ── Request building ────────────────────────────────────────────

    fn credentials(&self) -> Result<&ApiCredentials, CoreError> {
        self.credentials
            .as_ref()
            .ok_or_else(|| CoreError::MissingCredentials(PROVIDER.into()))
    }

    /// Build a signed GET for `path` (relative to the API prefix).
    pub fn signed_get(&self, path: &str, query: &[(&str, &str)]) -> Result<HttpRequest, CoreError> {
        let creds = self.credentials()?;
        let mut request = HttpRequest::get(format!("{}{API_PREFIX}{path}", self.base_url));
        for (k, v) in query {
            request = request.query(*k, *v);
        }
        let mut payload = format!("{API_PREFIX}{path}");
        if !request.query.is_empty() {
            payload.push('?');
            payload.push_str(&request.query_string());
        }
        let signature = sign_payload(&creds.api_secret, &payload)?;
        Ok(request
            .header("APIKEY", creds.api_key.as_str())
            .header("Signature", signature))
    }

    /// Build a signed POST for `path` with a JSON body.
    pub fn signed_post(&self, path: &str, body: &str) -> Result<HttpRequest, CoreError> {
        let creds = self.credentials()?;
        let payload = format!("{API_PREFIX}{path}{body}");
        let signature = sign_payload(&creds.api_secret, &payload)?;
        Ok(
            HttpRequest::post(format!("{}{API_PREFIX}{path}", self.base_url), body)
                .header("APIKEY", creds.api_key.as_str())
                .header("Signature", signature),
        )
    }

    async fn execute<T: DeserializeOwned>(&self, request: HttpRequest) -> Result<T, CoreError> {
        debug!(url = %request.url, "3commas request");
        let response = self.transport.send(&request).await?;
        if !response.is_success() {
            let detail = serde_json::from_str::<ErrorBody>(&response.body)
                .ok()
                .and_then(|b| b.error_description.or(b.error))
                .unwrap_or_default();
            return Err(CoreError::BadResponse {
                provider: PROVIDER.into(),
                message: format!("HTTP {} {detail}", response.status).trim_end().to_string(),
            });
        }
        serde_json::from_str(&response.body).map_err(|e| CoreError::BadResponse {
            provider: PROVIDER.into(),
            message: format!("Failed to decode response: {e}"),
        })
    }
}
