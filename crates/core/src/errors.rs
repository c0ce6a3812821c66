use thiserror::Error;

/// Unified error type for the entire crypto-portfolio-core library.
/// Every public function returns `Result<T, CoreError>`.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Network ─────────────────────────────────────────────────────
    #[error("Offline and no cached data available")]
    Offline,

    #[error("Bad response ({provider}): {message}")]
    BadResponse {
        provider: String,
        message: String,
    },

    #[error("Transient network error: {0}")]
    TransientNetwork(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error ({provider}): {message}")]
    Api {
        provider: String,
        message: String,
    },

    #[error("No provider available: {0}")]
    NoProvider(String),

    #[error("Missing credentials for {0}")]
    MissingCredentials(String),

    // ── Ledger ──────────────────────────────────────────────────────
    #[error("Invalid sell of {symbol}: {message}")]
    InvalidSell {
        symbol: String,
        message: String,
    },

    #[error("Invalid edit: {0}")]
    InvalidEdit(String),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    #[error("Validation failed: {0}")]
    ValidationError(String),

    // ── Local storage ───────────────────────────────────────────────
    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

impl CoreError {
    /// Whether the failure is worth retrying (timeouts, dropped connections).
    pub fn is_transient(&self) -> bool {
        matches!(self, CoreError::TransientNetwork(_))
    }
}

// ── Conversion helpers (From impls) ─────────────────────────────────

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        CoreError::Persistence(e.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Deserialization(e.to_string())
    }
}

impl From<reqwest::Error> for CoreError {
    fn from(e: reqwest::Error) -> Self {
        // reqwest errors often contain full URLs; strip query strings so
        // API keys passed as parameters never end up in logs.
        let sanitized = redact_query(&e.to_string());
        if e.is_timeout() || e.is_connect() {
            CoreError::TransientNetwork(sanitized)
        } else {
            CoreError::Network(sanitized)
        }
    }
}

/// Replace everything after the first `?` with a redaction marker.
pub fn redact_query(msg: &str) -> String {
    match msg.find('?') {
        Some(idx) => format!("{}?<query redacted>", &msg[..idx]),
        None => msg.to_string(),
    }
}
