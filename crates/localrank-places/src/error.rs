use thiserror::Error;

/// Errors returned by the Google API adapters.
#[derive(Debug, Error)]
pub enum PlacesError {
    /// Network, TLS or timeout failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// HTTP 429 or a provider `OVER_QUERY_LIMIT` status.
    #[error("provider quota exceeded ({status})")]
    QuotaExceeded { status: String },

    /// Non-2xx HTTP status other than 429. `endpoint` is the URL path only so
    /// API keys never end up in logs.
    #[error("unexpected HTTP status {status} from {endpoint}")]
    UnexpectedStatus { status: u16, endpoint: String },

    /// The provider answered with an application-level error status.
    #[error("provider error {status}: {message}")]
    Api { status: String, message: String },

    #[error("invalid base URL '{base_url}': {reason}")]
    InvalidBaseUrl { base_url: String, reason: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl PlacesError {
    #[must_use]
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, Self::QuotaExceeded { .. })
    }

    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Http(e) if e.is_timeout())
    }
}
