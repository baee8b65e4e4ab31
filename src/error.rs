//! Failures raised while configuring, fetching and archiving candles.
//!
//! Adapter errors are classified at the HTTP boundary (network, rate limit,
//! authentication, exchange rejection) so the fetcher can log them by
//! [`ErrorClass`] without inspecting transport details.

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, KandleError>;

/// Top-level error type returned by all public APIs.
#[derive(Debug, thiserror::Error)]
pub enum KandleError {
    /// An environment variable was malformed or out of range.
    #[error("configuration error: {0}")]
    Config(String),

    /// No adapter is registered under the requested exchange identifier.
    #[error("unsupported exchange: {0}")]
    UnsupportedExchange(String),

    /// The exchange could not be reached (connect failure, timeout, reset).
    #[error("network error: {0}")]
    Network(String),

    /// The exchange rejected the request for exceeding its rate limit or
    /// tripped its DDoS protection.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// The exchange refused the request's credentials or origin.
    #[error("authentication error: {0}")]
    Authentication(String),

    /// The exchange answered with an error payload or unexpected status.
    #[error("{exchange} error: {message}")]
    Exchange { exchange: String, message: String },

    /// An HTTP operation failed outside the cases classified above.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization or deserialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A filesystem operation failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Writing or reading CSV failed.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// A response had an unexpected shape.
    #[error("malformed message: {0}")]
    MalformedMessage(String),
}

/// Coarse classification used when logging fetch failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Connectivity problems: DNS, connect, timeout, dropped connection.
    Network,
    /// Rate-limit rejections and DDoS protection responses.
    RateLimit,
    Other,
}

impl KandleError {
    /// Returns the logging class of this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Network(_) => ErrorClass::Network,
            Self::RateLimited(_) => ErrorClass::RateLimit,
            Self::Http(e) if e.is_timeout() || e.is_connect() => ErrorClass::Network,
            Self::Http(e) if e.status().is_some_and(|s| s.as_u16() == 429) => {
                ErrorClass::RateLimit
            }
            _ => ErrorClass::Other,
        }
    }
}
