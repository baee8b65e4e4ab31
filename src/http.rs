//! Shared HTTP plumbing for the exchange adapters.
//!
//! One [`reqwest::Client`] is built at startup with the configured proxy and
//! per-request timeout. Adapters issue JSON GETs through [`get_json`], which
//! turns transport failures and HTTP status codes into classified
//! [`KandleError`] variants.

use std::time::{Duration, Instant};

use reqwest::{Client, StatusCode};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::HttpConfig;
use crate::{KandleError, Result};

const USER_AGENT: &str = concat!("kandle/", env!("CARGO_PKG_VERSION"));

/// Builds the HTTP client shared by every adapter.
///
/// # Errors
///
/// Returns [`KandleError::Config`] if the proxy URL is rejected by `reqwest`
/// or the client cannot be constructed.
pub fn build_client(config: &HttpConfig) -> Result<Client> {
    let mut builder = Client::builder()
        .timeout(config.timeout)
        .user_agent(USER_AGENT);

    if let Some(proxy_url) = &config.proxy_url {
        let proxy = reqwest::Proxy::all(proxy_url.as_str())
            .map_err(|e| KandleError::Config(format!("invalid proxy {proxy_url}: {e}")))?;
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| KandleError::Config(format!("failed to build HTTP client: {e}")))
}

/// Issues a GET request and decodes the JSON body.
///
/// # Errors
///
/// - [`KandleError::Network`] on connect failures and timeouts
/// - [`KandleError::RateLimited`] on HTTP 429 and 418
/// - [`KandleError::Authentication`] on HTTP 401 and 403
/// - [`KandleError::Exchange`] on any other non-success status
/// - [`KandleError::Json`] if the body is not valid JSON
pub async fn get_json(
    client: &Client,
    exchange: &str,
    url: &str,
    query: &[(&str, String)],
) -> Result<Value> {
    debug!(exchange, url, ?query, "GET");
    let response = client
        .get(url)
        .query(query)
        .send()
        .await
        .map_err(|e| transport_error(exchange, e))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| transport_error(exchange, e))?;

    if !status.is_success() {
        return Err(status_error(exchange, status, &body));
    }

    Ok(serde_json::from_str(&body)?)
}

/// Maps a `reqwest` transport failure onto the crate error taxonomy.
pub fn transport_error(exchange: &str, err: reqwest::Error) -> KandleError {
    if err.is_timeout() {
        KandleError::Network(format!("{exchange} request timed out: {err}"))
    } else if err.is_connect() || err.is_request() {
        KandleError::Network(format!("{exchange} unreachable: {err}"))
    } else {
        KandleError::Http(err)
    }
}

/// Maps a non-success HTTP status onto the crate error taxonomy.
pub fn status_error(exchange: &str, status: StatusCode, body: &str) -> KandleError {
    let snippet: String = body.chars().take(200).collect();
    let message = format!("HTTP {status}: {snippet}");
    match status.as_u16() {
        // Binance answers 418 once an IP ignored repeated 429s.
        429 | 418 => KandleError::RateLimited(format!("{exchange} {message}")),
        401 | 403 => KandleError::Authentication(format!("{exchange} {message}")),
        502..=504 => KandleError::Network(format!("{exchange} {message}")),
        _ => KandleError::Exchange {
            exchange: exchange.to_string(),
            message,
        },
    }
}

/// Enforces a minimum spacing between consecutive requests to one exchange.
///
/// A disabled throttle never waits.
#[derive(Debug)]
pub struct Throttle {
    interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl Throttle {
    pub fn new(interval: Duration, enabled: bool) -> Self {
        Self {
            interval: if enabled { interval } else { Duration::ZERO },
            last: Mutex::new(None),
        }
    }

    /// Sleeps until `interval` has elapsed since the previous call returned.
    pub async fn wait(&self) {
        let mut last = self.last.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.interval {
                tokio::time::sleep(self.interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}
