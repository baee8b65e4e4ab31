//! Symbol resolution and the paginated daily-candle fetch loop.
//!
//! [`fetch_daily_candles`] walks an exchange's candle history forward from a
//! start timestamp, one page per request, until the exchange reports
//! exhaustion with an empty or short page. The cursor always advances to one
//! millisecond past the last received candle, so pages never overlap.

use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::config::FetchConfig;
use crate::error::ErrorClass;
use crate::exchange::Exchange;
use crate::models::{Candle, Market, MarketCatalog};
use crate::{KandleError, Result};

/// 2020-01-01T00:00:00Z in milliseconds.
pub const DEFAULT_SINCE_MS: i64 = 1_577_836_800_000;

/// Candles requested per page.
pub const DEFAULT_PAGE_LIMIT: usize = 100;

/// Courtesy pause between consecutive page requests.
pub const DEFAULT_REQUEST_DELAY: Duration = Duration::from_millis(1000);

/// Separators tried, in order, when a symbol is not listed verbatim.
const SEPARATOR_VARIANTS: [&str; 2] = ["-", "_"];

/// Pagination parameters for one symbol's fetch.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Open time (ms) of the first candle requested.
    pub since: i64,
    /// Requested page size; capped by [`Exchange::page_limit`].
    pub limit: usize,
    /// Pause before every request after the first.
    pub request_delay: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            since: DEFAULT_SINCE_MS,
            limit: DEFAULT_PAGE_LIMIT,
            request_delay: DEFAULT_REQUEST_DELAY,
        }
    }
}

impl From<&FetchConfig> for FetchOptions {
    fn from(config: &FetchConfig) -> Self {
        Self {
            since: config.since_ms,
            limit: config.page_limit,
            request_delay: config.request_delay,
        }
    }
}

/// Returns the catalog's form of `symbol`.
///
/// Tries the symbol verbatim, then with `/` replaced by `-`, then by `_`, and
/// returns the first form the catalog lists.
pub fn resolve_symbol<'a>(symbol: &str, catalog: &'a MarketCatalog) -> Option<&'a str> {
    resolve_market(symbol, catalog).map(|(key, _)| key)
}

fn resolve_market<'a>(symbol: &str, catalog: &'a MarketCatalog) -> Option<(&'a str, &'a Market)> {
    if let Some(found) = catalog.get_key_value(symbol) {
        return Some(found);
    }
    SEPARATOR_VARIANTS
        .iter()
        .find_map(|sep| catalog.get_key_value(&symbol.replace('/', sep)))
}

/// Fetches the complete daily candle history of `symbol`.
///
/// Returns an empty series when the catalog does not list the symbol under
/// any separator variant. A row that fails validation (for example a missing
/// timestamp) ends the fetch; every candle accepted before it is kept.
///
/// # Errors
///
/// Any adapter error is logged with its classification and returned
/// unchanged. Nothing is retried.
pub async fn fetch_daily_candles(
    exchange: &dyn Exchange,
    catalog: &MarketCatalog,
    symbol: &str,
    options: &FetchOptions,
) -> Result<Vec<Candle>> {
    let exchange_id = exchange.id();
    let Some((resolved, market)) = resolve_market(symbol, catalog) else {
        warn!(exchange = exchange_id, symbol, "symbol not listed, skipping");
        return Ok(Vec::new());
    };
    if resolved != symbol {
        debug!(exchange = exchange_id, symbol, resolved, "resolved symbol variant");
    }

    let limit = exchange.page_limit(options.limit);
    let mut since = options.since;
    let mut requests = 0usize;
    let mut candles: Vec<Candle> = Vec::new();

    loop {
        requests += 1;
        if requests > 1 {
            tokio::time::sleep(options.request_delay).await;
        }

        let page = exchange
            .fetch_ohlcv(market, since, limit)
            .await
            .inspect_err(|e| log_fetch_error(exchange_id, resolved, since, e))?;

        if page.is_empty() {
            debug!(exchange = exchange_id, symbol = resolved, requests, "empty page, history exhausted");
            break;
        }

        let page_len = page.len();
        let before = candles.len();
        let mut integrity_stop = false;
        for row in &page {
            match Candle::from_raw(row) {
                Ok(candle) => candles.push(candle),
                Err(e) => {
                    warn!(
                        exchange = exchange_id,
                        symbol = resolved,
                        error = %e,
                        "invalid candle row, stopping fetch"
                    );
                    integrity_stop = true;
                    break;
                }
            }
        }

        info!(
            exchange = exchange_id,
            symbol = resolved,
            request = requests,
            received = candles.len() - before,
            total = candles.len(),
            "fetched page"
        );

        if integrity_stop {
            break;
        }

        let Some(last) = candles.last() else {
            break;
        };
        let Some(next) = last.timestamp.checked_add(1).filter(|&next| next > since) else {
            warn!(
                exchange = exchange_id,
                symbol = resolved,
                since,
                last = last.timestamp,
                "cursor did not advance, stopping fetch"
            );
            break;
        };
        since = next;

        if page_len < limit {
            break;
        }
    }

    info!(
        exchange = exchange_id,
        symbol = resolved,
        requests,
        candles = candles.len(),
        "fetch complete"
    );
    Ok(candles)
}

fn log_fetch_error(exchange: &str, symbol: &str, since: i64, err: &KandleError) {
    error!(
        exchange,
        symbol,
        since,
        error = %err,
        "{}",
        fetch_error_message(err.class())
    );
}

fn fetch_error_message(class: ErrorClass) -> &'static str {
    match class {
        ErrorClass::Network => "network error while fetching candles",
        ErrorClass::RateLimit => {
            "rate limited while fetching candles; raise REQUEST_DELAY_MS or retry later"
        }
        ErrorClass::Other => "failed to fetch candles",
    }
}
