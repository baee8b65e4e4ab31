//! OKX v5 public REST adapter.
//!
//! Markets come from `GET /api/v5/public/instruments?instType=SPOT`; daily
//! candles from `GET /api/v5/market/history-candles` with `bar=1Dutc`.
//!
//! `history-candles` pages backwards in time: `before` and `after` are
//! exclusive bounds and rows arrive newest first. A forward page starting at
//! `since` is therefore requested as `before = since - 1`,
//! `after = since + limit days`, then reversed.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{Exchange, ExchangeSettings};
use crate::http::{Throttle, get_json};
use crate::models::{Market, MarketCatalog, RawCandle};
use crate::{KandleError, Result};

/// Registry identifier.
pub const ID: &str = "okx";

const BASE_URL: &str = "https://www.okx.com";
const BAR: &str = "1Dutc";
const DAY_MS: i64 = 86_400_000;
/// `history-candles` allows 20 requests per 2 seconds.
const REQUEST_SPACING: Duration = Duration::from_millis(100);
/// Largest page `history-candles` serves.
pub const MAX_LIMIT: usize = 100;

/// Response codes OKX uses for rate limiting.
const RATE_LIMIT_CODES: &[&str] = &["50011", "50061"];

/// OKX spot market data adapter.
pub struct Okx {
    client: reqwest::Client,
    throttle: Throttle,
}

/// Registry factory.
pub fn create(settings: ExchangeSettings) -> Box<dyn Exchange> {
    Box::new(Okx::new(settings))
}

impl Okx {
    #[must_use]
    pub fn new(settings: ExchangeSettings) -> Self {
        Self {
            client: settings.client,
            throttle: Throttle::new(REQUEST_SPACING, settings.rate_limit),
        }
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Vec<Value>> {
        self.throttle.wait().await;
        let body = get_json(&self.client, ID, &format!("{BASE_URL}{path}"), query).await?;
        unwrap_envelope(body)
    }
}

#[async_trait]
impl Exchange for Okx {
    fn id(&self) -> &str {
        ID
    }

    fn page_limit(&self, requested: usize) -> usize {
        requested.clamp(1, MAX_LIMIT)
    }

    async fn load_markets(&self) -> Result<MarketCatalog> {
        let data = self
            .get("/api/v5/public/instruments", &[("instType", "SPOT".into())])
            .await?;
        parse_instruments(data)
    }

    async fn fetch_ohlcv(
        &self,
        market: &Market,
        since: i64,
        limit: usize,
    ) -> Result<Vec<RawCandle>> {
        let limit = self.page_limit(limit);
        let (before, after) = page_window(since, limit);
        let query = [
            ("instId", market.id.clone()),
            ("bar", BAR.to_string()),
            ("before", before.to_string()),
            ("after", after.to_string()),
            ("limit", limit.to_string()),
        ];
        let data = self.get("/api/v5/market/history-candles", &query).await?;
        let rows = parse_candles(data)?;
        debug!(instrument = %market.id, since, rows = rows.len(), "okx candles");
        Ok(rows)
    }
}

/// Exclusive `(before, after)` bounds covering `limit` days from `since`.
pub fn page_window(since: i64, limit: usize) -> (i64, i64) {
    let span = DAY_MS.saturating_mul(i64::try_from(limit).unwrap_or(i64::MAX));
    ((since - 1).max(0), since.saturating_add(span))
}

#[derive(Deserialize)]
struct Envelope {
    code: String,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    data: Vec<Value>,
}

/// Checks the `{code, msg, data}` envelope and returns `data`.
///
/// # Errors
///
/// Returns [`KandleError::RateLimited`] for OKX rate-limit codes and
/// [`KandleError::Exchange`] for any other non-zero code.
pub fn unwrap_envelope(body: Value) -> Result<Vec<Value>> {
    let envelope: Envelope = serde_json::from_value(body)?;
    if envelope.code == "0" {
        return Ok(envelope.data);
    }
    let message = format!("{}: {}", envelope.code, envelope.msg);
    if RATE_LIMIT_CODES.contains(&envelope.code.as_str()) {
        Err(KandleError::RateLimited(format!("{ID} {message}")))
    } else {
        Err(KandleError::Exchange {
            exchange: ID.to_string(),
            message,
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Instrument {
    inst_id: String,
    base_ccy: String,
    quote_ccy: String,
    #[serde(default)]
    state: String,
}

/// Builds the catalog from `instruments` data, skipping delisted entries.
///
/// # Errors
///
/// Returns [`KandleError::Json`] if an entry lacks the expected fields.
pub fn parse_instruments(data: Vec<Value>) -> Result<MarketCatalog> {
    let mut catalog = MarketCatalog::new();
    for entry in data {
        let inst: Instrument = serde_json::from_value(entry)?;
        if !inst.state.is_empty() && inst.state != "live" {
            continue;
        }
        catalog.insert(Market::new(inst.inst_id, inst.base_ccy, inst.quote_ccy));
    }
    Ok(catalog)
}

/// Converts `history-candles` data (newest first) into oldest-first rows.
///
/// # Errors
///
/// Returns [`KandleError::MalformedMessage`] if an entry is not an array.
pub fn parse_candles(data: Vec<Value>) -> Result<Vec<RawCandle>> {
    let mut rows = data
        .into_iter()
        .map(|entry| match entry {
            Value::Array(row) => Ok(row),
            other => Err(KandleError::MalformedMessage(format!(
                "okx candle is not an array: {}",
                super::describe(&other)
            ))),
        })
        .collect::<Result<Vec<_>>>()?;
    rows.reverse();
    Ok(rows)
}
