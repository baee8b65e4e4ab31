//! Kraken public REST adapter.
//!
//! Markets come from `GET /0/public/AssetPairs`; daily candles from
//! `GET /0/public/OHLC?interval=1440&since=..`.
//!
//! Kraken rows are `[time_s, open, high, low, close, vwap, volume, count]`
//! with the time in seconds, so each row is rewritten into the millisecond
//! `[ts, o, h, l, c, v]` layout. `since` is second-granular and inclusive on
//! Kraken's side; rows opening before the requested millisecond are dropped
//! so pages never overlap.

use std::collections::BTreeMap;
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
pub const ID: &str = "kraken";

const BASE_URL: &str = "https://api.kraken.com";
const INTERVAL_MINUTES: &str = "1440";
/// Public endpoints tolerate roughly one call per second.
const REQUEST_SPACING: Duration = Duration::from_secs(1);
/// Kraken never returns more than 720 rows per `OHLC` call.
pub const MAX_LIMIT: usize = 720;

/// Kraken spot market data adapter.
pub struct Kraken {
    client: reqwest::Client,
    throttle: Throttle,
}

/// Registry factory.
pub fn create(settings: ExchangeSettings) -> Box<dyn Exchange> {
    Box::new(Kraken::new(settings))
}

impl Kraken {
    #[must_use]
    pub fn new(settings: ExchangeSettings) -> Self {
        Self {
            client: settings.client,
            throttle: Throttle::new(REQUEST_SPACING, settings.rate_limit),
        }
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        self.throttle.wait().await;
        let body = get_json(&self.client, ID, &format!("{BASE_URL}{path}"), query).await?;
        unwrap_result(body)
    }
}

#[async_trait]
impl Exchange for Kraken {
    fn id(&self) -> &str {
        ID
    }

    fn page_limit(&self, requested: usize) -> usize {
        requested.clamp(1, MAX_LIMIT)
    }

    async fn load_markets(&self) -> Result<MarketCatalog> {
        let result = self.get("/0/public/AssetPairs", &[]).await?;
        parse_asset_pairs(result)
    }

    async fn fetch_ohlcv(
        &self,
        market: &Market,
        since: i64,
        limit: usize,
    ) -> Result<Vec<RawCandle>> {
        let query = [
            ("pair", market.id.clone()),
            ("interval", INTERVAL_MINUTES.to_string()),
            ("since", (since / 1000).to_string()),
        ];
        let result = self.get("/0/public/OHLC", &query).await?;
        let rows = parse_ohlc(&market.id, result, since, self.page_limit(limit))?;
        debug!(pair = %market.id, since, rows = rows.len(), "kraken ohlc");
        Ok(rows)
    }
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    error: Vec<String>,
    #[serde(default)]
    result: Value,
}

/// Checks the `{error, result}` envelope and returns `result`.
///
/// # Errors
///
/// Returns [`KandleError::RateLimited`] for `EAPI:Rate limit exceeded` and
/// `EGeneral:Too many requests`, [`KandleError::Exchange`] for any other
/// reported error.
pub fn unwrap_result(body: Value) -> Result<Value> {
    let envelope: Envelope = serde_json::from_value(body)?;
    if envelope.error.is_empty() {
        return Ok(envelope.result);
    }
    let message = envelope.error.join(", ");
    if envelope
        .error
        .iter()
        .any(|e| e.contains("Rate limit") || e.contains("Too many requests"))
    {
        Err(KandleError::RateLimited(format!("{ID} {message}")))
    } else {
        Err(KandleError::Exchange {
            exchange: ID.to_string(),
            message,
        })
    }
}

#[derive(Deserialize)]
struct AssetPair {
    wsname: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

/// Builds the catalog from `AssetPairs`, keyed by the pair's `BASE/QUOTE`
/// websocket name with `XBT` and `XDG` mapped to `BTC` and `DOGE`.
///
/// Pairs without a websocket name (dark pool books) are skipped.
///
/// # Errors
///
/// Returns [`KandleError::Json`] if `result` is not an object of pairs.
pub fn parse_asset_pairs(result: Value) -> Result<MarketCatalog> {
    let pairs: BTreeMap<String, AssetPair> = serde_json::from_value(result)?;
    let mut catalog = MarketCatalog::new();
    for (id, pair) in pairs {
        if pair.status.as_deref().is_some_and(|s| s != "online") {
            continue;
        }
        let Some((base, quote)) = pair.wsname.as_deref().and_then(|ws| ws.split_once('/'))
        else {
            continue;
        };
        catalog.insert(Market::new(id, common_code(base), common_code(quote)));
    }
    Ok(catalog)
}

fn common_code(code: &str) -> &str {
    match code {
        "XBT" => "BTC",
        "XDG" => "DOGE",
        other => other,
    }
}

/// Rewrites `OHLC` rows for `pair` into the raw candle layout, dropping rows
/// that open before `since` and keeping at most `limit`.
///
/// # Errors
///
/// Returns [`KandleError::MalformedMessage`] if the pair's rows are missing
/// or not arrays.
pub fn parse_ohlc(pair: &str, result: Value, since: i64, limit: usize) -> Result<Vec<RawCandle>> {
    let Value::Object(mut map) = result else {
        return Err(KandleError::MalformedMessage(
            "kraken OHLC result is not an object".into(),
        ));
    };
    // Kraken may key the rows by a different alias than the one requested.
    let key = map
        .keys()
        .find(|k| k.as_str() == pair)
        .or_else(|| map.keys().find(|k| k.as_str() != "last"))
        .cloned()
        .ok_or_else(|| KandleError::MalformedMessage(format!("kraken OHLC has no rows for {pair}")))?;
    let Some(Value::Array(entries)) = map.remove(&key) else {
        return Err(KandleError::MalformedMessage(format!(
            "kraken OHLC rows for {pair} are not an array"
        )));
    };

    let mut rows = Vec::with_capacity(entries.len().min(limit));
    for entry in entries {
        let Value::Array(row) = entry else {
            return Err(KandleError::MalformedMessage(format!(
                "kraken OHLC row is not an array: {}",
                super::describe(&entry)
            )));
        };
        let candle = to_raw_candle(row);
        if timestamp_ms(&candle).is_some_and(|ts| ts < since) {
            continue;
        }
        rows.push(candle);
        if rows.len() == limit {
            break;
        }
    }
    Ok(rows)
}

/// Reorders `[time_s, o, h, l, c, vwap, volume, count]` into
/// `[time_ms, o, h, l, c, volume]`.
///
/// An unusable time column is kept as-is so the fetcher's validation sees it.
fn to_raw_candle(row: Vec<Value>) -> RawCandle {
    let mut cols = row.into_iter();
    let time = cols.next().unwrap_or(Value::Null);
    let time = match time.as_i64() {
        Some(secs) => Value::from(secs.saturating_mul(1000)),
        None => time,
    };
    let ohlc: Vec<Value> = cols.by_ref().take(4).collect();
    let _vwap = cols.next();
    let volume = cols.next().unwrap_or(Value::Null);

    let mut candle = Vec::with_capacity(6);
    candle.push(time);
    candle.extend(ohlc);
    candle.push(volume);
    candle
}

fn timestamp_ms(row: &[Value]) -> Option<i64> {
    row.first().and_then(Value::as_i64)
}
