//! Binance spot v3 public REST adapter.
//!
//! Markets come from `GET /api/v3/exchangeInfo`; daily candles from
//! `GET /api/v3/klines?interval=1d&startTime=..`, which already returns rows
//! oldest first with the open time in milliseconds.

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
pub const ID: &str = "binance";

const BASE_URL: &str = "https://api.binance.com";
const INTERVAL: &str = "1d";
const REQUEST_SPACING: Duration = Duration::from_millis(50);
pub const MAX_LIMIT: usize = 1000;

/// Binance spot market data adapter.
pub struct Binance {
    client: reqwest::Client,
    throttle: Throttle,
}

/// Registry factory.
pub fn create(settings: ExchangeSettings) -> Box<dyn Exchange> {
    Box::new(Binance::new(settings))
}

impl Binance {
    #[must_use]
    pub fn new(settings: ExchangeSettings) -> Self {
        Self {
            client: settings.client,
            throttle: Throttle::new(REQUEST_SPACING, settings.rate_limit),
        }
    }
}

#[async_trait]
impl Exchange for Binance {
    fn id(&self) -> &str {
        ID
    }

    fn page_limit(&self, requested: usize) -> usize {
        requested.clamp(1, MAX_LIMIT)
    }

    async fn load_markets(&self) -> Result<MarketCatalog> {
        self.throttle.wait().await;
        let body = get_json(
            &self.client,
            ID,
            &format!("{BASE_URL}/api/v3/exchangeInfo"),
            &[],
        )
        .await?;
        parse_exchange_info(body)
    }

    async fn fetch_ohlcv(
        &self,
        market: &Market,
        since: i64,
        limit: usize,
    ) -> Result<Vec<RawCandle>> {
        self.throttle.wait().await;
        let query = [
            ("symbol", market.id.clone()),
            ("interval", INTERVAL.to_string()),
            ("startTime", since.to_string()),
            ("limit", self.page_limit(limit).to_string()),
        ];
        let body = get_json(
            &self.client,
            ID,
            &format!("{BASE_URL}/api/v3/klines"),
            &query,
        )
        .await?;
        let rows = parse_klines(body)?;
        debug!(symbol = %market.id, since, rows = rows.len(), "binance klines");
        Ok(rows)
    }
}

#[derive(Deserialize)]
struct ExchangeInfo {
    symbols: Vec<SymbolInfo>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SymbolInfo {
    symbol: String,
    status: String,
    base_asset: String,
    quote_asset: String,
}

/// Builds the catalog from `exchangeInfo`, keeping only trading symbols.
///
/// # Errors
///
/// Returns [`KandleError::Json`] if the body lacks the `symbols` list.
pub fn parse_exchange_info(body: Value) -> Result<MarketCatalog> {
    let info: ExchangeInfo = serde_json::from_value(body)?;
    Ok(info
        .symbols
        .into_iter()
        .filter(|s| s.status == "TRADING")
        .map(|s| Market::new(s.symbol, s.base_asset, s.quote_asset))
        .collect())
}

/// Extracts kline rows; the first six columns already match the raw candle
/// layout.
///
/// # Errors
///
/// Returns [`KandleError::MalformedMessage`] if the body is not an array of
/// arrays.
pub fn parse_klines(body: Value) -> Result<Vec<RawCandle>> {
    let Value::Array(entries) = body else {
        return Err(KandleError::MalformedMessage(format!(
            "binance klines is not an array: {}",
            super::describe(&body)
        )));
    };
    entries
        .into_iter()
        .map(|entry| match entry {
            Value::Array(row) => Ok(row),
            other => Err(KandleError::MalformedMessage(format!(
                "binance kline is not an array: {}",
                super::describe(&other)
            ))),
        })
        .collect()
}
