//! Shared test utilities: an in-memory exchange with scripted pages.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Value, json};

use kandle::exchange::Exchange;
use kandle::models::{Market, MarketCatalog, RawCandle};
use kandle::{KandleError, Result};

pub const DAY_MS: i64 = 86_400_000;

/// 2020-01-01T00:00:00Z.
pub const START_MS: i64 = 1_577_836_800_000;

/// One `fetch_ohlcv` call as the exchange saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub market_id: String,
    pub since: i64,
    pub limit: usize,
}

/// Exchange that replays queued pages in order and records every call.
///
/// Once the queue is drained every further call returns an empty page.
pub struct ScriptedExchange {
    catalog: MarketCatalog,
    pages: Mutex<VecDeque<Result<Vec<RawCandle>>>>,
    calls: Mutex<Vec<Call>>,
    max_limit: Option<usize>,
}

impl ScriptedExchange {
    pub fn new(catalog: MarketCatalog) -> Self {
        Self {
            catalog,
            pages: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            max_limit: None,
        }
    }

    pub fn with_max_limit(mut self, max: usize) -> Self {
        self.max_limit = Some(max);
        self
    }

    pub fn push_page(&self, page: Vec<RawCandle>) {
        self.pages.lock().unwrap().push_back(Ok(page));
    }

    pub fn push_error(&self, err: KandleError) {
        self.pages.lock().unwrap().push_back(Err(err));
    }

    pub fn catalog(&self) -> &MarketCatalog {
        &self.catalog
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Exchange for ScriptedExchange {
    fn id(&self) -> &str {
        "scripted"
    }

    fn page_limit(&self, requested: usize) -> usize {
        match self.max_limit {
            Some(max) => requested.clamp(1, max),
            None => requested.max(1),
        }
    }

    async fn load_markets(&self) -> Result<MarketCatalog> {
        Ok(self.catalog.clone())
    }

    async fn fetch_ohlcv(
        &self,
        market: &Market,
        since: i64,
        limit: usize,
    ) -> Result<Vec<RawCandle>> {
        self.calls.lock().unwrap().push(Call {
            market_id: market.id.clone(),
            since,
            limit,
        });
        self.pages
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// Catalog listing OKX-style `BASE-QUOTE` instruments under unified symbols.
pub fn catalog(symbols: &[&str]) -> MarketCatalog {
    symbols
        .iter()
        .map(|symbol| {
            let (base, quote) = symbol.split_once('/').unwrap();
            Market::new(format!("{base}-{quote}"), base, quote)
        })
        .collect()
}

/// A numeric raw row opening `day` days after [`START_MS`].
pub fn raw_candle(day: i64) -> RawCandle {
    let ts = START_MS + day * DAY_MS;
    let base = 100 + day;
    vec![
        json!(ts),
        json!(base),
        json!(base + 10),
        json!(base - 5),
        json!(format!("{base}.5")),
        json!(1000 + day),
    ]
}

/// `len` consecutive daily rows starting `first_day` days after [`START_MS`].
pub fn page(first_day: i64, len: usize) -> Vec<RawCandle> {
    (0..len as i64).map(|i| raw_candle(first_day + i)).collect()
}

pub fn row(value: Value) -> RawCandle {
    value.as_array().cloned().unwrap()
}
