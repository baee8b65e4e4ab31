//! Exchange adapters and the registry that builds them by identifier.
//!
//! Every adapter speaks one exchange's public REST API behind the uniform
//! [`Exchange`] trait:
//! - [`okx`] - OKX v5 (`history-candles`, newest first)
//! - [`binance`] - Binance spot v3 (`klines`, oldest first)
//! - [`kraken`] - Kraken public REST (`OHLC`, second timestamps)

pub mod binance;
pub mod kraken;
pub mod okx;

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::Client;

use crate::models::{Market, MarketCatalog, RawCandle};
use crate::{KandleError, Result};

/// Uniform view over one exchange's market listing and daily candle history.
#[async_trait]
pub trait Exchange: Send + Sync {
    /// Registry identifier, e.g. `"okx"`.
    fn id(&self) -> &str;

    /// Largest page this exchange serves for a requested page size.
    ///
    /// The fetcher compares page lengths against this value to detect the
    /// final page, so adapters with a hard cap must override it.
    fn page_limit(&self, requested: usize) -> usize {
        requested.max(1)
    }

    /// Loads every spot market the exchange lists.
    async fn load_markets(&self) -> Result<MarketCatalog>;

    /// Fetches up to `limit` daily candles whose open time is at or after
    /// `since` (milliseconds), oldest first.
    ///
    /// Rows are returned unvalidated in `[ts_ms, open, high, low, close,
    /// volume]` column order.
    async fn fetch_ohlcv(&self, market: &Market, since: i64, limit: usize)
    -> Result<Vec<RawCandle>>;
}

/// Construction parameters shared by every adapter.
#[derive(Debug, Clone)]
pub struct ExchangeSettings {
    /// Client carrying the configured proxy and per-request timeout.
    pub client: Client,
    /// Spaces requests according to the exchange's published limits.
    pub rate_limit: bool,
}

/// Builds one adapter instance.
pub type ExchangeFactory = fn(ExchangeSettings) -> Box<dyn Exchange>;

/// Maps exchange identifiers to adapter factories.
#[derive(Clone, Default)]
pub struct ExchangeRegistry {
    factories: BTreeMap<String, ExchangeFactory>,
}

impl ExchangeRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding every built-in adapter.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(okx::ID, okx::create);
        registry.register(binance::ID, binance::create);
        registry.register(kraken::ID, kraken::create);
        registry
    }

    /// Registers `factory` under `id`, replacing any previous entry.
    pub fn register(&mut self, id: &str, factory: ExchangeFactory) {
        self.factories.insert(id.to_ascii_lowercase(), factory);
    }

    /// Builds the adapter registered under `id` (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`KandleError::UnsupportedExchange`] if nothing is registered
    /// under `id`.
    pub fn create(&self, id: &str, settings: ExchangeSettings) -> Result<Box<dyn Exchange>> {
        let factory = self
            .factories
            .get(&id.to_ascii_lowercase())
            .ok_or_else(|| KandleError::UnsupportedExchange(id.to_string()))?;
        Ok(factory(settings))
    }

    /// Returns `true` if an adapter is registered under `id`.
    pub fn contains(&self, id: &str) -> bool {
        self.factories.contains_key(&id.to_ascii_lowercase())
    }

    /// Registered identifiers in lexical order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

/// Renders a JSON value for error messages without quoting strings.
pub(crate) fn describe(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
