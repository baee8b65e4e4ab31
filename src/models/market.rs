//! Market catalog models.

use std::collections::BTreeMap;

/// Reference data for a single tradable spot instrument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Market {
    /// Exchange-native instrument identifier used in REST requests
    /// (`ETH-USDT` on OKX, `ETHUSDT` on Binance, `XETHZUSD` on Kraken).
    pub id: String,
    /// Unified `BASE/QUOTE` symbol.
    pub symbol: String,
    pub base: String,
    pub quote: String,
}

impl Market {
    /// Builds a market whose unified symbol is `base/quote`.
    pub fn new(id: impl Into<String>, base: impl Into<String>, quote: impl Into<String>) -> Self {
        let base = base.into();
        let quote = quote.into();
        Self {
            id: id.into(),
            symbol: format!("{base}/{quote}"),
            base,
            quote,
        }
    }
}

/// Markets an exchange lists, keyed by symbol.
///
/// Loaded once per adapter instance and only consulted for existence checks
/// and to translate a symbol into the exchange's instrument id.
#[derive(Debug, Clone, Default)]
pub struct MarketCatalog {
    markets: BTreeMap<String, Market>,
}

impl MarketCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a market under its unified symbol, replacing any previous entry.
    pub fn insert(&mut self, market: Market) {
        self.markets.insert(market.symbol.clone(), market);
    }

    /// Adds a market under an explicit key instead of its unified symbol.
    pub fn insert_as(&mut self, key: impl Into<String>, market: Market) {
        self.markets.insert(key.into(), market);
    }

    pub fn get(&self, symbol: &str) -> Option<&Market> {
        self.markets.get(symbol)
    }

    /// Returns the stored key alongside the market.
    pub fn get_key_value(&self, symbol: &str) -> Option<(&str, &Market)> {
        self.markets
            .get_key_value(symbol)
            .map(|(key, market)| (key.as_str(), market))
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.markets.contains_key(symbol)
    }

    pub fn len(&self) -> usize {
        self.markets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markets.is_empty()
    }

    /// Iterates symbols in lexical order.
    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.markets.keys().map(String::as_str)
    }
}

impl FromIterator<Market> for MarketCatalog {
    fn from_iter<I: IntoIterator<Item = Market>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for market in iter {
            catalog.insert(market);
        }
        catalog
    }
}
