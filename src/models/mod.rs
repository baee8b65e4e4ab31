//! Shared models for exchange market data.
//!
//! Contains the typed candle ingested from raw exchange rows and the market
//! catalog each exchange adapter loads once.

pub mod candle;
pub mod market;

pub use candle::{Candle, CandleError, RawCandle};
pub use market::{Market, MarketCatalog};
