//! Daily OHLCV history archiver.
//!
//! Loads each configured exchange's market catalog, walks its daily candle
//! history forward page by page, and writes one CSV file per
//! (exchange, symbol) pair.

pub mod config;
pub mod context;
pub mod error;
pub mod exchange;
pub mod fetcher;
pub mod http;
pub mod logging;
pub mod models;
pub mod proxy;
pub mod runner;
pub mod storage;

pub use error::{KandleError, Result};
