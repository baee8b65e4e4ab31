//! Sequential run over every configured exchange and symbol.
//!
//! Each exchange and each symbol is an isolated unit of work: a failure is
//! logged, recorded in the [`RunSummary`] and the loop moves on to the next
//! unit in configuration order.

use std::path::PathBuf;

use tracing::{error, info, warn};

use crate::context::Context;
use crate::exchange::Exchange;
use crate::fetcher::{FetchOptions, fetch_daily_candles};
use crate::models::MarketCatalog;
use crate::storage::write_candles_csv;
use crate::{KandleError, Result};

/// One unit of work that did not complete.
#[derive(Debug)]
pub struct Failure {
    pub exchange: String,
    /// `None` when the whole exchange failed before any symbol ran.
    pub symbol: Option<String>,
    pub error: KandleError,
}

/// Outcome of a full run.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// CSV files written, in processing order.
    pub written: Vec<PathBuf>,
    /// `(exchange, symbol)` pairs that produced no candles.
    pub empty: Vec<(String, String)>,
    pub failures: Vec<Failure>,
}

impl RunSummary {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Fetches and writes every configured (exchange, symbol) pair.
///
/// Never fails as a whole; per-unit errors end up in
/// [`RunSummary::failures`].
pub async fn run(ctx: &Context) -> RunSummary {
    let mut summary = RunSummary::default();
    let options = ctx.fetch_options();

    for exchange_id in &ctx.config.exchanges {
        info!(exchange = %exchange_id, "processing exchange");
        if let Err(e) = run_exchange(ctx, exchange_id, &options, &mut summary).await {
            error!(exchange = %exchange_id, error = %e, "exchange failed, skipping");
            summary.failures.push(Failure {
                exchange: exchange_id.clone(),
                symbol: None,
                error: e,
            });
        }
    }

    info!(
        written = summary.written.len(),
        empty = summary.empty.len(),
        failed = summary.failures.len(),
        "run complete"
    );
    summary
}

async fn run_exchange(
    ctx: &Context,
    exchange_id: &str,
    options: &FetchOptions,
    summary: &mut RunSummary,
) -> Result<()> {
    let exchange = ctx.registry.create(exchange_id, ctx.exchange_settings())?;
    let catalog = exchange.load_markets().await?;
    info!(exchange = exchange_id, markets = catalog.len(), "loaded markets");

    for symbol in &ctx.config.symbols {
        match run_symbol(ctx, exchange.as_ref(), &catalog, symbol, options).await {
            Ok(Some(path)) => summary.written.push(path),
            Ok(None) => summary
                .empty
                .push((exchange_id.to_string(), symbol.clone())),
            Err(e) => {
                error!(exchange = exchange_id, symbol = %symbol, error = %e, "symbol failed, skipping");
                summary.failures.push(Failure {
                    exchange: exchange_id.to_string(),
                    symbol: Some(symbol.clone()),
                    error: e,
                });
            }
        }
    }
    Ok(())
}

/// Fetches one symbol and writes it; `Ok(None)` when there was nothing to
/// write.
async fn run_symbol(
    ctx: &Context,
    exchange: &dyn Exchange,
    catalog: &MarketCatalog,
    symbol: &str,
    options: &FetchOptions,
) -> Result<Option<PathBuf>> {
    let candles = fetch_daily_candles(exchange, catalog, symbol, options).await?;
    if candles.is_empty() {
        warn!(exchange = exchange.id(), symbol, "no candles, nothing written");
        return Ok(None);
    }
    let path = ctx.csv_path(exchange.id(), symbol);
    write_candles_csv(&candles, exchange.id(), symbol, Some(&path)).map(Some)
}
