//! Pagination behavior of the daily candle fetcher against a scripted
//! exchange.

mod common;

use std::time::Duration;

use serde_json::json;

use common::{DAY_MS, START_MS, ScriptedExchange, catalog, page, row};
use kandle::KandleError;
use kandle::fetcher::{FetchOptions, fetch_daily_candles};

fn options(limit: usize) -> FetchOptions {
    FetchOptions {
        since: START_MS,
        limit,
        request_delay: Duration::ZERO,
    }
}

#[tokio::test]
async fn stops_after_short_page() {
    let exchange = ScriptedExchange::new(catalog(&["ETH/USDT"]));
    exchange.push_page(page(0, 100));
    exchange.push_page(page(100, 100));
    exchange.push_page(page(200, 37));

    let candles = fetch_daily_candles(&exchange, exchange.catalog(), "ETH/USDT", &options(100))
        .await
        .unwrap();

    assert_eq!(exchange.calls().len(), 3);
    assert_eq!(candles.len(), 237);
    assert!(candles.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
}

#[tokio::test]
async fn cursor_advances_one_ms_past_last_candle() {
    let exchange = ScriptedExchange::new(catalog(&["ETH/USDT"]));
    exchange.push_page(page(0, 2));
    exchange.push_page(page(2, 2));

    fetch_daily_candles(&exchange, exchange.catalog(), "ETH/USDT", &options(2))
        .await
        .unwrap();

    let calls = exchange.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[0].since, START_MS);
    assert_eq!(calls[1].since, START_MS + DAY_MS + 1);
    assert_eq!(calls[2].since, START_MS + 3 * DAY_MS + 1);
    assert!(calls.iter().all(|c| c.market_id == "ETH-USDT" && c.limit == 2));
}

#[tokio::test]
async fn empty_first_page_issues_one_request() {
    let exchange = ScriptedExchange::new(catalog(&["ETH/USDT"]));
    exchange.push_page(Vec::new());

    let candles = fetch_daily_candles(&exchange, exchange.catalog(), "ETH/USDT", &options(100))
        .await
        .unwrap();

    assert_eq!(exchange.calls().len(), 1);
    assert!(candles.is_empty());
}

#[tokio::test]
async fn full_page_followed_by_empty_page() {
    let exchange = ScriptedExchange::new(catalog(&["ETH/USDT"]));
    exchange.push_page(page(0, 100));

    let candles = fetch_daily_candles(&exchange, exchange.catalog(), "ETH/USDT", &options(100))
        .await
        .unwrap();

    assert_eq!(exchange.calls().len(), 2);
    assert_eq!(candles.len(), 100);
}

#[tokio::test]
async fn absent_symbol_returns_empty_without_requests() {
    let exchange = ScriptedExchange::new(catalog(&["BTC/USDT"]));
    exchange.push_page(page(0, 10));

    let candles = fetch_daily_candles(&exchange, exchange.catalog(), "ETH/USDT", &options(100))
        .await
        .unwrap();

    assert!(candles.is_empty());
    assert!(exchange.calls().is_empty());
}

#[tokio::test]
async fn separator_variant_is_resolved_before_fetching() {
    let exchange = ScriptedExchange::new(catalog(&["ETH/USDT"]));
    exchange.push_page(page(0, 3));

    let candles = fetch_daily_candles(&exchange, exchange.catalog(), "ETH/USDT", &options(100))
        .await
        .unwrap();
    assert_eq!(candles.len(), 3);

    // A catalog keyed by dashed symbols still serves a slash request.
    let mut dashed = kandle::models::MarketCatalog::new();
    dashed.insert_as(
        "ETH-USDT",
        kandle::models::Market::new("ETH-USDT", "ETH", "USDT"),
    );
    let exchange = ScriptedExchange::new(dashed);
    exchange.push_page(page(0, 1));
    let candles = fetch_daily_candles(&exchange, exchange.catalog(), "ETH/USDT", &options(100))
        .await
        .unwrap();
    assert_eq!(candles.len(), 1);
    assert_eq!(exchange.calls()[0].market_id, "ETH-USDT");
}

#[tokio::test]
async fn invalid_last_timestamp_keeps_accumulated_candles() {
    let exchange = ScriptedExchange::new(catalog(&["ETH/USDT"]));
    exchange.push_page(page(0, 3));
    let mut second = page(3, 2);
    second.push(row(json!([null, 1, 1, 1, 1, 1])));
    exchange.push_page(second);
    exchange.push_page(page(10, 3));

    let candles = fetch_daily_candles(&exchange, exchange.catalog(), "ETH/USDT", &options(3))
        .await
        .unwrap();

    assert_eq!(exchange.calls().len(), 2);
    assert_eq!(candles.len(), 5);
    assert_eq!(candles.last().unwrap().timestamp, START_MS + 4 * DAY_MS);
}

#[tokio::test]
async fn adapter_errors_propagate_unchanged() {
    let exchange = ScriptedExchange::new(catalog(&["ETH/USDT"]));
    exchange.push_page(page(0, 2));
    exchange.push_error(KandleError::RateLimited("okx 50011: Too Many Requests".into()));

    let err = fetch_daily_candles(&exchange, exchange.catalog(), "ETH/USDT", &options(2))
        .await
        .unwrap_err();

    assert!(matches!(err, KandleError::RateLimited(ref m) if m.contains("50011")));
    assert_eq!(exchange.calls().len(), 2);
}

#[tokio::test]
async fn network_error_on_first_page() {
    let exchange = ScriptedExchange::new(catalog(&["ETH/USDT"]));
    exchange.push_error(KandleError::Network("okx request timed out".into()));

    let err = fetch_daily_candles(&exchange, exchange.catalog(), "ETH/USDT", &options(100))
        .await
        .unwrap_err();

    assert!(matches!(err, KandleError::Network(_)));
}

#[tokio::test]
async fn short_page_is_measured_against_exchange_cap() {
    let exchange = ScriptedExchange::new(catalog(&["ETH/USDT"])).with_max_limit(100);
    exchange.push_page(page(0, 100));
    exchange.push_page(page(100, 5));

    let candles = fetch_daily_candles(&exchange, exchange.catalog(), "ETH/USDT", &options(500))
        .await
        .unwrap();

    let calls = exchange.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].limit, 100);
    assert_eq!(candles.len(), 105);
}

#[tokio::test]
async fn waits_between_requests() {
    let exchange = ScriptedExchange::new(catalog(&["ETH/USDT"]));
    exchange.push_page(page(0, 1));
    exchange.push_page(page(1, 1));

    let opts = FetchOptions {
        request_delay: Duration::from_millis(50),
        ..options(1)
    };
    let start = std::time::Instant::now();
    fetch_daily_candles(&exchange, exchange.catalog(), "ETH/USDT", &opts)
        .await
        .unwrap();

    // Three requests, two pauses.
    assert_eq!(exchange.calls().len(), 3);
    assert!(start.elapsed() >= Duration::from_millis(100));
}

#[tokio::test]
async fn out_of_range_timestamp_stops_without_overflow() {
    let exchange = ScriptedExchange::new(catalog(&["ETH/USDT"]));
    let mut first = page(0, 1);
    first.push(row(json!(["9223372036854775807", 1, 1, 1, 1, 1])));
    exchange.push_page(first);
    exchange.push_page(page(5, 2));

    let candles = fetch_daily_candles(&exchange, exchange.catalog(), "ETH/USDT", &options(2))
        .await
        .unwrap();

    assert_eq!(exchange.calls().len(), 1);
    assert_eq!(candles.len(), 1);
    assert_eq!(candles[0].timestamp, START_MS);
}
