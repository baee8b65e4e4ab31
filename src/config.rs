//! Application configuration loaded from environment variables.
//!
//! All variables are optional; empty values count as unset:
//! - `PROXY_URL` - HTTP(S) or SOCKS proxy used for every exchange request
//! - `LOG_LEVEL` - `trace`, `debug`, `info`, `warn`, `error` or `fatal`
//! - `APP_ENV` - `development`, `production` or `test`
//! - `EXCHANGES` - comma-separated exchange identifiers (default `okx`)
//! - `SYMBOLS` - comma-separated trading pairs (default `ETH/USDT`)
//! - `DATA_DIR` - output directory for CSV files (default `./data`)
//! - `FETCH_SINCE` - first day to fetch, `YYYY-MM-DD` or epoch milliseconds
//! - `PAGE_LIMIT` - candles requested per page (1..=1000, default 100)
//! - `REQUEST_DELAY_MS` - pause between consecutive pages (default 1000)
//! - `REQUEST_TIMEOUT_SECS` - per-request network timeout (default 30)
//! - `PROXY_CHECK_URL` - target of the `proxy-check` binary
//!
//! Any malformed value fails loading with
//! [`KandleError::Config`](crate::KandleError::Config).

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono::NaiveDate;
use reqwest::Url;

use crate::fetcher::{DEFAULT_PAGE_LIMIT, DEFAULT_REQUEST_DELAY, DEFAULT_SINCE_MS};
use crate::storage::DEFAULT_DATA_DIR;

const DEFAULT_EXCHANGES: &[&str] = &["okx"];
const DEFAULT_SYMBOLS: &[&str] = &["ETH/USDT"];
const MAX_PAGE_LIMIT: usize = 1000;
const DEFAULT_TIMEOUT_SECS: usize = 30;
const DEFAULT_PROXY_CHECK_URL: &str = "https://www.okx.com/api/v5/public/time";

/// Minimum severity of emitted log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    /// Accepted for compatibility; logs at the error level.
    Fatal,
}

impl FromStr for LogLevel {
    type Err = crate::KandleError;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            "fatal" => Ok(Self::Fatal),
            other => Err(crate::KandleError::Config(format!(
                "LOG_LEVEL must be one of trace, debug, info, warn, error, fatal (got {other:?})"
            ))),
        }
    }
}

impl LogLevel {
    /// Returns the `tracing` level this setting filters at.
    pub fn as_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error | Self::Fatal => tracing::Level::ERROR,
        }
    }
}

/// Deployment environment tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
    Test,
}

impl FromStr for Environment {
    type Err = crate::KandleError;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" => Ok(Self::Development),
            "production" => Ok(Self::Production),
            "test" => Ok(Self::Test),
            other => Err(crate::KandleError::Config(format!(
                "APP_ENV must be one of development, production, test (got {other:?})"
            ))),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Test => "test",
        })
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub log_level: LogLevel,
    pub environment: Environment,
    pub exchanges: Vec<String>,
    pub symbols: Vec<String>,
    pub data_dir: PathBuf,
    pub fetch: FetchConfig,
    pub http: HttpConfig,
}

/// Pagination settings applied to every symbol.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Timestamp (ms) of the first candle requested.
    pub since_ms: i64,
    pub page_limit: usize,
    pub request_delay: Duration,
}

/// Settings shared by every outgoing HTTP request.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub proxy_url: Option<Url>,
    pub timeout: Duration,
    /// Enables per-exchange request spacing inside the adapters.
    pub rate_limit: bool,
    pub proxy_check_url: Url,
}

/// Loads the application configuration from the process environment.
///
/// A `.env` file in the working directory is read first when present;
/// variables already set in the environment take precedence over it.
///
/// # Errors
///
/// Returns [`KandleError::Config`](crate::KandleError::Config) if the `.env`
/// file cannot be read or parsed, or if any variable is malformed.
pub fn fetch_config() -> crate::Result<AppConfig> {
    check_env_file(dotenvy::dotenv())?;
    AppConfig::from_lookup(|name| std::env::var(name).ok())
}

/// Accepts a loaded or absent `.env` file and rejects anything else.
fn check_env_file<T>(loaded: Result<T, dotenvy::Error>) -> crate::Result<()> {
    match loaded {
        Ok(_) => Ok(()),
        Err(e) if e.not_found() => Ok(()),
        Err(e) => Err(crate::KandleError::Config(format!("invalid .env file: {e}"))),
    }
}

impl AppConfig {
    /// Builds the configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`KandleError::Config`](crate::KandleError::Config) if any
    /// variable is malformed.
    pub fn from_lookup<F>(lookup: F) -> crate::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|s| !s.trim().is_empty());

        let log_level: LogLevel = var("LOG_LEVEL")
            .map(|s| s.parse::<LogLevel>())
            .transpose()?
            .unwrap_or_default();
        let environment: Environment = var("APP_ENV")
            .map(|s| s.parse::<Environment>())
            .transpose()?
            .unwrap_or_default();

        let exchanges = match var("EXCHANGES") {
            Some(raw) => parse_list("EXCHANGES", &raw)?
                .into_iter()
                .map(|id| id.to_ascii_lowercase())
                .collect(),
            None => DEFAULT_EXCHANGES.iter().map(|s| s.to_string()).collect(),
        };
        let symbols = match var("SYMBOLS") {
            Some(raw) => parse_list("SYMBOLS", &raw)?,
            None => DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect(),
        };

        let data_dir = var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

        let since_ms = match var("FETCH_SINCE") {
            Some(raw) => parse_since(&raw)?,
            None => DEFAULT_SINCE_MS,
        };
        let page_limit = match var("PAGE_LIMIT") {
            Some(raw) => parse_bounded("PAGE_LIMIT", &raw, 1, MAX_PAGE_LIMIT)?,
            None => DEFAULT_PAGE_LIMIT,
        };
        let request_delay = match var("REQUEST_DELAY_MS") {
            Some(raw) => Duration::from_millis(
                parse_bounded("REQUEST_DELAY_MS", &raw, 0, 60_000)? as u64,
            ),
            None => DEFAULT_REQUEST_DELAY,
        };
        let timeout_secs = match var("REQUEST_TIMEOUT_SECS") {
            Some(raw) => parse_bounded("REQUEST_TIMEOUT_SECS", &raw, 1, 3600)?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        let proxy_url = var("PROXY_URL")
            .map(|raw| parse_url("PROXY_URL", &raw, &["http", "https", "socks5", "socks5h"]))
            .transpose()?;
        let proxy_check_url = parse_url(
            "PROXY_CHECK_URL",
            &var("PROXY_CHECK_URL").unwrap_or_else(|| DEFAULT_PROXY_CHECK_URL.to_string()),
            &["http", "https"],
        )?;

        Ok(Self {
            log_level,
            environment,
            exchanges,
            symbols,
            data_dir,
            fetch: FetchConfig {
                since_ms,
                page_limit,
                request_delay,
            },
            http: HttpConfig {
                proxy_url,
                timeout: Duration::from_secs(timeout_secs as u64),
                rate_limit: true,
                proxy_check_url,
            },
        })
    }
}

/// Splits a comma-separated list, trimming entries and dropping empty ones.
fn parse_list(name: &str, raw: &str) -> crate::Result<Vec<String>> {
    let items: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();
    if items.is_empty() {
        return Err(crate::KandleError::Config(format!(
            "{name} must contain at least one entry"
        )));
    }
    Ok(items)
}

fn parse_bounded(name: &str, raw: &str, min: usize, max: usize) -> crate::Result<usize> {
    let value: usize = raw.trim().parse().map_err(|_| {
        crate::KandleError::Config(format!("{name} must be an integer (got {raw:?})"))
    })?;
    if !(min..=max).contains(&value) {
        return Err(crate::KandleError::Config(format!(
            "{name} must be between {min} and {max} (got {value})"
        )));
    }
    Ok(value)
}

/// Accepts either a UTC calendar date or a millisecond timestamp.
fn parse_since(raw: &str) -> crate::Result<i64> {
    let raw = raw.trim();
    if let Ok(ms) = raw.parse::<i64>() {
        if ms < 0 {
            return Err(crate::KandleError::Config(format!(
                "FETCH_SINCE must not be negative (got {ms})"
            )));
        }
        return Ok(ms);
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| {
        crate::KandleError::Config(format!(
            "FETCH_SINCE must be YYYY-MM-DD or epoch milliseconds (got {raw:?}): {e}"
        ))
    })?;
    Ok(date.and_time(chrono::NaiveTime::MIN).and_utc().timestamp_millis())
}

fn parse_url(name: &str, raw: &str, schemes: &[&str]) -> crate::Result<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| crate::KandleError::Config(format!("{name} is not a valid URL: {e}")))?;
    if !schemes.contains(&url.scheme()) {
        return Err(crate::KandleError::Config(format!(
            "{name} scheme must be one of {} (got {:?})",
            schemes.join(", "),
            url.scheme()
        )));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn malformed_env_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "-EXCHANGES okx\n").unwrap();

        let err = check_env_file(dotenvy::from_path(&path)).unwrap_err();
        assert!(matches!(err, crate::KandleError::Config(ref m) if m.contains(".env")));
    }

    #[test]
    fn missing_env_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        assert!(check_env_file(dotenvy::from_path(dir.path().join(".env"))).is_ok());
    }

    fn load(vars: &[(&str, &str)]) -> crate::Result<AppConfig> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn defaults_without_env_vars() {
        let config = load(&[]).unwrap();
        assert_eq!(config.log_level, LogLevel::Info);
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.exchanges, vec!["okx"]);
        assert_eq!(config.symbols, vec!["ETH/USDT"]);
        assert_eq!(config.data_dir, PathBuf::from("./data"));
        assert_eq!(config.fetch.since_ms, 1_577_836_800_000);
        assert_eq!(config.fetch.page_limit, 100);
        assert_eq!(config.fetch.request_delay, Duration::from_millis(1000));
        assert_eq!(config.http.timeout, Duration::from_secs(30));
        assert!(config.http.proxy_url.is_none());
        assert!(config.http.rate_limit);
    }

    #[test]
    fn parses_lists_and_trims_entries() {
        let config = load(&[
            ("EXCHANGES", "OKX, binance ,,kraken"),
            ("SYMBOLS", "BTC/USDT, ETH/USDT"),
        ])
        .unwrap();
        assert_eq!(config.exchanges, vec!["okx", "binance", "kraken"]);
        assert_eq!(config.symbols, vec!["BTC/USDT", "ETH/USDT"]);
    }

    #[test]
    fn rejects_list_of_only_separators() {
        let err = load(&[("SYMBOLS", " , ,")]).unwrap_err();
        assert!(err.to_string().contains("SYMBOLS must contain"));
    }

    #[test]
    fn log_level_accepts_fatal() {
        let config = load(&[("LOG_LEVEL", "FATAL")]).unwrap();
        assert_eq!(config.log_level, LogLevel::Fatal);
        assert_eq!(config.log_level.as_tracing_level(), tracing::Level::ERROR);
    }

    #[test]
    fn rejects_unknown_log_level() {
        let err = load(&[("LOG_LEVEL", "verbose")]).unwrap_err();
        assert!(matches!(err, crate::KandleError::Config(_)));
        assert!(err.to_string().contains("LOG_LEVEL"));
    }

    #[test]
    fn rejects_unknown_environment() {
        let err = load(&[("APP_ENV", "staging")]).unwrap_err();
        assert!(err.to_string().contains("APP_ENV"));
    }

    #[test]
    fn proxy_url_is_validated() {
        let config = load(&[("PROXY_URL", "http://127.0.0.1:7890")]).unwrap();
        assert_eq!(
            config.http.proxy_url.unwrap().as_str(),
            "http://127.0.0.1:7890/"
        );

        assert!(load(&[("PROXY_URL", "not a url")]).is_err());
        assert!(load(&[("PROXY_URL", "ftp://proxy.local")]).is_err());
    }

    #[test]
    fn fetch_since_accepts_date_and_millis() {
        let by_date = load(&[("FETCH_SINCE", "2023-11-14")]).unwrap();
        assert_eq!(by_date.fetch.since_ms, 1_699_920_000_000);

        let by_ms = load(&[("FETCH_SINCE", "1700000000000")]).unwrap();
        assert_eq!(by_ms.fetch.since_ms, 1_700_000_000_000);

        assert!(load(&[("FETCH_SINCE", "14/11/2023")]).is_err());
        assert!(load(&[("FETCH_SINCE", "-5")]).is_err());
    }

    #[test]
    fn page_limit_bounds() {
        assert_eq!(
            load(&[("PAGE_LIMIT", "300")]).unwrap().fetch.page_limit,
            300
        );
        assert!(load(&[("PAGE_LIMIT", "0")]).is_err());
        assert!(load(&[("PAGE_LIMIT", "1001")]).is_err());
        assert!(load(&[("PAGE_LIMIT", "many")]).is_err());
    }

    #[test]
    fn request_delay_may_be_zero() {
        let config = load(&[("REQUEST_DELAY_MS", "0")]).unwrap();
        assert_eq!(config.fetch.request_delay, Duration::ZERO);
        assert!(load(&[("REQUEST_DELAY_MS", "-1")]).is_err());
    }

    #[test]
    fn empty_values_treated_as_absent() {
        let config = load(&[
            ("LOG_LEVEL", ""),
            ("EXCHANGES", "  "),
            ("PROXY_URL", ""),
            ("DATA_DIR", ""),
        ])
        .unwrap();
        assert_eq!(config.log_level, LogLevel::Info);
        assert_eq!(config.exchanges, vec!["okx"]);
        assert!(config.http.proxy_url.is_none());
        assert_eq!(config.data_dir, PathBuf::from("./data"));
    }
}
