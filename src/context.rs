//! Process-wide state built once at startup.

use std::path::PathBuf;

use reqwest::Client;

use crate::Result;
use crate::config::AppConfig;
use crate::exchange::{ExchangeRegistry, ExchangeSettings};
use crate::fetcher::FetchOptions;
use crate::http::build_client;
use crate::storage::csv_path;

/// Configuration, HTTP client and adapter registry shared by one run.
///
/// Constructed once in `main` and passed by reference to everything that
/// needs it.
pub struct Context {
    pub config: AppConfig,
    pub http: Client,
    pub registry: ExchangeRegistry,
}

impl Context {
    /// Builds a context with the built-in exchange adapters.
    ///
    /// # Errors
    ///
    /// Returns [`KandleError::Config`](crate::KandleError::Config) if the
    /// HTTP client cannot be built from the configuration.
    pub fn new(config: AppConfig) -> Result<Self> {
        Self::with_registry(config, ExchangeRegistry::with_defaults())
    }

    /// Builds a context around a caller-supplied registry.
    ///
    /// # Errors
    ///
    /// Returns [`KandleError::Config`](crate::KandleError::Config) if the
    /// HTTP client cannot be built from the configuration.
    pub fn with_registry(config: AppConfig, registry: ExchangeRegistry) -> Result<Self> {
        let http = build_client(&config.http)?;
        Ok(Self {
            config,
            http,
            registry,
        })
    }

    /// Adapter construction parameters derived from the configuration.
    pub fn exchange_settings(&self) -> ExchangeSettings {
        ExchangeSettings {
            client: self.http.clone(),
            rate_limit: self.config.http.rate_limit,
        }
    }

    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions::from(&self.config.fetch)
    }

    /// Output file for one (exchange, symbol) pair.
    pub fn csv_path(&self, exchange_id: &str, symbol: &str) -> PathBuf {
        csv_path(&self.config.data_dir, exchange_id, symbol)
    }
}
