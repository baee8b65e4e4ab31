//! Tracing subscriber setup.

use crate::config::{Environment, LogLevel};
use crate::{KandleError, Result};

/// Installs the global `tracing` subscriber.
///
/// Production emits JSON lines, test emits compact uncoloured lines and
/// development uses the default human-readable format.
///
/// # Errors
///
/// Returns [`KandleError::Config`] if a global subscriber is already
/// installed.
pub fn init(level: LogLevel, environment: Environment) -> Result<()> {
    let builder = tracing_subscriber::fmt().with_max_level(level.as_tracing_level());

    let installed = match environment {
        Environment::Production => builder.json().try_init(),
        Environment::Test => builder.compact().with_ansi(false).try_init(),
        Environment::Development => builder.try_init(),
    };

    installed.map_err(|e| KandleError::Config(format!("cannot install tracing subscriber: {e}")))
}
