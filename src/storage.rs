//! CSV persistence of a candle series.
//!
//! Files hold a fixed `timestamp,open,high,low,close,volume` header and one
//! row per candle. The timestamp column is the candle's local calendar date,
//! quoted; the five numeric columns are written exactly as the exchange
//! reported them.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use csv::{QuoteStyle, Terminator, WriterBuilder};
use tracing::{error, info};

use crate::models::Candle;
use crate::{KandleError, Result};

/// Directory CSV files land in when no other location is configured.
pub const DEFAULT_DATA_DIR: &str = "./data";

/// Header line of every candle file.
pub const CSV_HEADER: &str = "timestamp,open,high,low,close,volume\n";

/// Returns `{data_dir}/{exchange}_{symbol}_daily.csv`, with `/` and `\` in
/// the symbol replaced by `-`.
pub fn csv_path(data_dir: &Path, exchange_id: &str, symbol: &str) -> PathBuf {
    let safe_symbol = symbol.replace(['/', '\\'], "-");
    data_dir.join(format!("{exchange_id}_{safe_symbol}_daily.csv"))
}

/// Renders a millisecond timestamp as its local `YYYY-MM-DD` date.
///
/// # Errors
///
/// Returns [`KandleError::MalformedMessage`] if the timestamp is outside the
/// range `chrono` can represent.
pub fn local_date(timestamp_ms: i64) -> Result<String> {
    let utc = DateTime::from_timestamp_millis(timestamp_ms).ok_or_else(|| {
        KandleError::MalformedMessage(format!("timestamp out of range: {timestamp_ms}"))
    })?;
    Ok(utc.with_timezone(&Local).format("%Y-%m-%d").to_string())
}

/// Writes `candles` to `path`, or to the default location under
/// [`DEFAULT_DATA_DIR`] when `path` is `None`.
///
/// Missing parent directories are created and an existing file is
/// overwritten. Returns the path written.
///
/// # Errors
///
/// Filesystem and CSV errors are logged with the target path and returned.
pub fn write_candles_csv(
    candles: &[Candle],
    exchange_id: &str,
    symbol: &str,
    path: Option<&Path>,
) -> Result<PathBuf> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => csv_path(Path::new(DEFAULT_DATA_DIR), exchange_id, symbol),
    };

    write_file(&path, candles).inspect_err(|e| {
        error!(
            exchange = exchange_id,
            symbol,
            path = %path.display(),
            error = %e,
            "failed to write CSV"
        );
    })?;

    info!(
        exchange = exchange_id,
        symbol,
        rows = candles.len(),
        path = %path.display(),
        "wrote CSV"
    );
    Ok(path)
}

fn write_file(path: &Path, candles: &[Candle]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut file = BufWriter::new(File::create(path)?);
    // The header is written raw so only data fields go through quoting.
    file.write_all(CSV_HEADER.as_bytes())?;

    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .quote_style(QuoteStyle::NonNumeric)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(file);

    for candle in candles {
        writer.write_record([
            local_date(candle.timestamp)?,
            candle.open.to_string(),
            candle.high.to_string(),
            candle.low.to_string(),
            candle.close.to_string(),
            candle.volume.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}
