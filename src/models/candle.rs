//! Daily OHLCV candle model and its ingestion from raw exchange rows.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::Value;

/// A candle row exactly as an adapter received it:
/// `[timestamp_ms, open, high, low, close, volume, ...]`.
///
/// Fields may be JSON numbers or numeric strings depending on the exchange.
/// Trailing extra columns are ignored.
pub type RawCandle = Vec<Value>;

/// A single daily OHLCV bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candle {
    /// Open time in milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

/// Reasons a raw row cannot become a [`Candle`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CandleError {
    #[error("expected at least 6 columns, got {0}")]
    TooFewColumns(usize),

    #[error("missing or invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("invalid {field}: {value}")]
    InvalidNumber { field: &'static str, value: String },
}

impl CandleError {
    /// Returns `true` when the row's timestamp is the offending column.
    pub fn is_timestamp(&self) -> bool {
        matches!(self, Self::InvalidTimestamp(_))
    }
}

const PRICE_FIELDS: [&str; 5] = ["open", "high", "low", "close", "volume"];

impl Candle {
    /// Validates a raw exchange row and converts it into a typed candle.
    ///
    /// The timestamp must be a positive integer (number or integer string)
    /// that `chrono` can represent as a date.
    /// Price and volume columns keep the exchange's textual precision, so
    /// `"105.250"` stays `105.250`.
    ///
    /// # Errors
    ///
    /// Returns a [`CandleError`] naming the first offending column.
    pub fn from_raw(row: &[Value]) -> Result<Self, CandleError> {
        if row.len() < 6 {
            return Err(CandleError::TooFewColumns(row.len()));
        }

        let timestamp = parse_timestamp(&row[0])
            .ok_or_else(|| CandleError::InvalidTimestamp(row[0].to_string()))?;

        let mut values = [Decimal::ZERO; 5];
        for (i, field) in PRICE_FIELDS.into_iter().enumerate() {
            let raw = &row[i + 1];
            values[i] = parse_decimal(raw).ok_or_else(|| CandleError::InvalidNumber {
                field,
                value: raw.to_string(),
            })?;
        }
        let [open, high, low, close, volume] = values;

        Ok(Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        })
    }
}

fn parse_timestamp(value: &Value) -> Option<i64> {
    let ts = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    // Dates are rendered through chrono, so its range bounds valid timestamps.
    (ts > 0 && chrono::DateTime::from_timestamp_millis(ts).is_some()).then_some(ts)
}

fn parse_decimal(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}
