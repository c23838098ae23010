//! Data provider trait and structured error types.
//!
//! The DataProvider trait abstracts over price sources (Yahoo Finance, a CSV
//! directory, synthetic bars) so the processor never knows where rows come
//! from and tests can substitute an in-memory source.

use chrono::NaiveDate;
use polars::prelude::PolarsError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raw daily OHLCV row from a provider, before it becomes a frame.
///
/// `None` marks a missing cell. Missing cells are kept as nulls in the frame
/// and imputed by the processor's clean step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBar {
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
}

impl RawBar {
    /// A bar with every field present.
    pub fn complete(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            date,
            open: Some(open),
            high: Some(high),
            low: Some(low),
            close: Some(close),
            volume: Some(volume),
        }
    }
}

/// Structured error types for retrieval and frame construction.
///
/// These are displayable as-is in CLI output.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("provider refused access: {0}")]
    AccessDenied(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("HTTP {status} for {symbol}")]
    Http { symbol: String, status: u16 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("no rows for '{symbol}' between {start} and {end}")]
    NoData {
        symbol: String,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("csv error in {path}: {reason}")]
    Csv { path: String, reason: String },

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("frame error: {0}")]
    Frame(#[from] PolarsError),

    #[error("data error: {0}")]
    Other(String),
}

/// Shape problems in a price frame.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("missing required column: {0}")]
    MissingColumn(String),

    #[error("column {column} is not numeric (found {actual})")]
    NotNumeric { column: String, actual: String },

    #[error("frame has {rows} rows but the date index has {index} entries")]
    LengthMismatch { rows: usize, index: usize },

    #[error("date index is not strictly ascending at position {position}")]
    UnorderedIndex { position: usize },
}

/// Result of a successful fetch for a single symbol.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub symbol: String,
    pub bars: Vec<RawBar>,
    pub source: DataSource,
}

/// Where the data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    YahooFinance,
    CsvImport,
    Synthetic,
}

/// Trait for price sources.
///
/// `start` is inclusive and `end` is exclusive, matching the usual
/// download convention of market data libraries.
pub trait DataProvider {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch daily OHLCV bars for a symbol over a date range.
    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FetchResult, DataError>;
}
