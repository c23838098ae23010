//! Exploratory analysis over a loaded [`DataMapping`].
//!
//! Everything here reads the mapping through a shared borrow. Derived
//! columns come back as a new [`PriceSeries`]; writing them into the mapping
//! is left to the caller.

pub mod decompose;
pub mod summary;
pub mod volatility;

pub use decompose::{
    Decomposition, DecompositionError, DecompositionModel, SeasonalDecomposer, DEFAULT_SEASONAL_PERIOD,
};
pub use summary::SeriesSummary;
pub use volatility::{pct_change, rolling_std, DEFAULT_VOLATILITY_WINDOW};

use crate::data::series::{from_epoch_days, CLOSE, DAILY_RETURN, DATE, ROLLING_VOLATILITY};
use crate::data::{DataMapping, PriceSeries};
use crate::render::{Canvas, RenderError};
use chrono::NaiveDate;
use polars::prelude::*;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("malformed series for {ticker}: {reason}")]
    MalformedSeries { ticker: String, reason: String },

    #[error(transparent)]
    Frame(#[from] PolarsError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

impl AnalysisError {
    fn malformed(ticker: &str, reason: impl Into<String>) -> Self {
        Self::MalformedSeries {
            ticker: ticker.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result of a decomposition attempt. `Unavailable` means the series could
/// not be decomposed (too short, non-positive prices, ...); the reason has
/// already been logged.
#[derive(Debug, Clone)]
pub enum DecompositionOutcome {
    Available(Decomposition),
    Unavailable,
}

impl DecompositionOutcome {
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }

    pub fn decomposition(&self) -> Option<&Decomposition> {
        match self {
            Self::Available(d) => Some(d),
            Self::Unavailable => None,
        }
    }
}

pub struct ExploratoryAnalysis<'a> {
    data: &'a DataMapping,
    decomposer: SeasonalDecomposer,
    volatility_window: usize,
}

impl<'a> ExploratoryAnalysis<'a> {
    pub fn new(data: &'a DataMapping) -> Self {
        Self {
            data,
            decomposer: SeasonalDecomposer::default(),
            volatility_window: DEFAULT_VOLATILITY_WINDOW,
        }
    }

    pub fn with_decomposer(mut self, decomposer: SeasonalDecomposer) -> Self {
        self.decomposer = decomposer;
        self
    }

    pub fn with_volatility_window(mut self, window: usize) -> Self {
        self.volatility_window = window;
        self
    }

    pub fn data(&self) -> &'a DataMapping {
        self.data
    }

    /// Add `Daily_Return` and `Rolling_Volatility` computed from `Close`.
    pub fn calculate_volatility(&self, mut series: PriceSeries) -> Result<PriceSeries, AnalysisError> {
        let returns = pct_change(&series.close()?);
        let volatility = rolling_std(&returns, self.volatility_window);

        series.set_column(Column::new(DAILY_RETURN.into(), returns))?;
        series.set_column(Column::new(ROLLING_VOLATILITY.into(), volatility))?;
        Ok(series)
    }

    /// One line per ticker on a shared figure, then `show()`.
    pub fn plot_closing_prices(&self, canvas: &mut dyn Canvas) -> Result<(), AnalysisError> {
        canvas.figure(1);
        for (ticker, series) in self.data.iter() {
            let close: Vec<f64> = series
                .close()?
                .into_iter()
                .map(|v| v.unwrap_or(f64::NAN))
                .collect();
            canvas.line(series.index(), &close, Some(&format!("{ticker} Closing Price")))?;
        }

        let tickers: Vec<&str> = self.data.tickers().collect();
        canvas.title(&format!("Stock Closing Prices ({})", tickers.join(", ")));
        canvas.x_label("Date");
        canvas.y_label("Price (USD)");
        canvas.legend();
        canvas.show()?;
        Ok(())
    }

    /// Decompose the `Close` column of a cleaned series.
    ///
    /// Shape problems are errors. A series the decomposer rejects (too short
    /// for the period, non-positive prices under the multiplicative model, no
    /// closes at all) yields [`DecompositionOutcome::Unavailable`].
    pub fn decompose_time_series(
        &self,
        series: &PriceSeries,
        ticker: &str,
    ) -> Result<DecompositionOutcome, AnalysisError> {
        let dates = date_column(series, ticker)?;
        let close = filled_close(series, ticker)?;
        if dates.len() != close.len() {
            return Err(AnalysisError::malformed(
                ticker,
                format!("{} dates for {} closes", dates.len(), close.len()),
            ));
        }

        let (kept_dates, values): (Vec<NaiveDate>, Vec<f64>) = dates
            .into_iter()
            .zip(close)
            .filter_map(|(d, v)| v.map(|v| (d, v)))
            .unzip();
        let dropped = series.len() - values.len();
        if dropped > 0 {
            warn!(ticker, dropped, "dropping rows with no close price before decomposition");
        }

        match self.decomposer.decompose(&kept_dates, &values) {
            Ok(decomposition) => {
                debug!(
                    ticker,
                    rows = decomposition.len(),
                    period = decomposition.period,
                    "decomposed close prices"
                );
                Ok(DecompositionOutcome::Available(decomposition))
            }
            Err(e) => {
                warn!(ticker, error = %e, "decomposition unavailable");
                Ok(DecompositionOutcome::Unavailable)
            }
        }
    }

    /// Draw a decomposition under a ticker heading and `show()` it.
    pub fn plot_decomposition(
        &self,
        outcome: &DecompositionOutcome,
        ticker: &str,
        canvas: &mut dyn Canvas,
    ) -> Result<(), AnalysisError> {
        let DecompositionOutcome::Available(decomposition) = outcome else {
            return Ok(());
        };
        decomposition.plot(canvas)?;
        canvas.suptitle(&format!("{ticker} Time Series Decomposition"));
        canvas.show()?;
        Ok(())
    }

    pub fn summaries(&self) -> Result<Vec<SeriesSummary>, AnalysisError> {
        SeriesSummary::for_mapping(self.data)
    }
}

/// Dates from the `Date` column, checked to be present, typed and ascending.
fn date_column(series: &PriceSeries, ticker: &str) -> Result<Vec<NaiveDate>, AnalysisError> {
    let column = series
        .frame()
        .column(DATE)
        .map_err(|_| AnalysisError::malformed(ticker, "no Date column"))?;
    if column.dtype() != &DataType::Date {
        return Err(AnalysisError::malformed(
            ticker,
            format!("Date column has type {}", column.dtype()),
        ));
    }

    let days = column.cast(&DataType::Int32)?;
    let mut dates = Vec::with_capacity(days.len());
    for (row, day) in days.i32()?.into_iter().enumerate() {
        let date = day
            .and_then(from_epoch_days)
            .ok_or_else(|| AnalysisError::malformed(ticker, format!("missing date at row {row}")))?;
        dates.push(date);
    }

    if let Some(row) = dates.windows(2).position(|w| w[0] >= w[1]) {
        return Err(AnalysisError::malformed(
            ticker,
            format!("dates not strictly ascending at row {}", row + 1),
        ));
    }
    Ok(dates)
}

/// `Close` forward-filled then backward-filled; NaN counts as missing.
fn filled_close(series: &PriceSeries, ticker: &str) -> Result<Vec<Option<f64>>, AnalysisError> {
    let column = series
        .frame()
        .column(CLOSE)
        .map_err(|_| AnalysisError::malformed(ticker, "no Close column"))?;
    let dtype = column.dtype();
    if !(dtype.is_float() || dtype.is_integer()) {
        return Err(AnalysisError::malformed(ticker, format!("Close column has type {dtype}")));
    }

    let filled = column
        .cast(&DataType::Float64)?
        .as_materialized_series()
        .fill_null(FillNullStrategy::Forward(None))?
        .fill_null(FillNullStrategy::Backward(None))?;
    Ok(filled
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| x.is_finite()))
        .collect())
}
