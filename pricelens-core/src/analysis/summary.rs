//! Per-ticker descriptive statistics.

use super::volatility::pct_change;
use super::AnalysisError;
use crate::data::series::{DAILY_RETURN, ROLLING_VOLATILITY};
use crate::data::{DataMapping, PriceSeries};
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesSummary {
    pub ticker: String,
    pub rows: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub last_close: Option<f64>,
    pub mean_daily_return: Option<f64>,
    /// Last defined `Rolling_Volatility`; `None` before volatility is computed.
    pub latest_volatility: Option<f64>,
}

impl SeriesSummary {
    pub fn from_series(ticker: &str, series: &PriceSeries) -> Result<Self, AnalysisError> {
        let close = series.close()?;
        let returns = if series.has_column(DAILY_RETURN) {
            series.f64_values(DAILY_RETURN)?
        } else {
            pct_change(&close)
        };
        let latest_volatility = if series.has_column(ROLLING_VOLATILITY) {
            last_defined(&series.f64_values(ROLLING_VOLATILITY)?)
        } else {
            None
        };

        let defined: Vec<f64> = returns.iter().flatten().copied().collect();
        let mean_daily_return = if defined.is_empty() {
            None
        } else {
            Some(defined.iter().sum::<f64>() / defined.len() as f64)
        };

        Ok(Self {
            ticker: ticker.to_string(),
            rows: series.len(),
            first_date: series.index().first().copied(),
            last_date: series.index().last().copied(),
            last_close: last_defined(&close),
            mean_daily_return,
            latest_volatility,
        })
    }

    /// One summary per ticker, in mapping order.
    pub fn for_mapping(data: &DataMapping) -> Result<Vec<Self>, AnalysisError> {
        data.iter()
            .map(|(ticker, series)| Self::from_series(ticker, series))
            .collect()
    }
}

fn last_defined(values: &[Option<f64>]) -> Option<f64> {
    values.iter().rev().find_map(|v| *v)
}
