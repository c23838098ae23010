//! Per-ticker price table.
//!
//! A [`PriceSeries`] is a polars [`DataFrame`] paired with its row index of
//! trading dates. The index is what `clean` materialises into the `Date`
//! column. Rows are ascending by date and dates are unique. Float columns
//! never hold NaN: it is stored as null, so every missing cell is a null.

use super::provider::{DataError, RawBar, SchemaError};
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;

pub const DATE: &str = "Date";
pub const OPEN: &str = "Open";
pub const HIGH: &str = "High";
pub const LOW: &str = "Low";
pub const CLOSE: &str = "Close";
pub const VOLUME: &str = "Volume";
pub const TICKER: &str = "Ticker";
pub const DAILY_RETURN: &str = "Daily_Return";
pub const ROLLING_VOLATILITY: &str = "Rolling_Volatility";

/// Numeric columns every price frame must carry.
pub const PRICE_COLUMNS: [&str; 5] = [OPEN, HIGH, LOW, CLOSE, VOLUME];

/// Days from 0001-01-01 (CE day 1) to 1970-01-01, the polars `Date` epoch.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

pub(crate) fn to_epoch_days(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

pub(crate) fn from_epoch_days(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days.checked_add(UNIX_EPOCH_DAYS_FROM_CE)?)
}

#[derive(Debug, Clone)]
pub struct PriceSeries {
    index: Vec<NaiveDate>,
    frame: DataFrame,
}

impl PriceSeries {
    /// Wrap an existing frame. The frame must carry the price columns as
    /// numbers and have one row per index entry; the index must be strictly
    /// ascending. NaN cells become nulls.
    pub fn new(index: Vec<NaiveDate>, frame: DataFrame) -> Result<Self, DataError> {
        if frame.height() != index.len() {
            return Err(SchemaError::LengthMismatch {
                rows: frame.height(),
                index: index.len(),
            }
            .into());
        }
        if let Some(position) = index.windows(2).position(|w| w[0] >= w[1]) {
            return Err(SchemaError::UnorderedIndex {
                position: position + 1,
            }
            .into());
        }
        for name in PRICE_COLUMNS {
            let column = frame
                .column(name)
                .map_err(|_| SchemaError::MissingColumn(name.to_string()))?;
            let dtype = column.dtype();
            if !(dtype.is_float() || dtype.is_integer()) {
                return Err(SchemaError::NotNumeric {
                    column: name.to_string(),
                    actual: column.dtype().to_string(),
                }
                .into());
            }
        }

        let columns = frame
            .get_columns()
            .iter()
            .map(nan_to_null)
            .collect::<PolarsResult<Vec<_>>>()?;
        Ok(Self {
            index,
            frame: DataFrame::new(columns)?,
        })
    }

    /// Build a series from provider bars: sort by date, keep the first row of
    /// any duplicated date, and store missing cells as nulls (NaN included).
    pub fn from_bars(mut bars: Vec<RawBar>) -> Result<Self, DataError> {
        bars.sort_by_key(|b| b.date);
        bars.dedup_by_key(|b| b.date);

        let index: Vec<NaiveDate> = bars.iter().map(|b| b.date).collect();
        let cell = |v: Option<f64>| v.filter(|x| !x.is_nan());

        let frame = DataFrame::new(vec![
            Column::new(OPEN.into(), bars.iter().map(|b| cell(b.open)).collect::<Vec<_>>()),
            Column::new(HIGH.into(), bars.iter().map(|b| cell(b.high)).collect::<Vec<_>>()),
            Column::new(LOW.into(), bars.iter().map(|b| cell(b.low)).collect::<Vec<_>>()),
            Column::new(CLOSE.into(), bars.iter().map(|b| cell(b.close)).collect::<Vec<_>>()),
            Column::new(VOLUME.into(), bars.iter().map(|b| cell(b.volume)).collect::<Vec<_>>()),
        ])?;

        Self::new(index, frame)
    }

    pub fn index(&self) -> &[NaiveDate] {
        &self.index
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn into_frame(self) -> DataFrame {
        self.frame
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.frame.column(name).is_ok()
    }

    /// Add or replace a column. Its length must match the index. NaN cells
    /// become nulls.
    pub fn set_column(&mut self, column: Column) -> PolarsResult<()> {
        self.frame.with_column(nan_to_null(&column)?)?;
        Ok(())
    }

    /// Stamp the constant `Ticker` column.
    pub fn stamp_ticker(&mut self, ticker: &str) -> PolarsResult<()> {
        let values = vec![ticker; self.len()];
        self.set_column(Column::new(TICKER.into(), values))
    }

    /// (Re)write the `Date` column from the row index.
    pub fn ensure_date_column(&mut self) -> PolarsResult<()> {
        let days: Vec<i32> = self.index.iter().map(|d| to_epoch_days(*d)).collect();
        let column = Column::new(DATE.into(), days).cast(&DataType::Date)?;
        self.set_column(column)
    }

    /// Total number of missing cells (nulls) across every column.
    pub fn missing_count(&self) -> usize {
        self.frame.get_columns().iter().map(|c| c.null_count()).sum()
    }

    /// Forward-fill then backward-fill every column that has gaps.
    pub fn fill_missing(&mut self) -> PolarsResult<()> {
        let mut columns = Vec::with_capacity(self.frame.width());
        for column in self.frame.get_columns() {
            if column.null_count() == 0 {
                columns.push(column.clone());
                continue;
            }
            let filled = column
                .as_materialized_series()
                .fill_null(FillNullStrategy::Forward(None))?
                .fill_null(FillNullStrategy::Backward(None))?;
            columns.push(filled.into_column());
        }
        self.frame = DataFrame::new(columns)?;
        Ok(())
    }

    /// Values of a numeric column as `f64`, with nulls and NaN as `None`.
    pub fn f64_values(&self, name: &str) -> PolarsResult<Vec<Option<f64>>> {
        let column = self.frame.column(name)?.cast(&DataType::Float64)?;
        Ok(column
            .f64()?
            .into_iter()
            .map(|v| v.filter(|x| !x.is_nan()))
            .collect())
    }

    /// Close prices, nulls as `None`.
    pub fn close(&self) -> PolarsResult<Vec<Option<f64>>> {
        self.f64_values(CLOSE)
    }
}

/// Replace NaN with null in a float column; other columns pass through.
fn nan_to_null(column: &Column) -> PolarsResult<Column> {
    if !column.dtype().is_float() {
        return Ok(column.clone());
    }
    let values: Vec<Option<f64>> = column
        .cast(&DataType::Float64)?
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| !x.is_nan()))
        .collect();
    Ok(Column::new(column.name().clone(), values))
}
