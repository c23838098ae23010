//! CSV directory provider.
//!
//! Layout: `{dir}/{SYMBOL}.csv` with a `Date,Open,High,Low,Close,Volume`
//! header. Empty cells are read as missing values.

use super::provider::{DataError, DataProvider, DataSource, FetchResult, RawBar};
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Open")]
    open: Option<f64>,
    #[serde(rename = "High")]
    high: Option<f64>,
    #[serde(rename = "Low")]
    low: Option<f64>,
    #[serde(rename = "Close")]
    close: Option<f64>,
    #[serde(rename = "Volume")]
    volume: Option<f64>,
}

/// Reads one CSV file per symbol from a directory.
pub struct CsvProvider {
    dir: PathBuf,
}

impl CsvProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn symbol_path(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{symbol}.csv"))
    }

    /// Read every row of a CSV file. Dates accept `YYYY-MM-DD` with an
    /// optional time suffix, as written by most spreadsheet exports.
    fn read_rows(path: &Path) -> Result<Vec<RawBar>, DataError> {
        let csv_err = |reason: String| DataError::Csv {
            path: path.display().to_string(),
            reason,
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| csv_err(e.to_string()))?;

        let mut bars = Vec::new();
        for (line, record) in reader.deserialize::<CsvRow>().enumerate() {
            let row = record.map_err(|e| csv_err(e.to_string()))?;
            let date_part = row.date.get(..10).unwrap_or(&row.date);
            let date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
                .map_err(|e| csv_err(format!("row {}: bad date '{}': {e}", line + 2, row.date)))?;

            bars.push(RawBar {
                date,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: row.volume,
            });
        }
        Ok(bars)
    }
}

impl DataProvider for CsvProvider {
    fn name(&self) -> &str {
        "csv"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FetchResult, DataError> {
        let path = self.symbol_path(symbol);
        if !path.exists() {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }

        let bars: Vec<RawBar> = Self::read_rows(&path)?
            .into_iter()
            .filter(|b| b.date >= start && b.date < end)
            .collect();

        if bars.is_empty() {
            return Err(DataError::NoData {
                symbol: symbol.to_string(),
                start,
                end,
            });
        }

        Ok(FetchResult {
            symbol: symbol.to_string(),
            bars,
            source: DataSource::CsvImport,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::atomic::{AtomicU64, Ordering};

    static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

    fn temp_dir() -> PathBuf {
        let id = TEST_COUNTER.fetch_add(1, Ordering::Relaxed);
        let dir = std::env::temp_dir().join(format!("pricelens_csv_test_{}_{id}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn reads_rows_in_range_with_missing_cells() {
        let dir = temp_dir();
        fs::write(
            dir.join("BND.csv"),
            "Date,Open,High,Low,Close,Volume\n\
             2024-01-02,72.1,72.5,71.9,72.3,1000\n\
             2024-01-03,72.3,,72.0,,1100\n\
             2024-01-04 00:00:00,72.4,72.9,72.2,72.8,1200\n\
             2024-01-05,72.8,73.0,72.5,72.9,900\n",
        )
        .unwrap();

        let provider = CsvProvider::new(&dir);
        let result = provider.fetch("BND", d(2024, 1, 2), d(2024, 1, 5)).unwrap();

        assert_eq!(result.source, DataSource::CsvImport);
        assert_eq!(result.bars.len(), 3); // end is exclusive
        assert_eq!(result.bars[1].close, None);
        assert_eq!(result.bars[1].high, None);
        assert_eq!(result.bars[1].low, Some(72.0));
        assert_eq!(result.bars[2].date, d(2024, 1, 4));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_file_is_symbol_not_found() {
        let dir = temp_dir();
        let provider = CsvProvider::new(&dir);
        let err = provider.fetch("NOPE", d(2024, 1, 1), d(2024, 2, 1)).unwrap_err();
        assert!(matches!(err, DataError::SymbolNotFound { .. }));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn empty_range_is_no_data() {
        let dir = temp_dir();
        fs::write(
            dir.join("SPY.csv"),
            "Date,Open,High,Low,Close,Volume\n2024-01-02,470,472,468,471,5000\n",
        )
        .unwrap();
        let provider = CsvProvider::new(&dir);
        let err = provider.fetch("SPY", d(2023, 1, 1), d(2023, 6, 1)).unwrap_err();
        assert!(matches!(err, DataError::NoData { .. }));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn bad_date_reports_line() {
        let dir = temp_dir();
        fs::write(
            dir.join("SPY.csv"),
            "Date,Open,High,Low,Close,Volume\nyesterday,470,472,468,471,5000\n",
        )
        .unwrap();
        let provider = CsvProvider::new(&dir);
        let err = provider.fetch("SPY", d(2023, 1, 1), d(2025, 1, 1)).unwrap_err();
        assert!(err.to_string().contains("row 2"));
        let _ = fs::remove_dir_all(&dir);
    }
}
