//! Load and clean orchestration.
//!
//! `load` walks the ticker list in order, fetching each symbol from the
//! provider and stamping its `Ticker` column. The first fetch failure aborts
//! the whole load. `clean` imputes gaps and materialises the `Date` column.

use super::mapping::DataMapping;
use super::provider::{DataError, DataProvider};
use super::series::PriceSeries;
use chrono::NaiveDate;
use tracing::{debug, info};

pub struct DataProcessor {
    tickers: Vec<String>,
    start: NaiveDate,
    end: NaiveDate,
    data: DataMapping,
}

impl DataProcessor {
    /// The ticker list is fixed here. `start <= end` is the provider's
    /// concern and is not checked.
    pub fn new<I, S>(tickers: I, start: NaiveDate, end: NaiveDate) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tickers: tickers.into_iter().map(Into::into).collect(),
            start,
            end,
            data: DataMapping::new(),
        }
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn data(&self) -> &DataMapping {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut DataMapping {
        &mut self.data
    }

    pub fn into_data(self) -> DataMapping {
        self.data
    }

    /// Fetch every ticker, one after another.
    pub fn load(&mut self, provider: &dyn DataProvider) -> Result<&DataMapping, DataError> {
        let total = self.tickers.len();
        for (i, ticker) in self.tickers.iter().enumerate() {
            info!(
                "[{}/{}] fetching {ticker} from {} ({} to {})",
                i + 1,
                total,
                provider.name(),
                self.start,
                self.end
            );
            let fetched = provider.fetch(ticker, self.start, self.end)?;
            let mut series = PriceSeries::from_bars(fetched.bars)?;
            series.stamp_ticker(ticker)?;
            debug!(%ticker, rows = series.len(), source = ?fetched.source, "loaded");
            self.data.insert(ticker.clone(), series);
        }
        Ok(&self.data)
    }

    /// Clean every loaded series in place.
    pub fn clean(&mut self) -> Result<&DataMapping, DataError> {
        clean_mapping(&mut self.data)?;
        Ok(&self.data)
    }
}

/// Impute gaps and write the `Date` column for every series in a mapping.
///
/// A series with no missing cell skips both fill passes. The `Date` column is
/// rewritten regardless.
pub fn clean_mapping(data: &mut DataMapping) -> Result<(), DataError> {
    for (ticker, series) in data.iter_mut() {
        let missing = series.missing_count();
        if missing > 0 {
            debug!(%ticker, missing, "forward/backward filling");
            series.fill_missing()?;
        }
        series.ensure_date_column()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::provider::{DataSource, FetchResult, RawBar};
    use crate::data::series::{CLOSE, DATE, TICKER};
    use std::cell::RefCell;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    /// Serves canned bars and records the order of requests.
    struct StubProvider {
        calls: RefCell<Vec<String>>,
        fail_on: Option<&'static str>,
    }

    impl StubProvider {
        fn new() -> Self {
            Self {
                calls: RefCell::new(Vec::new()),
                fail_on: None,
            }
        }
    }

    impl DataProvider for StubProvider {
        fn name(&self) -> &str {
            "stub"
        }

        fn fetch(&self, symbol: &str, start: NaiveDate, _end: NaiveDate) -> Result<FetchResult, DataError> {
            self.calls.borrow_mut().push(symbol.to_string());
            if self.fail_on == Some(symbol) {
                return Err(DataError::SymbolNotFound {
                    symbol: symbol.to_string(),
                });
            }
            let bars = (0..3)
                .map(|i| {
                    let close = if i == 1 { None } else { Some(10.0 + i as f64) };
                    RawBar {
                        date: start + chrono::Duration::days(i),
                        open: Some(10.0),
                        high: Some(12.0),
                        low: Some(9.0),
                        close,
                        volume: Some(100.0),
                    }
                })
                .collect();
            Ok(FetchResult {
                symbol: symbol.to_string(),
                bars,
                source: DataSource::Synthetic,
            })
        }
    }

    #[test]
    fn load_fetches_in_order_and_stamps_ticker() {
        let provider = StubProvider::new();
        let mut processor = DataProcessor::new(["TSLA", "BND", "SPY"], d(2024, 1, 2), d(2024, 2, 1));

        let data = processor.load(&provider).unwrap();

        assert_eq!(data.tickers().collect::<Vec<_>>(), vec!["TSLA", "BND", "SPY"]);
        assert_eq!(*provider.calls.borrow(), vec!["TSLA", "BND", "SPY"]);
        let bnd = data.get("BND").unwrap();
        let ticker = bnd.frame().column(TICKER).unwrap().str().unwrap().get(0);
        assert_eq!(ticker, Some("BND"));
        // Date column only appears after clean
        assert!(!bnd.has_column(DATE));
    }

    #[test]
    fn load_aborts_on_first_failure() {
        let provider = StubProvider {
            calls: RefCell::new(Vec::new()),
            fail_on: Some("BND"),
        };
        let mut processor = DataProcessor::new(["TSLA", "BND", "SPY"], d(2024, 1, 2), d(2024, 2, 1));

        let err = processor.load(&provider).unwrap_err();

        assert!(matches!(err, DataError::SymbolNotFound { ref symbol } if symbol == "BND"));
        assert_eq!(*provider.calls.borrow(), vec!["TSLA", "BND"]);
        assert_eq!(processor.data().len(), 1);
    }

    #[test]
    fn clean_fills_gaps_and_adds_date() {
        let provider = StubProvider::new();
        let mut processor = DataProcessor::new(["TSLA"], d(2024, 1, 2), d(2024, 2, 1));
        processor.load(&provider).unwrap();

        let data = processor.clean().unwrap();
        let series = data.get("TSLA").unwrap();

        assert_eq!(series.missing_count(), 0);
        assert_eq!(series.close().unwrap(), vec![Some(10.0), Some(10.0), Some(12.0)]);
        assert!(series.has_column(DATE));
        assert!(series.has_column(CLOSE));
    }

    #[test]
    fn clean_twice_is_a_no_op() {
        let provider = StubProvider::new();
        let mut processor = DataProcessor::new(["TSLA", "SPY"], d(2024, 1, 2), d(2024, 2, 1));
        processor.load(&provider).unwrap();
        let first = processor.clean().unwrap().clone();
        let second = processor.clean().unwrap();

        for (ticker, series) in first.iter() {
            assert!(series.frame().equals_missing(second.get(ticker).unwrap().frame()));
        }
    }

    #[test]
    fn clean_fills_nan_in_externally_built_frame() {
        use crate::data::series::{HIGH, LOW, OPEN, VOLUME};
        use polars::prelude::*;

        let frame = df!(
            OPEN => &[1.0, 2.0, 3.0],
            HIGH => &[1.0, 2.0, 3.0],
            LOW => &[1.0, 2.0, 3.0],
            CLOSE => &[1.0, f64::NAN, 3.0],
            VOLUME => &[100.0, 100.0, 100.0],
        )
        .unwrap();
        let series = PriceSeries::new(vec![d(2024, 1, 2), d(2024, 1, 3), d(2024, 1, 4)], frame).unwrap();
        let mut data = DataMapping::new();
        data.insert("SPY", series);

        clean_mapping(&mut data).unwrap();

        let series = data.get("SPY").unwrap();
        assert_eq!(series.missing_count(), 0);
        assert_eq!(series.close().unwrap(), vec![Some(1.0), Some(1.0), Some(3.0)]);
    }
}
