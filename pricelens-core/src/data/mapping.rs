//! Insertion-ordered ticker → series container shared by the processor and
//! the analysis layer.
//!
//! Components hand the mapping to each other by reference. Only one `&mut`
//! borrow can exist at a time, which is the single-writer discipline the
//! pipeline relies on.

use super::series::PriceSeries;

#[derive(Debug, Clone, Default)]
pub struct DataMapping {
    entries: Vec<(String, PriceSeries)>,
}

impl DataMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace. A replaced ticker keeps its original position.
    pub fn insert(&mut self, ticker: impl Into<String>, series: PriceSeries) -> Option<PriceSeries> {
        let ticker = ticker.into();
        match self.entries.iter_mut().find(|(t, _)| *t == ticker) {
            Some((_, slot)) => Some(std::mem::replace(slot, series)),
            None => {
                self.entries.push((ticker, series));
                None
            }
        }
    }

    pub fn get(&self, ticker: &str) -> Option<&PriceSeries> {
        self.entries
            .iter()
            .find(|(t, _)| t == ticker)
            .map(|(_, s)| s)
    }

    pub fn get_mut(&mut self, ticker: &str) -> Option<&mut PriceSeries> {
        self.entries
            .iter_mut()
            .find(|(t, _)| t == ticker)
            .map(|(_, s)| s)
    }

    pub fn contains(&self, ticker: &str) -> bool {
        self.get(ticker).is_some()
    }

    pub fn tickers(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(t, _)| t.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PriceSeries)> {
        self.entries.iter().map(|(t, s)| (t.as_str(), s))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut PriceSeries)> {
        self.entries.iter_mut().map(|(t, s)| (t.as_str(), s))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::provider::RawBar;
    use chrono::NaiveDate;

    fn series(close: f64) -> PriceSeries {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        PriceSeries::from_bars(vec![RawBar::complete(date, close, close, close, close, 1.0)]).unwrap()
    }

    #[test]
    fn keeps_insertion_order() {
        let mut mapping = DataMapping::new();
        mapping.insert("TSLA", series(1.0));
        mapping.insert("BND", series(2.0));
        mapping.insert("SPY", series(3.0));
        assert_eq!(mapping.tickers().collect::<Vec<_>>(), vec!["TSLA", "BND", "SPY"]);
    }

    #[test]
    fn replace_keeps_position_and_returns_old() {
        let mut mapping = DataMapping::new();
        mapping.insert("TSLA", series(1.0));
        mapping.insert("BND", series(2.0));

        let old = mapping.insert("TSLA", series(5.0)).unwrap();

        assert_eq!(old.close().unwrap(), vec![Some(1.0)]);
        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping.tickers().next(), Some("TSLA"));
        assert_eq!(mapping.get("TSLA").unwrap().close().unwrap(), vec![Some(5.0)]);
    }

    #[test]
    fn lookup_of_unknown_ticker() {
        let mapping = DataMapping::new();
        assert!(mapping.get("QQQ").is_none());
        assert!(!mapping.contains("QQQ"));
        assert!(mapping.is_empty());
    }
}
