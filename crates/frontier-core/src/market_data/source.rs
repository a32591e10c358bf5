use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};

use super::history::{DateRange, PriceHistory};
use crate::error::FrontierError;
use crate::types::AssetUniverse;
use crate::FrontierResult;

/// External market-data collaborator. Implementations may block; the core
/// calls `fetch` only at the orchestrator boundary.
pub trait PriceSource {
    /// Prices for every ticker of `universe` inside `range`, aligned on the
    /// dates common to all of them. A ticker without data is a `Data` error
    /// naming it.
    fn fetch(&self, universe: &AssetUniverse, range: &DateRange) -> FrontierResult<PriceHistory>;
}

/// Price source backed by per-ticker series held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPriceSource {
    series: HashMap<String, BTreeMap<NaiveDate, f64>>,
}

impl InMemoryPriceSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        ticker: &str,
        observations: impl IntoIterator<Item = (NaiveDate, f64)>,
    ) {
        self.series
            .entry(ticker.to_string())
            .or_default()
            .extend(observations);
    }

    pub fn with_series(
        mut self,
        ticker: &str,
        observations: impl IntoIterator<Item = (NaiveDate, f64)>,
    ) -> Self {
        self.insert(ticker, observations);
        self
    }

    /// Tickers with at least one observation, sorted.
    pub fn tickers(&self) -> Vec<String> {
        let mut t: Vec<String> = self.series.keys().cloned().collect();
        t.sort();
        t
    }
}

impl PriceSource for InMemoryPriceSource {
    fn fetch(&self, universe: &AssetUniverse, range: &DateRange) -> FrontierResult<PriceHistory> {
        let mut selected = Vec::with_capacity(universe.len());
        for ticker in universe.tickers() {
            let series = self.series.get(ticker).ok_or_else(|| {
                FrontierError::data(Some(ticker), "No price data available")
            })?;
            let window: BTreeMap<NaiveDate, f64> = series
                .range(range.start..=range.end)
                .map(|(d, p)| (*d, *p))
                .collect();
            if window.is_empty() {
                return Err(FrontierError::data(
                    Some(ticker),
                    format!("No observations between {} and {}", range.start, range.end),
                ));
            }
            selected.push(window);
        }

        // Dates observed for every ticker
        let dates: Vec<NaiveDate> = selected[0]
            .keys()
            .filter(|d| selected.iter().all(|s| s.contains_key(d)))
            .copied()
            .collect();
        let columns = selected
            .iter()
            .map(|s| dates.iter().filter_map(|d| s.get(d).copied()).collect())
            .collect();
        PriceHistory::new(universe.clone(), dates, columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn test_fetch_aligns_common_dates() {
        let src = InMemoryPriceSource::new()
            .with_series("A", vec![(d(1), 1.0), (d(2), 2.0), (d(3), 3.0)])
            .with_series("B", vec![(d(2), 5.0), (d(3), 6.0), (d(4), 7.0)]);
        let universe = AssetUniverse::from_strs(&["B", "A"]).unwrap();
        let range = DateRange::new(d(1), d(31)).unwrap();
        let h = src.fetch(&universe, &range).unwrap();
        assert_eq!(h.dates(), &[d(2), d(3)]);
        assert_eq!(h.prices("A").unwrap(), &[2.0, 3.0]);
        assert_eq!(h.prices("B").unwrap(), &[5.0, 6.0]);
    }

    #[test]
    fn test_fetch_unknown_ticker_is_data_error() {
        let src = InMemoryPriceSource::new().with_series("A", vec![(d(1), 1.0)]);
        let universe = AssetUniverse::from_strs(&["A", "ZZZ"]).unwrap();
        let range = DateRange::new(d(1), d(31)).unwrap();
        let err = src.fetch(&universe, &range).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::DataError);
        assert!(err.to_string().contains("ZZZ"));
    }

    #[test]
    fn test_fetch_respects_range() {
        let src = InMemoryPriceSource::new()
            .with_series("A", vec![(d(1), 1.0), (d(10), 2.0), (d(20), 3.0)]);
        let universe = AssetUniverse::from_strs(&["A"]).unwrap();
        let range = DateRange::new(d(5), d(25)).unwrap();
        let h = src.fetch(&universe, &range).unwrap();
        assert_eq!(h.len(), 2);
    }

    #[test]
    fn test_tickers_sorted() {
        let mut src = InMemoryPriceSource::new().with_series("SPY", vec![(d(1), 1.0)]);
        src.insert("GLD", vec![(d(2), 2.0)]);
        assert_eq!(src.tickers(), vec!["GLD".to_string(), "SPY".to_string()]);
    }
}
