use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::FrontierError;
use crate::types::AssetUniverse;
use crate::FrontierResult;

/// Inclusive calendar window of price observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> FrontierResult<Self> {
        if start >= end {
            return Err(FrontierError::validation(
                "date_range",
                format!("Start {} must precede end {}", start, end),
            ));
        }
        Ok(DateRange { start, end })
    }

    /// `years` of history ending at `end`, using 365-day years.
    pub fn lookback(end: NaiveDate, years: u32) -> FrontierResult<Self> {
        let start = end - Duration::days(365 * i64::from(years));
        Self::new(start, end)
    }
}

/// Frequency of price observations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReturnFrequency {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Annual,
}

impl ReturnFrequency {
    /// Number of periods in a year for annualisation
    pub fn periods_per_year(&self) -> f64 {
        match self {
            ReturnFrequency::Daily => 252.0,
            ReturnFrequency::Weekly => 52.0,
            ReturnFrequency::Monthly => 12.0,
            ReturnFrequency::Quarterly => 4.0,
            ReturnFrequency::Annual => 1.0,
        }
    }

    /// Classify by the median calendar gap between consecutive dates.
    /// Weekends and holidays keep trading-day series under 5 days.
    pub fn infer(dates: &[NaiveDate]) -> ReturnFrequency {
        let mut gaps: Vec<i64> = dates
            .windows(2)
            .map(|w| (w[1] - w[0]).num_days())
            .collect();
        if gaps.is_empty() {
            return ReturnFrequency::Daily;
        }
        gaps.sort_unstable();
        let median = gaps[gaps.len() / 2];
        match median {
            i64::MIN..=4 => ReturnFrequency::Daily,
            5..=10 => ReturnFrequency::Weekly,
            11..=45 => ReturnFrequency::Monthly,
            46..=135 => ReturnFrequency::Quarterly,
            _ => ReturnFrequency::Annual,
        }
    }
}

/// Date-indexed price table for a fixed universe. Columns are aligned with
/// the universe order; rows are strictly ascending by date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceHistory {
    universe: AssetUniverse,
    dates: Vec<NaiveDate>,
    columns: Vec<Vec<f64>>,
}

impl PriceHistory {
    pub fn new(
        universe: AssetUniverse,
        dates: Vec<NaiveDate>,
        columns: Vec<Vec<f64>>,
    ) -> FrontierResult<Self> {
        if columns.len() != universe.len() {
            return Err(FrontierError::data(
                None,
                format!(
                    "Expected {} price columns but got {}",
                    universe.len(),
                    columns.len()
                ),
            ));
        }
        if dates.windows(2).any(|w| w[0] >= w[1]) {
            return Err(FrontierError::data(
                None,
                "Observation dates must be strictly ascending",
            ));
        }
        for (ticker, col) in universe.tickers().iter().zip(columns.iter()) {
            if col.len() != dates.len() {
                return Err(FrontierError::data(
                    Some(ticker),
                    format!("{} prices for {} dates", col.len(), dates.len()),
                ));
            }
            if let Some(bad) = col.iter().find(|p| !p.is_finite() || **p <= 0.0) {
                return Err(FrontierError::data(
                    Some(ticker),
                    format!("Price {} is not a positive finite number", bad),
                ));
            }
        }
        Ok(PriceHistory {
            universe,
            dates,
            columns,
        })
    }

    /// Build a history whose period-over-period returns are exactly `returns`
    /// (one series per asset), starting from a price of 100 on `start`.
    pub fn from_returns(
        universe: AssetUniverse,
        start: NaiveDate,
        step_days: i64,
        returns: &[Vec<f64>],
    ) -> FrontierResult<Self> {
        let periods = returns.first().map(|r| r.len()).unwrap_or(0);
        let dates: Vec<NaiveDate> = (0..=periods as i64)
            .map(|i| start + Duration::days(i * step_days))
            .collect();
        let columns = returns
            .iter()
            .map(|series| {
                let mut price = 100.0;
                let mut col = Vec::with_capacity(series.len() + 1);
                col.push(price);
                for r in series {
                    price *= 1.0 + r;
                    col.push(price);
                }
                col
            })
            .collect();
        Self::new(universe, dates, columns)
    }

    pub fn universe(&self) -> &AssetUniverse {
        &self.universe
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn prices(&self, ticker: &str) -> Option<&[f64]> {
        self.universe
            .index_of(ticker)
            .map(|i| self.columns[i].as_slice())
    }

    pub fn frequency(&self) -> ReturnFrequency {
        ReturnFrequency::infer(&self.dates)
    }

    /// Period-over-period percentage change per asset.
    pub fn period_returns(&self) -> Vec<Vec<f64>> {
        self.columns
            .iter()
            .map(|col| col.windows(2).map(|w| w[1] / w[0] - 1.0).collect())
            .collect()
    }

    /// Inner join on date. Tickers of `other` already present here are ignored.
    pub fn join(&self, other: &PriceHistory) -> FrontierResult<PriceHistory> {
        let universe = self.universe.union(&other.universe);
        let extra: Vec<usize> = other
            .universe
            .tickers()
            .iter()
            .enumerate()
            .filter(|(_, t)| !self.universe.contains(t))
            .map(|(i, _)| i)
            .collect();

        let mut dates = Vec::new();
        let mut rows_self = Vec::new();
        let mut rows_other = Vec::new();
        let (mut i, mut j) = (0, 0);
        while i < self.dates.len() && j < other.dates.len() {
            match self.dates[i].cmp(&other.dates[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    dates.push(self.dates[i]);
                    rows_self.push(i);
                    rows_other.push(j);
                    i += 1;
                    j += 1;
                }
            }
        }

        let mut columns: Vec<Vec<f64>> = self
            .columns
            .iter()
            .map(|col| rows_self.iter().map(|&r| col[r]).collect())
            .collect();
        for &k in &extra {
            columns.push(rows_other.iter().map(|&r| other.columns[k][r]).collect());
        }
        PriceHistory::new(universe, dates, columns)
    }
}
