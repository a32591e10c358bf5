use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::error::FrontierError;
use crate::market_data::PriceHistory;
use crate::types::AssetUniverse;
use crate::FrontierResult;

/// Minimum number of period returns needed for a sample covariance.
pub const MIN_RETURN_OBSERVATIONS: usize = 2;

/// Annualized first and second moments of a universe's returns.
///
/// Built once per (universe, date range) and passed explicitly to every
/// optimizer, frontier and recommendation call of that run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnStatistics {
    universe: AssetUniverse,
    expected_returns: Vec<f64>,
    covariance: Vec<Vec<f64>>,
    periods_per_year: f64,
    /// Aligned per-asset period returns, when derived from history.
    #[serde(skip)]
    period_returns: Option<Vec<Vec<f64>>>,
}

/// Derive annualized statistics from a price history.
pub fn compute_statistics(history: &PriceHistory) -> FrontierResult<ReturnStatistics> {
    let universe = history.universe();
    if history.len() < MIN_RETURN_OBSERVATIONS + 1 {
        let ticker = (universe.len() == 1).then(|| universe.tickers()[0].as_str());
        return Err(FrontierError::data(
            ticker,
            format!(
                "{} aligned price observations for [{}]; at least {} required",
                history.len(),
                universe.tickers().join(", "),
                MIN_RETURN_OBSERVATIONS + 1
            ),
        ));
    }
    let ppy = history.frequency().periods_per_year();
    ReturnStatistics::from_period_returns(universe.clone(), history.period_returns(), ppy)
}

impl ReturnStatistics {
    /// Annualize raw period returns: mean x ppy and sample covariance x ppy.
    pub fn from_period_returns(
        universe: AssetUniverse,
        period_returns: Vec<Vec<f64>>,
        periods_per_year: f64,
    ) -> FrontierResult<Self> {
        let n = universe.len();
        if period_returns.len() != n {
            return Err(FrontierError::data(
                None,
                format!("Expected {} return series but got {}", n, period_returns.len()),
            ));
        }
        if !(periods_per_year > 0.0) {
            return Err(FrontierError::validation(
                "periods_per_year",
                "Must be positive",
            ));
        }
        let len = period_returns[0].len();
        for (ticker, series) in universe.tickers().iter().zip(period_returns.iter()) {
            if series.len() != len {
                return Err(FrontierError::data(
                    Some(ticker),
                    format!("{} returns, expected {}", series.len(), len),
                ));
            }
            if series.len() < MIN_RETURN_OBSERVATIONS {
                return Err(FrontierError::data(
                    Some(ticker),
                    format!(
                        "{} return observations; at least {} required",
                        series.len(),
                        MIN_RETURN_OBSERVATIONS
                    ),
                ));
            }
            if series.iter().any(|r| !r.is_finite()) {
                return Err(FrontierError::data(Some(ticker), "Non-finite period return"));
            }
        }

        let expected_returns: Vec<f64> = period_returns
            .iter()
            .map(|s| s.iter().mean() * periods_per_year)
            .collect();

        let mut covariance = vec![vec![0.0; n]; n];
        for i in 0..n {
            for j in i..n {
                let c = period_returns[i]
                    .iter()
                    .covariance(period_returns[j].iter())
                    * periods_per_year;
                covariance[i][j] = c;
                covariance[j][i] = c;
            }
        }

        for (i, ticker) in universe.tickers().iter().enumerate() {
            if covariance[i][i] <= 0.0 {
                return Err(FrontierError::data(
                    Some(ticker),
                    "Zero return variance (constant price series)",
                ));
            }
        }

        Ok(ReturnStatistics {
            universe,
            expected_returns,
            covariance,
            periods_per_year,
            period_returns: Some(period_returns),
        })
    }

    /// Statistics from already-annualized moments (no return series).
    pub fn from_moments(
        universe: AssetUniverse,
        expected_returns: Vec<f64>,
        covariance: Vec<Vec<f64>>,
    ) -> FrontierResult<Self> {
        let n = universe.len();
        if expected_returns.len() != n {
            return Err(FrontierError::validation(
                "expected_returns",
                format!("Expected {} returns but got {}", n, expected_returns.len()),
            ));
        }
        validate_covariance_matrix(&covariance, n)?;
        if expected_returns.iter().any(|r| !r.is_finite()) {
            return Err(FrontierError::validation(
                "expected_returns",
                "Non-finite expected return",
            ));
        }
        Ok(ReturnStatistics {
            universe,
            expected_returns,
            covariance,
            periods_per_year: 1.0,
            period_returns: None,
        })
    }

    pub fn universe(&self) -> &AssetUniverse {
        &self.universe
    }

    pub fn len(&self) -> usize {
        self.universe.len()
    }

    pub fn is_empty(&self) -> bool {
        self.universe.is_empty()
    }

    pub fn expected_returns(&self) -> &[f64] {
        &self.expected_returns
    }

    pub fn covariance(&self) -> &[Vec<f64>] {
        &self.covariance
    }

    pub fn periods_per_year(&self) -> f64 {
        self.periods_per_year
    }

    pub fn period_returns(&self) -> Option<&[Vec<f64>]> {
        self.period_returns.as_deref()
    }

    /// Annualized volatility of each asset on its own.
    pub fn asset_volatilities(&self) -> Vec<f64> {
        (0..self.len())
            .map(|i| self.covariance[i][i].max(0.0).sqrt())
            .collect()
    }

    pub fn correlation_matrix(&self) -> Vec<Vec<f64>> {
        let vols = self.asset_volatilities();
        let n = self.len();
        let mut corr = vec![vec![0.0; n]; n];
        for i in 0..n {
            for j in 0..n {
                let denom = vols[i] * vols[j];
                corr[i][j] = if denom > 0.0 {
                    self.covariance[i][j] / denom
                } else if i == j {
                    1.0
                } else {
                    0.0
                };
            }
        }
        corr
    }
}

#[allow(clippy::needless_range_loop)]
fn validate_covariance_matrix(cov: &[Vec<f64>], n: usize) -> FrontierResult<()> {
    if cov.len() != n {
        return Err(FrontierError::validation(
            "covariance_matrix",
            format!("Expected {}x{} matrix but got {} rows", n, n, cov.len()),
        ));
    }
    for (i, row) in cov.iter().enumerate() {
        if row.len() != n {
            return Err(FrontierError::validation(
                "covariance_matrix",
                format!("Row {} has {} columns, expected {}", i, row.len(), n),
            ));
        }
        if row.iter().any(|v| !v.is_finite()) {
            return Err(FrontierError::validation(
                "covariance_matrix",
                format!("Row {} contains a non-finite entry", i),
            ));
        }
    }
    let tolerance = 1e-9;
    for i in 0..n {
        if cov[i][i] < -tolerance {
            return Err(FrontierError::validation(
                "covariance_matrix",
                format!("Negative variance on diagonal [{},{}]={}", i, i, cov[i][i]),
            ));
        }
        for j in (i + 1)..n {
            if (cov[i][j] - cov[j][i]).abs() > tolerance {
                return Err(FrontierError::validation(
                    "covariance_matrix",
                    format!(
                        "Not symmetric: [{},{}]={} != [{},{}]={}",
                        i, j, cov[i][j], j, i, cov[j][i]
                    ),
                ));
            }
        }
    }
    Ok(())
}
