use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use super::returns::ReturnStatistics;
use crate::error::FrontierError;
use crate::types::{ensure_aligned, Rate, WeightVector};
use crate::FrontierResult;

/// Risk/return profile of one weight vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioStats {
    pub expected_return: Rate,
    pub volatility: Rate,
    /// (return - rf) / volatility; 0 when volatility is 0.
    pub sharpe_ratio: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub real_return: Option<Rate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub real_sharpe_ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inflation_rate: Option<Rate>,
}

/// Compute portfolio statistics for `weights` over `statistics`.
pub fn portfolio_stats(
    weights: &WeightVector,
    statistics: &ReturnStatistics,
    risk_free_rate: Rate,
    inflation_rate: Option<Rate>,
) -> FrontierResult<PortfolioStats> {
    ensure_aligned(weights.len(), statistics.universe())?;
    let w = weights.as_slice();
    let expected_return = vec_dot(w, statistics.expected_returns());
    let volatility = portfolio_volatility(w, statistics.covariance())?;
    let sharpe_ratio = compute_sharpe(expected_return, risk_free_rate, volatility);

    let (real_return, real_sharpe_ratio) = match inflation_rate {
        Some(infl) => {
            let real_return = real_rate(expected_return, infl);
            let real_rf = real_rate(risk_free_rate, infl);
            (
                Some(real_return),
                Some(compute_sharpe(real_return, real_rf, volatility)),
            )
        }
        None => (None, None),
    };

    Ok(PortfolioStats {
        expected_return,
        volatility,
        sharpe_ratio,
        real_return,
        real_sharpe_ratio,
        inflation_rate,
    })
}

/// Fisher relation: (1 + nominal) / (1 + inflation) - 1.
pub fn real_rate(nominal: Rate, inflation: Rate) -> Rate {
    (1.0 + nominal) / (1.0 + inflation) - 1.0
}

/// Compute Sharpe ratio with division-by-zero guard.
pub fn compute_sharpe(ret: Rate, rf: Rate, risk: Rate) -> f64 {
    if risk <= 0.0 {
        0.0
    } else {
        (ret - rf) / risk
    }
}

/// Portfolio standard deviation: sqrt(w' * Sigma * w).
///
/// Rounding noise below zero is clamped; a clearly negative variance means
/// the covariance is not PSD and is reported as a numeric error.
pub fn portfolio_volatility(w: &[f64], sigma: &[Vec<f64>]) -> FrontierResult<f64> {
    let var = portfolio_variance(w, sigma);
    if !var.is_finite() {
        return Err(FrontierError::Numeric {
            context: "portfolio variance".into(),
            value: var,
        });
    }
    if var >= 0.0 {
        return Ok(var.sqrt());
    }
    let scale = sigma
        .iter()
        .enumerate()
        .map(|(i, row)| row[i].abs())
        .fold(1.0_f64, f64::max);
    if var > -1e-10 * scale {
        Ok(0.0)
    } else {
        Err(FrontierError::Numeric {
            context: "portfolio variance (covariance not positive semidefinite)".into(),
            value: var,
        })
    }
}

pub(crate) fn portfolio_variance(w: &[f64], sigma: &[Vec<f64>]) -> f64 {
    let sigma_w = mat_vec_multiply(sigma, w);
    vec_dot(w, &sigma_w)
}

/// Per-period returns of a fixed-weight portfolio.
pub fn portfolio_period_returns(w: &[f64], period_returns: &[Vec<f64>]) -> Vec<f64> {
    let periods = period_returns.first().map(|r| r.len()).unwrap_or(0);
    (0..periods)
        .map(|t| {
            w.iter()
                .zip(period_returns.iter())
                .map(|(wi, series)| wi * series[t])
                .sum()
        })
        .collect()
}

/// Pearson correlation of two equally long series; `None` when either has
/// zero variance.
pub fn pearson_correlation(a: &[f64], b: &[f64]) -> Option<f64> {
    if a.len() != b.len() || a.len() < 2 {
        return None;
    }
    let sd_a = a.iter().std_dev();
    let sd_b = b.iter().std_dev();
    if !(sd_a > 0.0 && sd_b > 0.0) {
        return None;
    }
    let corr = a.iter().covariance(b.iter()) / (sd_a * sd_b);
    Some(corr.clamp(-1.0, 1.0))
}

/// Herfindahl-Hirschman index of weights.
pub fn hhi_concentration(w: &[f64]) -> f64 {
    w.iter().map(|x| x * x).sum()
}

/// Weighted average asset volatility over portfolio volatility.
pub fn diversification_ratio(w: &[f64], statistics: &ReturnStatistics) -> FrontierResult<f64> {
    let port_vol = portfolio_volatility(w, statistics.covariance())?;
    let weighted: f64 = w
        .iter()
        .zip(statistics.asset_volatilities())
        .map(|(wi, v)| wi * v)
        .sum();
    Ok(if port_vol > 0.0 { weighted / port_vol } else { 1.0 })
}

/// Matrix-vector multiplication.
pub(crate) fn mat_vec_multiply(mat: &[Vec<f64>], v: &[f64]) -> Vec<f64> {
    mat.iter().map(|row| vec_dot(row, v)).collect()
}

/// Dot product.
pub(crate) fn vec_dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}
