use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::FrontierError;
use crate::statistics::portfolio::{mat_vec_multiply, vec_dot};
use crate::statistics::ReturnStatistics;
use crate::types::{Allocation, Rate};
use crate::FrontierResult;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Confidence applied to a view that does not state one.
pub const DEFAULT_VIEW_CONFIDENCE: f64 = 0.5;

/// Type of investor view.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ViewType {
    /// The listed assets, equally weighted, return `value`.
    Absolute,
    /// The first asset outperforms the second by `value`.
    Relative,
}

/// An investor view on expected returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct View {
    #[serde(rename = "type")]
    pub view_type: ViewType,
    pub assets: Vec<String>,
    /// Annual return (absolute) or spread (relative).
    pub value: Rate,
    /// Confidence in (0, 1]; higher shrinks the view's uncertainty.
    #[serde(default)]
    pub confidence: Option<f64>,
}

/// Model parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlackLittermanParams {
    /// Prior uncertainty scaling (tau).
    pub tau: f64,
    /// Risk aversion coefficient (delta).
    pub risk_aversion: f64,
    /// Market-capitalization weights or caps, normalized internally;
    /// `None` means equal weights.
    pub market_weights: Option<Vec<f64>>,
}

impl Default for BlackLittermanParams {
    fn default() -> Self {
        BlackLittermanParams {
            tau: 0.05,
            risk_aversion: 2.5,
            market_weights: None,
        }
    }
}

/// Prior and posterior moments of the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlackLittermanPosterior {
    /// Pi = delta * Sigma * w_mkt
    pub equilibrium_returns: Allocation,
    pub posterior_returns: Allocation,
    pub market_weights: Allocation,
    pub views_applied: usize,
    /// Posterior moments ready for the optimizer and frontier generator.
    #[serde(skip)]
    pub statistics: Option<ReturnStatistics>,
}

impl BlackLittermanPosterior {
    pub fn statistics(&self) -> FrontierResult<&ReturnStatistics> {
        self.statistics
            .as_ref()
            .ok_or_else(|| {
                FrontierError::Serialization(
                    "Posterior statistics are not carried through deserialization".into(),
                )
            })
    }
}

// ---------------------------------------------------------------------------
// Main entry point
// ---------------------------------------------------------------------------

/// Blend equilibrium returns implied by `params.market_weights` with
/// `views`.
///
/// Posterior mean:  [(tau Sigma)^-1 + P' Omega^-1 P]^-1 [(tau Sigma)^-1 Pi + P' Omega^-1 Q]
/// Posterior covariance: Sigma + [(tau Sigma)^-1 + P' Omega^-1 P]^-1
///
/// With no views the posterior equals the prior (Pi, Sigma).
pub fn black_litterman(
    prior: &ReturnStatistics,
    views: &[View],
    params: &BlackLittermanParams,
) -> FrontierResult<BlackLittermanPosterior> {
    let universe = prior.universe();
    let n = prior.len();
    validate_params(params)?;

    let w_mkt = market_weights(params.market_weights.as_deref(), n)?;
    let sigma = prior.covariance();

    // 1. Equilibrium returns
    let pi: Vec<f64> = mat_vec_multiply(sigma, &w_mkt)
        .iter()
        .map(|v| params.risk_aversion * v)
        .collect();

    let (posterior_mu, posterior_cov) = if views.is_empty() {
        (pi.clone(), sigma.to_vec())
    } else {
        // 2. Pick matrix, view vector and view uncertainty
        let (p, q) = build_views(prior, views)?;
        let k = views.len();
        let omega_diag: Vec<f64> = (0..k)
            .map(|v| {
                let row: Vec<f64> = p.row(v).iter().copied().collect();
                let var = vec_dot(&row, &mat_vec_multiply(sigma, &row));
                let confidence = views[v].confidence.unwrap_or(DEFAULT_VIEW_CONFIDENCE);
                params.tau * var / confidence
            })
            .collect();
        if let Some((v, _)) = omega_diag.iter().enumerate().find(|(_, w)| !(**w > 0.0)) {
            return Err(FrontierError::Numeric {
                context: format!("view {} has zero uncertainty (riskless pick portfolio)", v),
                value: omega_diag[v],
            });
        }
        let omega_inv = DMatrix::from_diagonal(&DVector::from_iterator(
            k,
            omega_diag.iter().map(|w| 1.0 / w),
        ));

        // 3. Posterior precision and moments
        let sigma_m = DMatrix::from_fn(n, n, |i, j| sigma[i][j]);
        let tau_sigma_inv = (&sigma_m * params.tau).try_inverse().ok_or_else(|| {
            FrontierError::Numeric {
                context: "prior covariance is singular".into(),
                value: 0.0,
            }
        })?;
        let pt_omega_inv = p.transpose() * &omega_inv;
        let precision = &tau_sigma_inv + &pt_omega_inv * &p;
        let m = precision.try_inverse().ok_or_else(|| FrontierError::Numeric {
            context: "posterior precision is singular".into(),
            value: 0.0,
        })?;
        let pi_v = DVector::from_column_slice(&pi);
        let mean = &m * (&tau_sigma_inv * pi_v + pt_omega_inv * q);

        let cov: Vec<Vec<f64>> = (0..n)
            .map(|i| {
                (0..n)
                    .map(|j| sigma[i][j] + 0.5 * (m[(i, j)] + m[(j, i)]))
                    .collect()
            })
            .collect();
        (mean.iter().copied().collect(), cov)
    };

    if posterior_mu.iter().any(|r| !r.is_finite()) {
        return Err(FrontierError::Numeric {
            context: "posterior expected returns".into(),
            value: f64::NAN,
        });
    }

    let to_alloc = |v: &[f64]| -> Allocation {
        universe
            .tickers()
            .iter()
            .cloned()
            .zip(v.iter().copied())
            .collect()
    };
    let statistics =
        ReturnStatistics::from_moments(universe.clone(), posterior_mu.clone(), posterior_cov)?;

    tracing::debug!(views = views.len(), tau = params.tau, "black-litterman posterior computed");

    Ok(BlackLittermanPosterior {
        equilibrium_returns: to_alloc(&pi),
        posterior_returns: to_alloc(&posterior_mu),
        market_weights: to_alloc(&w_mkt),
        views_applied: views.len(),
        statistics: Some(statistics),
    })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn validate_params(params: &BlackLittermanParams) -> FrontierResult<()> {
    if !(params.tau > 0.0 && params.tau.is_finite()) {
        return Err(FrontierError::validation("tau", "Must be positive"));
    }
    if !(params.risk_aversion > 0.0 && params.risk_aversion.is_finite()) {
        return Err(FrontierError::validation("risk_aversion", "Must be positive"));
    }
    Ok(())
}

fn market_weights(raw: Option<&[f64]>, n: usize) -> FrontierResult<Vec<f64>> {
    let Some(raw) = raw else {
        return Ok(vec![1.0 / n as f64; n]);
    };
    if raw.len() != n {
        return Err(FrontierError::validation(
            "market_weights",
            format!("Expected {} weights but got {}", n, raw.len()),
        ));
    }
    if raw.iter().any(|w| !w.is_finite() || *w < 0.0) {
        return Err(FrontierError::validation(
            "market_weights",
            "Weights must be finite and non-negative",
        ));
    }
    let total: f64 = raw.iter().sum();
    if total <= 0.0 {
        return Err(FrontierError::validation(
            "market_weights",
            "Weights must not all be zero",
        ));
    }
    Ok(raw.iter().map(|w| w / total).collect())
}

fn build_views(
    prior: &ReturnStatistics,
    views: &[View],
) -> FrontierResult<(DMatrix<f64>, DVector<f64>)> {
    let universe = prior.universe();
    let n = prior.len();
    let mut p = DMatrix::zeros(views.len(), n);
    let mut q = DVector::zeros(views.len());

    for (v, view) in views.iter().enumerate() {
        let field = format!("views[{}]", v);
        if !view.value.is_finite() {
            return Err(FrontierError::validation(field, "View value must be finite"));
        }
        if let Some(c) = view.confidence {
            if !(c > 0.0 && c <= 1.0) {
                return Err(FrontierError::validation(
                    field,
                    format!("Confidence must lie in (0, 1], got {}", c),
                ));
            }
        }
        let indices = view
            .assets
            .iter()
            .map(|a| {
                universe.index_of(a).ok_or_else(|| {
                    FrontierError::validation(field.clone(), format!("Unknown asset '{}'", a))
                })
            })
            .collect::<FrontierResult<Vec<usize>>>()?;

        match view.view_type {
            ViewType::Absolute => {
                if indices.is_empty() {
                    return Err(FrontierError::validation(field, "Absolute view needs an asset"));
                }
                let share = 1.0 / indices.len() as f64;
                for &i in &indices {
                    p[(v, i)] += share;
                }
            }
            ViewType::Relative => {
                if indices.len() < 2 || indices[0] == indices[1] {
                    return Err(FrontierError::validation(
                        field,
                        "Relative view needs two distinct assets",
                    ));
                }
                p[(v, indices[0])] = 1.0;
                p[(v, indices[1])] = -1.0;
            }
        }
        q[v] = view.value;
    }
    Ok((p, q))
}
