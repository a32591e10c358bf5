//! Geometry of the long-only budget set {l <= w <= 1, sum(w) = 1}.

use crate::statistics::portfolio::{compute_sharpe, mat_vec_multiply, portfolio_variance, vec_dot};

/// Upper bound on every weight.
pub(crate) const MAX_WEIGHT: f64 = 1.0;

/// Slack allowed when checking a solver iterate against the constraints.
pub(crate) const FEASIBILITY_TOLERANCE: f64 = 1e-6;

/// Euclidean projection of `v` onto {lower <= w <= MAX_WEIGHT, sum(w) = 1}.
///
/// w_i(tau) = clamp(v_i - tau, l_i, 1) is non-increasing in tau, so the
/// shift that restores the budget is found by bisection. Requires
/// sum(lower) <= 1.
pub(crate) fn project_to_budget(v: &[f64], lower: &[f64]) -> Vec<f64> {
    let shifted = |tau: f64| -> Vec<f64> {
        v.iter()
            .zip(lower)
            .map(|(vi, li)| (vi - tau).clamp(*li, MAX_WEIGHT))
            .collect()
    };
    let total = |tau: f64| -> f64 { shifted(tau).iter().sum() };

    let mut lo = v
        .iter()
        .map(|vi| vi - MAX_WEIGHT)
        .fold(f64::INFINITY, f64::min);
    let mut hi = v
        .iter()
        .zip(lower)
        .map(|(vi, li)| vi - li)
        .fold(f64::NEG_INFINITY, f64::max);
    if !(lo.is_finite() && hi.is_finite()) {
        return lower.to_vec();
    }
    // total(lo) = n >= 1 and total(hi) = sum(lower) <= 1
    for _ in 0..200 {
        let mid = 0.5 * (lo + hi);
        if total(mid) > 1.0 {
            lo = mid;
        } else {
            hi = mid;
        }
        if hi - lo < 1e-15 {
            break;
        }
    }
    let mut w = shifted(0.5 * (lo + hi));
    absorb_residual(&mut w, lower);
    w
}

/// Push the remaining budget error onto coordinates with slack so the
/// weights sum to one to machine precision.
fn absorb_residual(w: &mut [f64], lower: &[f64]) {
    let residual = 1.0 - w.iter().sum::<f64>();
    if residual == 0.0 {
        return;
    }
    let idx = if residual > 0.0 {
        (0..w.len())
            .filter(|&i| w[i] + residual <= MAX_WEIGHT)
            .max_by(|&a, &b| w[a].total_cmp(&w[b]))
    } else {
        (0..w.len())
            .filter(|&i| w[i] + residual >= lower[i])
            .max_by(|&a, &b| w[a].total_cmp(&w[b]))
    };
    if let Some(i) = idx {
        w[i] += residual;
    }
}

/// Largest deviation of `w` from the budget set.
pub(crate) fn constraint_violation(w: &[f64], lower: &[f64]) -> f64 {
    let budget = (w.iter().sum::<f64>() - 1.0).abs();
    w.iter()
        .zip(lower)
        .map(|(wi, li)| (li - wi).max(wi - MAX_WEIGHT).max(0.0))
        .fold(budget, f64::max)
}

/// Extreme-return corner of the budget set: every asset at its floor and
/// the remaining budget poured into the highest (or lowest) returns first.
/// Ties go to the earlier asset.
pub(crate) fn extreme_return_weights(mu: &[f64], lower: &[f64], maximize: bool) -> Vec<f64> {
    let mut order: Vec<usize> = (0..mu.len()).collect();
    order.sort_by(|&a, &b| {
        let ord = if maximize {
            mu[b].total_cmp(&mu[a])
        } else {
            mu[a].total_cmp(&mu[b])
        };
        ord.then(a.cmp(&b))
    });
    let mut w = lower.to_vec();
    let mut remaining = 1.0 - lower.iter().sum::<f64>();
    for i in order {
        if remaining <= 0.0 {
            break;
        }
        let add = remaining.min(MAX_WEIGHT - w[i]);
        w[i] += add;
        remaining -= add;
    }
    w
}

pub(crate) fn max_return_weights(mu: &[f64], lower: &[f64]) -> Vec<f64> {
    extreme_return_weights(mu, lower, true)
}

pub(crate) fn min_return_weights(mu: &[f64], lower: &[f64]) -> Vec<f64> {
    extreme_return_weights(mu, lower, false)
}

pub(crate) fn sharpe_of(w: &[f64], mu: &[f64], sigma: &[Vec<f64>], rf: f64) -> f64 {
    let vol = portfolio_variance(w, sigma).max(0.0).sqrt();
    compute_sharpe(vec_dot(w, mu), rf, vol)
}

/// Projected gradient ascent on the Sharpe ratio with backtracking,
/// starting from the projected equal-weight portfolio. Returns the best
/// iterate seen.
pub(crate) fn projected_gradient_max_sharpe(
    mu: &[f64],
    sigma: &[Vec<f64>],
    lower: &[f64],
    rf: f64,
) -> Vec<f64> {
    let n = mu.len();
    let mut w = project_to_budget(&vec![1.0 / n as f64; n], lower);
    let mut current = sharpe_of(&w, mu, sigma, rf);
    let mut step = 0.5;

    for _ in 0..1000 {
        let sigma_w = mat_vec_multiply(sigma, &w);
        let var = vec_dot(&w, &sigma_w);
        if var <= 0.0 {
            break;
        }
        let vol = var.sqrt();
        let excess = vec_dot(&w, mu) - rf;

        // dS/dw = (mu - rf) / vol - excess * (Sigma w) / vol^3
        let grad: Vec<f64> = (0..n)
            .map(|i| (mu[i] - rf) / vol - excess * sigma_w[i] / (var * vol))
            .collect();

        let mut improved = false;
        while step > 1e-12 {
            let trial: Vec<f64> = w.iter().zip(&grad).map(|(wi, gi)| wi + step * gi).collect();
            let trial = project_to_budget(&trial, lower);
            let s = sharpe_of(&trial, mu, sigma, rf);
            if s > current + 1e-15 {
                w = trial;
                current = s;
                step *= 1.5;
                improved = true;
                break;
            }
            step *= 0.5;
        }
        if !improved {
            break;
        }
    }
    w
}
