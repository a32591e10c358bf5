//! Long-only mean-variance optimization under a per-asset floor.
//!
//! Every solve works on the set {l <= w <= 1, sum(w) = 1}:
//! - MIN_VOLATILITY minimizes w'Σw.
//! - TARGET_RETURN adds mu'w = target.
//! - MAX_SHARPE maximizes (mu'w - rf) / sqrt(w'Σw) through the homogenized
//!   program min y'Σy s.t. (mu - rf)'y = 1, sum(y) = k, l k <= y <= k,
//!   with w = y / k. When no feasible portfolio beats the risk-free rate the
//!   ratio is maximized by projected gradient ascent instead.

mod feasible;
mod qp;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::MinExposure;
use crate::error::FrontierError;
use crate::statistics::portfolio::vec_dot;
use crate::statistics::ReturnStatistics;
use crate::types::{Rate, WeightVector};
use crate::FrontierResult;

use feasible::{
    constraint_violation, max_return_weights, min_return_weights, project_to_budget,
    projected_gradient_max_sharpe, sharpe_of, FEASIBILITY_TOLERANCE, MAX_WEIGHT,
};
use qp::{QpSolution, QpStatus, QuadraticProgram};

/// Return spreads narrower than this make a target-return constraint
/// meaningless; the solve degrades to minimum volatility.
const DEGENERATE_RETURN_RANGE: f64 = 1e-10;

/// Slack on sum(min_exposure) <= 1.
const FLOOR_SUM_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    MaxSharpe,
    MinVolatility,
    TargetReturn,
}

impl Objective {
    pub fn as_str(&self) -> &'static str {
        match self {
            Objective::MaxSharpe => "max_sharpe",
            Objective::MinVolatility => "min_volatility",
            Objective::TargetReturn => "target_return",
        }
    }
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Objective {
    type Err = FrontierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "max_sharpe" => Ok(Objective::MaxSharpe),
            "min_volatility" | "min_vol" => Ok(Objective::MinVolatility),
            "target_return" => Ok(Objective::TargetReturn),
            other => Err(FrontierError::validation(
                "objective",
                format!(
                    "Unknown objective '{}' (expected max_sharpe, min_volatility or target_return)",
                    other
                ),
            )),
        }
    }
}

/// Solve one constrained allocation problem over `statistics`.
///
/// `target_return` is required for [`Objective::TargetReturn`] and ignored
/// otherwise. The result lies within 1e-6 of the constraint set; a
/// single-asset universe always yields `[1.0]`.
pub fn optimize(
    statistics: &ReturnStatistics,
    objective: Objective,
    min_exposure: &MinExposure,
    risk_free_rate: Rate,
    target_return: Option<Rate>,
) -> FrontierResult<WeightVector> {
    if !risk_free_rate.is_finite() {
        return Err(FrontierError::validation(
            "risk_free_rate",
            "Must be a finite number",
        ));
    }
    let problem = Problem::new(statistics, objective, min_exposure)?;

    let target = match (objective, target_return) {
        (Objective::TargetReturn, Some(t)) if t.is_finite() => Some(t),
        (Objective::TargetReturn, Some(_)) => {
            return Err(FrontierError::validation(
                "target_return",
                "Must be a finite number",
            ))
        }
        (Objective::TargetReturn, None) => {
            return Err(FrontierError::validation(
                "target_return",
                "Required for the target_return objective",
            ))
        }
        _ => None,
    };

    if let Some(t) = target {
        problem.ensure_reachable(t)?;
    }
    if problem.n() == 1 {
        return Ok(WeightVector::from_raw(vec![1.0]));
    }

    tracing::debug!(
        objective = objective.as_str(),
        assets = problem.n(),
        constraints = %problem.constraints,
        "solving allocation"
    );

    let weights = match objective {
        Objective::MinVolatility => problem.min_volatility()?,
        Objective::TargetReturn => problem.target_return(target.unwrap_or_default())?,
        Objective::MaxSharpe => problem.max_sharpe(risk_free_rate),
    };
    Ok(WeightVector::from_raw(weights))
}

/// Lowest and highest expected return attainable under `min_exposure`.
pub fn achievable_return_range(
    statistics: &ReturnStatistics,
    min_exposure: &MinExposure,
) -> FrontierResult<(Rate, Rate)> {
    let problem = Problem::new(statistics, Objective::TargetReturn, min_exposure)?;
    Ok(problem.return_range())
}

struct Problem<'a> {
    mu: &'a [f64],
    sigma: &'a [Vec<f64>],
    lower: Vec<f64>,
    objective: Objective,
    constraints: String,
}

impl<'a> Problem<'a> {
    fn new(
        statistics: &'a ReturnStatistics,
        objective: Objective,
        min_exposure: &MinExposure,
    ) -> FrontierResult<Self> {
        let lower = min_exposure.resolve(statistics.len())?;
        let floor_sum: f64 = lower.iter().sum();
        let problem = Problem {
            mu: statistics.expected_returns(),
            sigma: statistics.covariance(),
            lower,
            objective,
            constraints: format!("long-only, sum(w)=1, {}", min_exposure.describe()),
        };
        if floor_sum > 1.0 + FLOOR_SUM_TOLERANCE {
            return Err(problem.fail(format!(
                "Infeasible: minimum exposures sum to {:.4}, which exceeds 1",
                floor_sum
            )));
        }
        Ok(problem)
    }

    fn n(&self) -> usize {
        self.mu.len()
    }

    fn fail(&self, reason: impl Into<String>) -> FrontierError {
        FrontierError::Optimization {
            objective: self.objective.as_str().to_string(),
            constraints: self.constraints.clone(),
            reason: reason.into(),
        }
    }

    fn return_range(&self) -> (f64, f64) {
        let lo = vec_dot(&min_return_weights(self.mu, &self.lower), self.mu);
        let hi = vec_dot(&max_return_weights(self.mu, &self.lower), self.mu);
        (lo, hi)
    }

    fn return_tolerance(&self) -> f64 {
        let scale = self.mu.iter().fold(1.0_f64, |m, r| m.max(r.abs()));
        FEASIBILITY_TOLERANCE * scale
    }

    fn scaled_covariance(&self, dim: usize) -> Vec<Vec<f64>> {
        let n = self.n();
        let mut p = vec![vec![0.0; dim]; dim];
        for i in 0..n {
            for j in 0..n {
                p[i][j] = 2.0 * self.sigma[i][j];
            }
        }
        p
    }

    /// Validate a solver iterate and snap it onto the budget set.
    fn accept(
        &self,
        w: &[f64],
        status: &QpStatus,
        target: Option<f64>,
    ) -> FrontierResult<Vec<f64>> {
        if *status == QpStatus::Infeasible {
            return Err(self.fail("Solver reports the constraints are infeasible"));
        }
        if w.iter().any(|x| !x.is_finite()) {
            return Err(self.fail(format!(
                "Solver stopped ({:?}) with a non-finite iterate",
                status
            )));
        }
        let violation = constraint_violation(w, &self.lower);
        if violation > FEASIBILITY_TOLERANCE {
            return Err(self.fail(format!(
                "Solver stopped ({:?}); best iterate violates constraints by {:.2e}",
                status, violation
            )));
        }
        let cleaned = project_to_budget(w, &self.lower);
        if let Some(t) = target {
            let miss = (vec_dot(&cleaned, self.mu) - t).abs();
            if miss > self.return_tolerance() {
                return Err(self.fail(format!(
                    "Solver stopped ({:?}); best iterate misses the target return by {:.2e}",
                    status, miss
                )));
            }
        }
        if let QpStatus::Stalled(reason) = status {
            tracing::warn!(
                objective = self.objective.as_str(),
                %reason,
                "accepting feasible iterate from a stalled solve"
            );
        }
        Ok(cleaned)
    }

    fn budget_program(&self) -> QuadraticProgram {
        let n = self.n();
        QuadraticProgram::new(self.scaled_covariance(n), vec![0.0; n])
            .equality(vec![1.0; n], 1.0)
            .bounds(0..n, &self.lower, &vec![MAX_WEIGHT; n])
    }

    fn log_solution(&self, sol: &QpSolution) {
        tracing::debug!(
            objective = self.objective.as_str(),
            status = ?sol.status,
            iterations = sol.iterations,
            "quadratic program finished"
        );
    }

    fn min_volatility(&self) -> FrontierResult<Vec<f64>> {
        let sol = self.budget_program().solve()?;
        self.log_solution(&sol);
        self.accept(&sol.x, &sol.status, None)
    }

    /// The target must lie in the achievable return range, up to solver tolerance.
    fn ensure_reachable(&self, target: f64) -> FrontierResult<()> {
        let (r_min, r_max) = self.return_range();
        let tol = self.return_tolerance();
        if target > r_max + tol || target < r_min - tol {
            return Err(self.fail(format!(
                "Target return {:.4}% is outside the achievable range [{:.4}%, {:.4}%]",
                target * 100.0,
                r_min * 100.0,
                r_max * 100.0
            )));
        }
        Ok(())
    }

    fn target_return(&self, target: f64) -> FrontierResult<Vec<f64>> {
        self.ensure_reachable(target)?;
        let (r_min, r_max) = self.return_range();
        let tol = self.return_tolerance();
        if r_max - r_min < DEGENERATE_RETURN_RANGE {
            return self.min_volatility();
        }
        let target = target.clamp(r_min, r_max);

        let solved = self
            .budget_program()
            .equality(self.mu.to_vec(), target)
            .solve()
            .and_then(|sol| {
                self.log_solution(&sol);
                self.accept(&sol.x, &sol.status, Some(target))
            });
        match solved {
            Ok(w) => Ok(w),
            // At the ends of the range the feasible set collapses to a corner
            Err(_) if (target - r_max).abs() <= tol => {
                Ok(max_return_weights(self.mu, &self.lower))
            }
            Err(_) if (target - r_min).abs() <= tol => {
                Ok(min_return_weights(self.mu, &self.lower))
            }
            Err(e) => Err(e),
        }
    }

    fn max_sharpe(&self, rf: f64) -> Vec<f64> {
        let n = self.n();
        let (_, r_max) = self.return_range();

        let primary = if r_max - rf > 1e-12 {
            match self.homogenized_max_sharpe(rf) {
                Ok(w) => w,
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        "max-Sharpe program failed; using projected gradient"
                    );
                    projected_gradient_max_sharpe(self.mu, self.sigma, &self.lower, rf)
                }
            }
        } else {
            tracing::debug!(
                rf,
                r_max,
                "no portfolio beats the risk-free rate; using projected gradient"
            );
            projected_gradient_max_sharpe(self.mu, self.sigma, &self.lower, rf)
        };

        let seed = project_to_budget(&vec![1.0 / n as f64; n], &self.lower);
        if sharpe_of(&seed, self.mu, self.sigma, rf) > sharpe_of(&primary, self.mu, self.sigma, rf)
        {
            seed
        } else {
            primary
        }
    }

    fn homogenized_max_sharpe(&self, rf: f64) -> FrontierResult<Vec<f64>> {
        let n = self.n();
        let k = n;
        let dim = n + 1;

        let mut excess = vec![0.0; dim];
        let mut budget = vec![0.0; dim];
        for i in 0..n {
            excess[i] = self.mu[i] - rf;
            budget[i] = 1.0;
        }
        budget[k] = -1.0;

        let mut program = QuadraticProgram::new(self.scaled_covariance(dim), vec![0.0; dim])
            .equality(excess, 1.0)
            .equality(budget, 0.0);
        for i in 0..n {
            // l_i k - y_i <= 0
            let mut floor = vec![0.0; dim];
            floor[i] = -1.0;
            floor[k] = self.lower[i];
            // y_i - k <= 0
            let mut cap = vec![0.0; dim];
            cap[i] = 1.0;
            cap[k] = -MAX_WEIGHT;
            program = program.inequality(floor, 0.0).inequality(cap, 0.0);
        }
        let mut scale = vec![0.0; dim];
        scale[k] = -1.0;
        program = program.inequality(scale, 0.0);

        let sol = program.solve()?;
        self.log_solution(&sol);
        if sol.status == QpStatus::Infeasible {
            return Err(self.fail("Solver reports the homogenized program is infeasible"));
        }
        let kappa = sol.x[k];
        if !(kappa.is_finite() && kappa > 1e-12) {
            return Err(self.fail(format!("Degenerate scaling variable ({:e})", kappa)));
        }
        let w: Vec<f64> = sol.x[..n].iter().map(|y| y / kappa).collect();
        self.accept(&w, &sol.status, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::statistics::portfolio_stats;
    use crate::types::AssetUniverse;

    fn two_asset_stats() -> ReturnStatistics {
        let u = AssetUniverse::from_strs(&["A", "B"]).unwrap();
        ReturnStatistics::from_moments(
            u,
            vec![0.10, 0.05],
            vec![vec![0.04, 0.006], vec![0.006, 0.01]],
        )
        .unwrap()
    }

    fn three_asset_stats() -> ReturnStatistics {
        let u = AssetUniverse::from_strs(&["AAPL", "MSFT", "GLD"]).unwrap();
        ReturnStatistics::from_moments(
            u,
            vec![0.12, 0.10, 0.04],
            vec![
                vec![0.0625, 0.0300, 0.0020],
                vec![0.0300, 0.0400, 0.0010],
                vec![0.0020, 0.0010, 0.0225],
            ],
        )
        .unwrap()
    }

    fn assert_feasible(w: &WeightVector, lower: &[f64]) {
        let sum: f64 = w.as_slice().iter().sum();
        assert!((sum - 1.0).abs() < 1e-6, "sum = {}", sum);
        for (wi, li) in w.as_slice().iter().zip(lower) {
            assert!(*wi >= li - 1e-6 && *wi <= 1.0 + 1e-6, "w = {:?}", w);
        }
    }

    // ------------------------------------------------------------------
    // 1. Minimum volatility
    // ------------------------------------------------------------------
    #[test]
    fn test_min_volatility_two_assets_closed_form() {
        let s = two_asset_stats();
        let w = optimize(&s, Objective::MinVolatility, &MinExposure::none(), 0.02, None).unwrap();
        // (s_b^2 - s_ab) / (s_a^2 + s_b^2 - 2 s_ab) = 0.004 / 0.038
        let expected_a = 0.004 / 0.038;
        assert!((w.as_slice()[0] - expected_a).abs() < 1e-5, "w = {:?}", w);
        assert_feasible(&w, &[0.0, 0.0]);
    }

    #[test]
    fn test_min_volatility_not_worse_than_any_single_asset() {
        let s = three_asset_stats();
        let w = optimize(&s, Objective::MinVolatility, &MinExposure::none(), 0.02, None).unwrap();
        let vol = portfolio_stats(&w, &s, 0.02, None).unwrap().volatility;
        for v in s.asset_volatilities() {
            assert!(vol <= v + 1e-9);
        }
        let eq = portfolio_stats(&WeightVector::equal(3), &s, 0.02, None).unwrap();
        assert!(vol <= eq.volatility + 1e-9);
    }

    // ------------------------------------------------------------------
    // 2. Maximum Sharpe
    // ------------------------------------------------------------------
    #[test]
    fn test_max_sharpe_matches_tangency_when_interior() {
        let s = two_asset_stats();
        let w = optimize(&s, Objective::MaxSharpe, &MinExposure::none(), 0.02, None).unwrap();
        // Sigma^-1 (mu - rf) is proportional to [0.00062, 0.00072]
        let expected_a = 0.00062 / 0.00134;
        assert!((w.as_slice()[0] - expected_a).abs() < 1e-4, "w = {:?}", w);
    }

    #[test]
    fn test_max_sharpe_beats_equal_weight() {
        let s = three_asset_stats();
        let w = optimize(&s, Objective::MaxSharpe, &MinExposure::none(), 0.02, None).unwrap();
        let opt = portfolio_stats(&w, &s, 0.02, None).unwrap().sharpe_ratio;
        let eq = portfolio_stats(&WeightVector::equal(3), &s, 0.02, None)
            .unwrap()
            .sharpe_ratio;
        assert!(opt >= eq - 1e-9);
        assert_feasible(&w, &[0.0; 3]);
    }

    #[test]
    fn test_max_sharpe_respects_floors() {
        let s = three_asset_stats();
        let floors = MinExposure::PerAsset(vec![0.1, 0.1, 0.3]);
        let w = optimize(&s, Objective::MaxSharpe, &floors, 0.02, None).unwrap();
        assert_feasible(&w, &[0.1, 0.1, 0.3]);
    }

    #[test]
    fn test_max_sharpe_when_nothing_beats_risk_free() {
        let s = three_asset_stats();
        let w = optimize(&s, Objective::MaxSharpe, &MinExposure::none(), 0.50, None).unwrap();
        assert_feasible(&w, &[0.0; 3]);
        let opt = portfolio_stats(&w, &s, 0.50, None).unwrap().sharpe_ratio;
        let eq = portfolio_stats(&WeightVector::equal(3), &s, 0.50, None)
            .unwrap()
            .sharpe_ratio;
        assert!(opt >= eq - 1e-12);
    }

    #[test]
    fn test_max_sharpe_deterministic() {
        let s = three_asset_stats();
        let floor = MinExposure::Uniform(0.05);
        let a = optimize(&s, Objective::MaxSharpe, &floor, 0.02, None).unwrap();
        let b = optimize(&s, Objective::MaxSharpe, &floor, 0.02, None).unwrap();
        assert_eq!(a, b);
    }

    // ------------------------------------------------------------------
    // 3. Target return
    // ------------------------------------------------------------------
    #[test]
    fn test_target_return_two_assets_is_pinned() {
        let s = two_asset_stats();
        let w = optimize(
            &s,
            Objective::TargetReturn,
            &MinExposure::none(),
            0.02,
            Some(0.075),
        )
        .unwrap();
        assert!((w.as_slice()[0] - 0.5).abs() < 1e-5);
        let ret = vec_dot(w.as_slice(), s.expected_returns());
        assert!((ret - 0.075).abs() < 1e-6);
    }

    #[test]
    fn test_target_return_at_max_endpoint() {
        let s = three_asset_stats();
        let w = optimize(
            &s,
            Objective::TargetReturn,
            &MinExposure::none(),
            0.02,
            Some(0.12),
        )
        .unwrap();
        assert!((w.as_slice()[0] - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_target_return_out_of_range() {
        let s = two_asset_stats();
        let err = optimize(
            &s,
            Objective::TargetReturn,
            &MinExposure::none(),
            0.02,
            Some(0.20),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OptimizationError);
    }

    #[test]
    fn test_target_return_requires_target() {
        let s = two_asset_stats();
        let err = optimize(&s, Objective::TargetReturn, &MinExposure::none(), 0.02, None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);
    }

    #[test]
    fn test_degenerate_return_range_falls_back_to_min_vol() {
        let u = AssetUniverse::from_strs(&["A", "B"]).unwrap();
        let s = ReturnStatistics::from_moments(
            u,
            vec![0.07, 0.07],
            vec![vec![0.04, 0.0], vec![0.0, 0.04]],
        )
        .unwrap();
        let w = optimize(
            &s,
            Objective::TargetReturn,
            &MinExposure::none(),
            0.02,
            Some(0.07),
        )
        .unwrap();
        assert!((w.as_slice()[0] - 0.5).abs() < 1e-5);
    }

    // ------------------------------------------------------------------
    // 4. Infeasible and trivial universes
    // ------------------------------------------------------------------
    #[test]
    fn test_floors_summing_above_one_are_infeasible() {
        let s = two_asset_stats();
        for objective in [Objective::MaxSharpe, Objective::MinVolatility] {
            let err = optimize(&s, objective, &MinExposure::Uniform(0.6), 0.02, None).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::OptimizationError);
            assert!(err.to_string().contains("Infeasible"));
        }
    }

    #[test]
    fn test_single_asset_is_fully_allocated() {
        let u = AssetUniverse::from_strs(&["SPY"]).unwrap();
        let s = ReturnStatistics::from_moments(u, vec![0.08], vec![vec![0.03]]).unwrap();
        for objective in [Objective::MaxSharpe, Objective::MinVolatility] {
            let w = optimize(&s, objective, &MinExposure::none(), 0.02, None).unwrap();
            assert_eq!(w.as_slice(), &[1.0]);
        }
    }

    #[test]
    fn test_single_asset_target_return() {
        let u = AssetUniverse::from_strs(&["SPY"]).unwrap();
        let s = ReturnStatistics::from_moments(u, vec![0.08], vec![vec![0.03]]).unwrap();
        let w = optimize(&s, Objective::TargetReturn, &MinExposure::none(), 0.02, Some(0.08))
            .unwrap();
        assert_eq!(w.as_slice(), &[1.0]);

        let err = optimize(&s, Objective::TargetReturn, &MinExposure::none(), 0.02, Some(0.50))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OptimizationError);
        assert_eq!(err.report().details["objective"], "target_return");
    }

    #[test]
    fn test_floors_that_fill_the_budget() {
        let s = two_asset_stats();
        let w = optimize(&s, Objective::MaxSharpe, &MinExposure::Uniform(0.5), 0.02, None).unwrap();
        assert!((w.as_slice()[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_objective_parse() {
        assert_eq!("MAX_SHARPE".parse::<Objective>().unwrap(), Objective::MaxSharpe);
        assert_eq!("min-volatility".parse::<Objective>().unwrap(), Objective::MinVolatility);
        assert!("max_return".parse::<Objective>().is_err());
    }
}
