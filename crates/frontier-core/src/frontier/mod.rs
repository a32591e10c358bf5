pub mod capital_allocation;

use serde::{Deserialize, Serialize};

use crate::config::MinExposure;
use crate::error::{ErrorKind, FrontierError};
use crate::optimizer::{achievable_return_range, optimize, Objective};
use crate::statistics::{portfolio_stats, ReturnStatistics};
use crate::types::{Allocation, Rate};
use crate::FrontierResult;

pub use capital_allocation::{capital_allocation_line, CalPoint};

/// Points emitted along the capital allocation line when not configured.
pub const DEFAULT_CAL_POINTS: usize = 21;

/// A single point on the efficient frontier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontierPoint {
    pub target_return: Rate,
    /// Realized w'mu of the solved weights (equals the target within solver tolerance).
    pub expected_return: Rate,
    pub volatility: Rate,
    pub sharpe_ratio: f64,
    pub weights: Allocation,
}

/// The maximum-Sharpe portfolio.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TangencyPortfolio {
    pub expected_return: Rate,
    pub volatility: Rate,
    pub sharpe_ratio: f64,
    pub weights: Allocation,
}

/// Frontier, tangency portfolio and capital allocation line of one universe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EfficientFrontier {
    /// Ascending by target return.
    pub points: Vec<FrontierPoint>,
    pub tangency: TangencyPortfolio,
    pub capital_allocation_line: Vec<CalPoint>,
    pub min_return: Rate,
    pub max_return: Rate,
    pub requested_points: usize,
    /// Targets dropped because their sub-solve was infeasible.
    pub skipped_points: usize,
    pub warnings: Vec<String>,
}

impl EfficientFrontier {
    pub fn is_complete(&self) -> bool {
        self.skipped_points == 0
    }

    pub fn max_volatility(&self) -> Rate {
        self.points
            .iter()
            .map(|p| p.volatility)
            .fold(0.0, f64::max)
    }
}

/// Trace the efficient frontier between the minimum-volatility return and
/// the highest achievable return.
pub fn generate_frontier(
    statistics: &ReturnStatistics,
    num_points: usize,
    min_exposure: &MinExposure,
    risk_free_rate: Rate,
) -> FrontierResult<EfficientFrontier> {
    generate_frontier_with_cal(
        statistics,
        num_points,
        DEFAULT_CAL_POINTS,
        min_exposure,
        risk_free_rate,
    )
}

/// [`generate_frontier`] with an explicit number of CAL points.
pub fn generate_frontier_with_cal(
    statistics: &ReturnStatistics,
    num_points: usize,
    cal_points: usize,
    min_exposure: &MinExposure,
    risk_free_rate: Rate,
) -> FrontierResult<EfficientFrontier> {
    if num_points < 2 {
        return Err(FrontierError::validation(
            "num_points",
            format!("At least 2 frontier points required, got {}", num_points),
        ));
    }
    let universe = statistics.universe();
    let mut warnings: Vec<String> = Vec::new();

    // Lower anchor: the minimum-volatility portfolio's return
    let min_vol = optimize(
        statistics,
        Objective::MinVolatility,
        min_exposure,
        risk_free_rate,
        None,
    )?;
    let min_return = portfolio_stats(&min_vol, statistics, risk_free_rate, None)?.expected_return;
    let (_, max_return) = achievable_return_range(statistics, min_exposure)?;
    let max_return = max_return.max(min_return);

    let step = (max_return - min_return) / (num_points - 1) as f64;
    let mut points = Vec::with_capacity(num_points);
    let mut skipped_points = 0;

    for i in 0..num_points {
        let target_return = if i == num_points - 1 {
            max_return
        } else {
            min_return + step * i as f64
        };
        let weights = match optimize(
            statistics,
            Objective::TargetReturn,
            min_exposure,
            risk_free_rate,
            Some(target_return),
        ) {
            Ok(w) => w,
            Err(e) if e.kind() == ErrorKind::OptimizationError => {
                tracing::warn!(target_return, error = %e, "skipping infeasible frontier point");
                warnings.push(format!(
                    "Frontier point at target return {:.4}% skipped: {}",
                    target_return * 100.0,
                    e
                ));
                skipped_points += 1;
                continue;
            }
            Err(e) => return Err(e),
        };
        let stats = portfolio_stats(&weights, statistics, risk_free_rate, None)?;
        points.push(FrontierPoint {
            target_return,
            expected_return: stats.expected_return,
            volatility: stats.volatility,
            sharpe_ratio: stats.sharpe_ratio,
            weights: weights.to_allocation(universe)?,
        });
    }

    if skipped_points > 0 {
        warnings.push(format!(
            "{} of {} frontier points could not be solved",
            skipped_points, num_points
        ));
    }

    // Independent max-Sharpe solve, not picked from the grid
    let tangency_weights = optimize(
        statistics,
        Objective::MaxSharpe,
        min_exposure,
        risk_free_rate,
        None,
    )?;
    let t = portfolio_stats(&tangency_weights, statistics, risk_free_rate, None)?;
    let tangency = TangencyPortfolio {
        expected_return: t.expected_return,
        volatility: t.volatility,
        sharpe_ratio: t.sharpe_ratio,
        weights: tangency_weights.to_allocation(universe)?,
    };

    let frontier_max_vol = points.iter().map(|p| p.volatility).fold(0.0, f64::max);
    let capital_allocation_line = capital_allocation_line(
        risk_free_rate,
        tangency.expected_return,
        tangency.volatility,
        frontier_max_vol,
        cal_points,
    )?;

    tracing::debug!(
        requested = num_points,
        solved = points.len(),
        tangency_sharpe = tangency.sharpe_ratio,
        "efficient frontier generated"
    );

    Ok(EfficientFrontier {
        points,
        tangency,
        capital_allocation_line,
        min_return,
        max_return,
        requested_points: num_points,
        skipped_points,
        warnings,
    })
}
