use serde::{Deserialize, Serialize};

use crate::error::FrontierError;
use crate::types::Rate;
use crate::FrontierResult;

/// One (volatility, return) pair on the capital allocation line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalPoint {
    pub volatility: Rate,
    pub expected_return: Rate,
    /// Share held in the risk-free asset; negative means borrowing.
    /// `None` when the tangency portfolio has no volatility.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_free_weight: Option<f64>,
}

/// Points on the ray from (0, rf) through the tangency portfolio, evenly
/// spaced in volatility from 0 to `max_volatility`.
pub fn capital_allocation_line(
    risk_free_rate: Rate,
    tangency_return: Rate,
    tangency_volatility: Rate,
    max_volatility: Rate,
    num_points: usize,
) -> FrontierResult<Vec<CalPoint>> {
    if num_points < 2 {
        return Err(FrontierError::validation(
            "cal_points",
            format!("At least 2 points required, got {}", num_points),
        ));
    }
    let slope = if tangency_volatility > 0.0 {
        (tangency_return - risk_free_rate) / tangency_volatility
    } else {
        0.0
    };
    let max_volatility = max_volatility.max(tangency_volatility).max(0.0);
    let step = max_volatility / (num_points - 1) as f64;

    Ok((0..num_points)
        .map(|i| {
            let volatility = step * i as f64;
            CalPoint {
                volatility,
                expected_return: risk_free_rate + slope * volatility,
                risk_free_weight: (tangency_volatility > 0.0)
                    .then(|| 1.0 - volatility / tangency_volatility),
            }
        })
        .collect())
}
