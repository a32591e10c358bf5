use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::statistics::portfolio::{compute_sharpe, portfolio_volatility, vec_dot};
use crate::statistics::ReturnStatistics;
use crate::types::Rate;
use crate::FrontierResult;

/// Risk/return of one randomly drawn long-only portfolio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomPortfolio {
    pub expected_return: Rate,
    pub volatility: Rate,
    pub sharpe_ratio: f64,
}

/// Draw `count` portfolios with uniform(0, 1) weights normalized to sum to
/// one. Same seed, same statistics, same output.
pub fn random_portfolios(
    statistics: &ReturnStatistics,
    count: usize,
    seed: u64,
    risk_free_rate: Rate,
) -> FrontierResult<Vec<RandomPortfolio>> {
    let n = statistics.len();
    let mut rng = StdRng::seed_from_u64(seed);
    let mut out = Vec::with_capacity(count);
    let mut w = vec![0.0; n];

    for _ in 0..count {
        let mut total = 0.0;
        for wi in w.iter_mut() {
            // (0, 1] keeps the normalizer away from zero
            *wi = 1.0 - rng.gen::<f64>();
            total += *wi;
        }
        for wi in w.iter_mut() {
            *wi /= total;
        }
        let expected_return = vec_dot(&w, statistics.expected_returns());
        let volatility = portfolio_volatility(&w, statistics.covariance())?;
        out.push(RandomPortfolio {
            expected_return,
            volatility,
            sharpe_ratio: compute_sharpe(expected_return, risk_free_rate, volatility),
        });
    }
    Ok(out)
}
