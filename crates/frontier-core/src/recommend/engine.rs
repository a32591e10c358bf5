use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::config::Candidate;
use crate::error::FrontierError;
use crate::statistics::portfolio::{pearson_correlation, portfolio_period_returns};
use crate::statistics::{portfolio_stats, PortfolioStats, ReturnStatistics};
use crate::types::{Allocation, AssetUniverse, Rate, WeightVector};
use crate::FrontierResult;

/// Trial weight given to each candidate when not configured.
pub const DEFAULT_BLEND_WEIGHT: f64 = 0.10;

/// Effect of adding one candidate to the current portfolio.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub ticker: String,
    pub name: String,
    /// Blended allocation over the union universe.
    pub weights: Allocation,
    pub stats: PortfolioStats,
    pub new_return: Rate,
    pub new_volatility: Rate,
    /// Blended Sharpe minus current Sharpe.
    pub sharpe_improvement: f64,
    /// Pearson correlation of the candidate's period returns with the
    /// current portfolio's; `None` when no return series is available.
    pub correlation: Option<f64>,
}

/// Rank candidate diversifiers by the Sharpe improvement of a
/// `(1 - blend_weight) * current + blend_weight * candidate` blend.
///
/// `statistics` must cover the union of the current universe and every
/// candidate worth testing. Candidates already held are ignored; candidates
/// missing from `statistics` are skipped with a warning. The result is
/// sorted by descending improvement, ties by ascending ticker.
pub fn recommend(
    current_weights: &WeightVector,
    current_universe: &AssetUniverse,
    candidates: &[Candidate],
    statistics: &ReturnStatistics,
    risk_free_rate: Rate,
    blend_weight: f64,
) -> FrontierResult<Vec<Recommendation>> {
    if !(blend_weight > 0.0 && blend_weight < 1.0) {
        return Err(FrontierError::validation(
            "blend_weight",
            format!("Must lie in (0, 1), got {}", blend_weight),
        ));
    }
    let union = statistics.universe();
    let current = current_weights.expand_to(current_universe, union)?;
    let current_stats = portfolio_stats(&current, statistics, risk_free_rate, None)?;
    let current_series = statistics
        .period_returns()
        .map(|r| portfolio_period_returns(current.as_slice(), r));

    let mut recommendations = Vec::new();
    for candidate in candidates {
        if current_universe.contains(&candidate.ticker) {
            continue;
        }
        let Some(idx) = union.index_of(&candidate.ticker) else {
            tracing::warn!(ticker = %candidate.ticker, "no statistics for candidate; skipping");
            continue;
        };

        let mut blended: Vec<f64> = current
            .as_slice()
            .iter()
            .map(|w| (1.0 - blend_weight) * w)
            .collect();
        blended[idx] += blend_weight;
        let blended = WeightVector::new(blended)?;
        let stats = portfolio_stats(&blended, statistics, risk_free_rate, None)?;

        let correlation = match (&current_series, statistics.period_returns()) {
            (Some(port), Some(all)) => pearson_correlation(&all[idx], port),
            _ => None,
        };

        recommendations.push(Recommendation {
            ticker: candidate.ticker.clone(),
            name: candidate.name.clone(),
            weights: blended.to_allocation(union)?,
            new_return: stats.expected_return,
            new_volatility: stats.volatility,
            sharpe_improvement: stats.sharpe_ratio - current_stats.sharpe_ratio,
            correlation,
            stats,
        });
    }

    sort_recommendations(&mut recommendations);
    Ok(recommendations)
}

/// Descending improvement, ties by ascending ticker.
pub fn sort_recommendations(recommendations: &mut [Recommendation]) {
    recommendations.sort_by(|a, b| {
        b.sharpe_improvement
            .partial_cmp(&a.sharpe_improvement)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.ticker.cmp(&b.ticker))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use crate::market_data::PriceHistory;
    use crate::statistics::compute_statistics;

    fn union_stats() -> (AssetUniverse, ReturnStatistics) {
        let current = AssetUniverse::from_strs(&["AAPL", "MSFT"]).unwrap();
        let union = AssetUniverse::from_strs(&["AAPL", "MSFT", "GLD", "TLT", "XLK"]).unwrap();
        let returns = vec![
            vec![0.02, -0.01, 0.03, -0.02, 0.015, 0.01],
            vec![0.015, -0.005, 0.025, -0.015, 0.01, 0.012],
            vec![-0.005, 0.01, -0.004, 0.012, 0.002, 0.003],
            vec![0.001, 0.004, -0.002, 0.006, 0.0, 0.002],
            vec![0.022, -0.012, 0.031, -0.021, 0.016, 0.011],
        ];
        let h = PriceHistory::from_returns(
            union,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            1,
            &returns,
        )
        .unwrap();
        (current, compute_statistics(&h).unwrap())
    }

    fn candidates() -> Vec<Candidate> {
        vec![
            Candidate::new("XLK", "Technology"),
            Candidate::new("GLD", "Gold"),
            Candidate::new("TLT", "Long-term Bonds"),
            Candidate::new("MSFT", "Already held"),
            Candidate::new("VNQ", "Not fetched"),
        ]
    }

    // ------------------------------------------------------------------
    // 1. Blending
    // ------------------------------------------------------------------
    #[test]
    fn test_blend_weights() {
        let (current, stats) = union_stats();
        let w = WeightVector::new(vec![0.6, 0.4]).unwrap();
        let recs = recommend(&w, &current, &candidates(), &stats, 0.02, 0.10).unwrap();
        let gld = recs.iter().find(|r| r.ticker == "GLD").unwrap();
        assert!((gld.weights["AAPL"] - 0.54).abs() < 1e-12);
        assert!((gld.weights["MSFT"] - 0.36).abs() < 1e-12);
        assert!((gld.weights["GLD"] - 0.10).abs() < 1e-12);
        assert_eq!(gld.weights["TLT"], 0.0);
    }

    #[test]
    fn test_held_and_missing_candidates_skipped() {
        let (current, stats) = union_stats();
        let w = WeightVector::new(vec![0.5, 0.5]).unwrap();
        let recs = recommend(&w, &current, &candidates(), &stats, 0.02, 0.10).unwrap();
        let tickers: Vec<&str> = recs.iter().map(|r| r.ticker.as_str()).collect();
        assert_eq!(recs.len(), 3);
        assert!(!tickers.contains(&"MSFT"));
        assert!(!tickers.contains(&"VNQ"));
    }

    // ------------------------------------------------------------------
    // 2. Ranking
    // ------------------------------------------------------------------
    #[test]
    fn test_sorted_descending_and_deterministic() {
        let (current, stats) = union_stats();
        let w = WeightVector::new(vec![0.5, 0.5]).unwrap();
        let a = recommend(&w, &current, &candidates(), &stats, 0.02, 0.10).unwrap();
        let b = recommend(&w, &current, &candidates(), &stats, 0.02, 0.10).unwrap();
        for pair in a.windows(2) {
            assert!(pair[0].sharpe_improvement >= pair[1].sharpe_improvement);
        }
        let ta: Vec<&str> = a.iter().map(|r| r.ticker.as_str()).collect();
        let tb: Vec<&str> = b.iter().map(|r| r.ticker.as_str()).collect();
        assert_eq!(ta, tb);
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.sharpe_improvement, y.sharpe_improvement);
        }
    }

    #[test]
    fn test_ties_broken_by_ticker() {
        let stats = PortfolioStats {
            expected_return: 0.1,
            volatility: 0.1,
            sharpe_ratio: 0.8,
            real_return: None,
            real_sharpe_ratio: None,
            inflation_rate: None,
        };
        let mk = |t: &str, imp: f64| Recommendation {
            ticker: t.into(),
            name: t.into(),
            weights: Allocation::new(),
            stats: stats.clone(),
            new_return: 0.1,
            new_volatility: 0.1,
            sharpe_improvement: imp,
            correlation: None,
        };
        let mut recs = vec![mk("XLV", 0.1), mk("AGG", 0.1), mk("GLD", 0.2)];
        sort_recommendations(&mut recs);
        let order: Vec<&str> = recs.iter().map(|r| r.ticker.as_str()).collect();
        assert_eq!(order, vec!["GLD", "AGG", "XLV"]);
    }

    // ------------------------------------------------------------------
    // 3. Correlation
    // ------------------------------------------------------------------
    #[test]
    fn test_correlation_signs() {
        let (current, stats) = union_stats();
        let w = WeightVector::new(vec![0.5, 0.5]).unwrap();
        let recs = recommend(&w, &current, &candidates(), &stats, 0.02, 0.10).unwrap();
        let xlk = recs.iter().find(|r| r.ticker == "XLK").unwrap();
        let gld = recs.iter().find(|r| r.ticker == "GLD").unwrap();
        assert!(xlk.correlation.unwrap() > 0.9);
        assert!(gld.correlation.unwrap() < 0.0);
    }

    #[test]
    fn test_rejects_bad_blend_weight() {
        let (current, stats) = union_stats();
        let w = WeightVector::new(vec![0.5, 0.5]).unwrap();
        assert!(recommend(&w, &current, &candidates(), &stats, 0.02, 1.0).is_err());
    }
}
