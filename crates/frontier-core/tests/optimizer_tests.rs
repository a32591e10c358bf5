use chrono::NaiveDate;
use frontier_core::error::ErrorKind;
use frontier_core::frontier::generate_frontier;
use frontier_core::market_data::PriceHistory;
use frontier_core::optimizer::{optimize, Objective};
use frontier_core::statistics::{compute_statistics, portfolio_stats, ReturnStatistics};
use frontier_core::{AssetUniverse, MinExposure, WeightVector};

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

fn ab_history() -> PriceHistory {
    PriceHistory::from_returns(
        AssetUniverse::from_strs(&["A", "B"]).unwrap(),
        start(),
        1,
        &[
            vec![0.01, 0.02, -0.01, 0.03],
            vec![0.00, 0.01, 0.02, 0.01],
        ],
    )
    .unwrap()
}

fn four_asset_stats(order: &[usize]) -> ReturnStatistics {
    let tickers = ["SPY", "QQQ", "TLT", "GLD"];
    let mu = [0.09, 0.13, 0.035, 0.05];
    let cov = [
        [0.0324, 0.0350, -0.0040, 0.0010],
        [0.0350, 0.0484, -0.0050, 0.0008],
        [-0.0040, -0.0050, 0.0144, 0.0020],
        [0.0010, 0.0008, 0.0020, 0.0225],
    ];
    let universe =
        AssetUniverse::new(order.iter().map(|&i| tickers[i].to_string()).collect()).unwrap();
    ReturnStatistics::from_moments(
        universe,
        order.iter().map(|&i| mu[i]).collect(),
        order
            .iter()
            .map(|&i| order.iter().map(|&j| cov[i][j]).collect())
            .collect(),
    )
    .unwrap()
}

// ===========================================================================
// Statistics engine
// ===========================================================================

#[test]
fn test_two_asset_scenario_matches_hand_computation() {
    let stats = compute_statistics(&ab_history()).unwrap();
    assert_eq!(stats.periods_per_year(), 252.0);

    let w = WeightVector::new(vec![0.5, 0.5]).unwrap();
    let p = portfolio_stats(&w, &stats, 0.02, None).unwrap();

    // Portfolio period returns: 0.005, 0.015, 0.005, 0.020 (mean 0.01125)
    let expected_return = 0.01125 * 252.0;
    // Squared deviations sum to 1.6875e-4 over 3 degrees of freedom
    let expected_vol = (1.6875e-4 / 3.0 * 252.0f64).sqrt();
    let expected_sharpe = (expected_return - 0.02) / expected_vol;

    assert!((p.expected_return - expected_return).abs() < 1e-9);
    assert!((p.volatility - expected_vol).abs() < 1e-9);
    assert!((p.sharpe_ratio - expected_sharpe).abs() < 1e-9);
}

#[test]
fn test_two_asset_covariance_entries() {
    let stats = compute_statistics(&ab_history()).unwrap();
    let cov = stats.covariance();
    assert!((cov[0][0] - 8.75e-4 / 3.0 * 252.0).abs() < 1e-9);
    assert!((cov[1][1] - 2.0e-4 / 3.0 * 252.0).abs() < 1e-9);
    assert!((cov[0][1] + 2.0e-4 / 3.0 * 252.0).abs() < 1e-9);
}

#[test]
fn test_portfolio_stats_permutation_equivariant() {
    let base = four_asset_stats(&[0, 1, 2, 3]);
    let permuted = four_asset_stats(&[2, 0, 3, 1]);
    let w = WeightVector::new(vec![0.4, 0.3, 0.2, 0.1]).unwrap();
    let w_perm = WeightVector::new(vec![0.2, 0.4, 0.1, 0.3]).unwrap();
    let a = portfolio_stats(&w, &base, 0.02, Some(0.025)).unwrap();
    let b = portfolio_stats(&w_perm, &permuted, 0.02, Some(0.025)).unwrap();
    assert!((a.expected_return - b.expected_return).abs() < 1e-12);
    assert!((a.volatility - b.volatility).abs() < 1e-12);
    assert!((a.sharpe_ratio - b.sharpe_ratio).abs() < 1e-12);
}

#[test]
fn test_single_asset_sharpe_exact() {
    let h = PriceHistory::from_returns(
        AssetUniverse::from_strs(&["SPY"]).unwrap(),
        start(),
        1,
        &[vec![0.01, -0.005, 0.02, 0.0]],
    )
    .unwrap();
    let stats = compute_statistics(&h).unwrap();
    for objective in [Objective::MaxSharpe, Objective::MinVolatility] {
        let w = optimize(&stats, objective, &MinExposure::default(), 0.02, None).unwrap();
        assert_eq!(w.as_slice(), &[1.0]);
        let p = portfolio_stats(&w, &stats, 0.02, None).unwrap();
        let vol = stats.covariance()[0][0].sqrt();
        let expected = (stats.expected_returns()[0] - 0.02) / vol;
        assert!((p.sharpe_ratio - expected).abs() < 1e-12);
    }
}

// ===========================================================================
// Constrained optimizer
// ===========================================================================

#[test]
fn test_infeasible_floor_is_optimization_error() {
    let stats = compute_statistics(&ab_history()).unwrap();
    let err = optimize(&stats, Objective::MaxSharpe, &MinExposure::Uniform(0.6), 0.02, None)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OptimizationError);
    let report = err.report();
    assert_eq!(report.details["objective"], "max_sharpe");
    assert!(report.details["constraints"]
        .as_str()
        .unwrap()
        .contains("min_exposure"));
}

#[test]
fn test_optimizer_is_permutation_equivariant() {
    let base = four_asset_stats(&[0, 1, 2, 3]);
    let permuted = four_asset_stats(&[2, 0, 3, 1]);
    for objective in [Objective::MinVolatility, Objective::MaxSharpe] {
        let a = optimize(&base, objective, &MinExposure::none(), 0.02, None).unwrap();
        let b = optimize(&permuted, objective, &MinExposure::none(), 0.02, None).unwrap();
        let a = a.to_allocation(base.universe()).unwrap();
        let b = b.to_allocation(permuted.universe()).unwrap();
        for (ticker, wa) in &a {
            assert!((wa - b[ticker]).abs() < 1e-4, "{}: {} vs {}", ticker, wa, b[ticker]);
        }
    }
}

#[test]
fn test_min_volatility_bounded_by_equal_and_single_asset() {
    let stats = four_asset_stats(&[0, 1, 2, 3]);
    let w = optimize(&stats, Objective::MinVolatility, &MinExposure::none(), 0.02, None).unwrap();
    let vol = portfolio_stats(&w, &stats, 0.02, None).unwrap().volatility;
    let eq = portfolio_stats(&WeightVector::equal(4), &stats, 0.02, None)
        .unwrap()
        .volatility;
    assert!(vol <= eq + 1e-9);
    for v in stats.asset_volatilities() {
        assert!(vol <= v + 1e-9);
    }
}

#[test]
fn test_floor_binds_on_weak_assets() {
    let stats = four_asset_stats(&[0, 1, 2, 3]);
    let free = optimize(&stats, Objective::MaxSharpe, &MinExposure::none(), 0.02, None).unwrap();
    let floored =
        optimize(&stats, Objective::MaxSharpe, &MinExposure::Uniform(0.10), 0.02, None).unwrap();
    assert!(floored.as_slice().iter().all(|w| *w >= 0.10 - 1e-6));
    let s_free = portfolio_stats(&free, &stats, 0.02, None).unwrap().sharpe_ratio;
    let s_floor = portfolio_stats(&floored, &stats, 0.02, None).unwrap().sharpe_ratio;
    // A tighter constraint set can only lower the optimum
    assert!(s_floor <= s_free + 1e-6);
}

// ===========================================================================
// Frontier generator
// ===========================================================================

#[test]
fn test_frontier_volatility_non_decreasing() {
    let stats = four_asset_stats(&[0, 1, 2, 3]);
    let f = generate_frontier(&stats, 25, &MinExposure::none(), 0.02).unwrap();
    assert_eq!(f.points.len() + f.skipped_points, 25);
    for pair in f.points.windows(2) {
        assert!(pair[1].volatility >= pair[0].volatility - 1e-6);
    }
}

#[test]
fn test_frontier_single_point_rejected() {
    let stats = four_asset_stats(&[0, 1, 2, 3]);
    let err = generate_frontier(&stats, 1, &MinExposure::none(), 0.02).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationError);
}

#[test]
fn test_frontier_with_floor_stays_above_floor() {
    let stats = four_asset_stats(&[0, 1, 2, 3]);
    let f = generate_frontier(&stats, 8, &MinExposure::Uniform(0.05), 0.02).unwrap();
    for p in &f.points {
        assert!(p.weights.values().all(|w| *w >= 0.05 - 1e-6));
    }
    // Highest-return corner under a 5% floor: 85% in QQQ
    assert!((f.max_return - (0.05 * (0.09 + 0.035 + 0.05) + 0.85 * 0.13)).abs() < 1e-9);
}
