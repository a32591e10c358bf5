use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use frontier_core::analysis::{
    analyze, compare_portfolios, efficient_frontier, market_statistics, optimize_portfolio,
    recommend_diversifiers, AnalysisRequest, ComparisonRequest, FrontierRequest,
    NamedPortfolio, OptimizationRequest, RecommendationRequest,
};
use frontier_core::error::ErrorKind;
use frontier_core::market_data::InMemoryPriceSource;
use frontier_core::optimizer::Objective;
use frontier_core::{AnalysisConfig, Candidate, MinExposure};

// ===========================================================================
// Fixtures
// ===========================================================================

const DAYS: i64 = 731;

fn first_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()
}

fn end_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()
}

/// Two equity-like assets driven by a common factor, a bond that moves
/// against it and an independent gold series.
fn sample_market() -> InMemoryPriceSource {
    let mut rng = StdRng::seed_from_u64(7);
    let mut prices = [100.0_f64; 4];
    let mut series: Vec<Vec<(NaiveDate, f64)>> = vec![Vec::new(); 4];
    for day in 0..DAYS {
        let date = first_day() + Duration::days(day);
        if day > 0 {
            let m: f64 = rng.gen_range(-0.015..0.015);
            let r = [
                0.0005 + m + rng.gen_range(-0.004..0.004),
                0.0006 + 1.2 * m + rng.gen_range(-0.006..0.006),
                0.0003 - 0.6 * m + rng.gen_range(-0.003..0.003),
                0.0002 + rng.gen_range(-0.01..0.01),
            ];
            for (p, ri) in prices.iter_mut().zip(r) {
                *p *= 1.0 + ri;
            }
        }
        for (s, p) in series.iter_mut().zip(prices) {
            s.push((date, p));
        }
    }
    let mut it = series.into_iter();
    InMemoryPriceSource::new()
        .with_series("SPY", it.next().unwrap())
        .with_series("QQQ", it.next().unwrap())
        .with_series("TLT", it.next().unwrap())
        .with_series("GLD", it.next().unwrap())
}

fn test_config() -> AnalysisConfig {
    AnalysisConfig {
        num_frontier_points: 10,
        num_random_portfolios: 50,
        candidates: vec![
            Candidate::new("TLT", "Long-term Bonds"),
            Candidate::new("GLD", "Gold"),
            Candidate::new("VNQ", "Real Estate"),
        ],
        ..AnalysisConfig::default()
    }
}

fn equity_request() -> AnalysisRequest {
    AnalysisRequest {
        tickers: vec!["SPY".into(), "QQQ".into()],
        weights: vec![0.6, 0.4],
        time_period: 1,
        end_date: Some(end_date()),
        min_exposure: None,
    }
}

// ===========================================================================
// Full analysis
// ===========================================================================

#[test]
fn test_analyze_end_to_end() {
    let source = sample_market();
    let out = analyze(&source, &equity_request(), &test_config()).unwrap();
    let r = &out.result;

    assert_eq!(r.date_range.end, end_date());
    assert!(r.observations > 300);
    assert_eq!(r.current.allocation["SPY"], 0.6);
    assert_eq!(r.current.allocation["QQQ"], 0.4);

    // No allocation of the same universe beats the unconstrained optimum
    assert!(r.optimal.stats.sharpe_ratio >= r.current.stats.sharpe_ratio - 1e-6);
    assert!(r.optimal.stats.sharpe_ratio >= r.alternative.stats.sharpe_ratio - 1e-6);
    assert!(r.alternative.allocation.values().all(|w| *w >= 0.01 - 1e-6));
    let total: f64 = r.optimal.allocation.values().sum();
    assert!((total - 1.0).abs() < 1e-6);

    assert!(!r.frontier.points.is_empty());
    assert_eq!(r.random_portfolios.len(), 50);
    assert!(r.current.stats.real_return.is_some());
}

#[test]
fn test_analyze_recommends_negatively_correlated_asset() {
    let source = sample_market();
    let out = analyze(&source, &equity_request(), &test_config()).unwrap();
    let recs = &out.result.recommendations;

    assert!(!recs.is_empty());
    assert_eq!(recs[0].ticker, "TLT");
    assert!(recs[0].correlation.unwrap() < 0.0);
    for pair in recs.windows(2) {
        assert!(pair[0].sharpe_improvement >= pair[1].sharpe_improvement);
    }
    assert!(recs.iter().all(|r| r.sharpe_improvement > 0.0));
    assert!((recs[0].weights["TLT"] - 0.10).abs() < 1e-12);
    assert!((recs[0].weights["SPY"] - 0.54).abs() < 1e-12);
}

#[test]
fn test_analyze_warns_about_missing_candidate() {
    let source = sample_market();
    let out = analyze(&source, &equity_request(), &test_config()).unwrap();
    assert!(out.warnings.iter().any(|w| w.contains("VNQ")));
    assert!(out
        .result
        .recommendations
        .iter()
        .all(|r| r.ticker != "VNQ"));
}

#[test]
fn test_analyze_is_deterministic() {
    let source = sample_market();
    let config = test_config();
    let a = analyze(&source, &equity_request(), &config).unwrap().result;
    let b = analyze(&source, &equity_request(), &config).unwrap().result;
    assert_eq!(a.optimal.allocation, b.optimal.allocation);
    let tickers_a: Vec<&str> = a.recommendations.iter().map(|r| r.ticker.as_str()).collect();
    let tickers_b: Vec<&str> = b.recommendations.iter().map(|r| r.ticker.as_str()).collect();
    assert_eq!(tickers_a, tickers_b);
    assert_eq!(
        serde_json::to_value(&a.random_portfolios).unwrap(),
        serde_json::to_value(&b.random_portfolios).unwrap()
    );
}

// ===========================================================================
// Validation and data errors
// ===========================================================================

#[test]
fn test_time_period_out_of_range() {
    let source = sample_market();
    for years in [0, 11] {
        let request = AnalysisRequest {
            time_period: years,
            ..equity_request()
        };
        let err = analyze(&source, &request, &test_config()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);
        assert_eq!(err.report().details["field"], "time_period");
    }
}

#[test]
fn test_weights_must_sum_to_one() {
    let source = sample_market();
    let request = AnalysisRequest {
        weights: vec![0.5, 0.4],
        ..equity_request()
    };
    let err = analyze(&source, &request, &test_config()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationError);
}

#[test]
fn test_weights_must_match_tickers() {
    let source = sample_market();
    let request = AnalysisRequest {
        weights: vec![1.0],
        ..equity_request()
    };
    let err = analyze(&source, &request, &test_config()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationError);
}

#[test]
fn test_unknown_ticker_is_data_error() {
    let source = sample_market();
    let request = AnalysisRequest {
        tickers: vec!["SPY".into(), "ZZZ".into()],
        ..equity_request()
    };
    let err = analyze(&source, &request, &test_config()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DataError);
    assert_eq!(err.report().details["ticker"], "ZZZ");
}

// ===========================================================================
// Optimization, comparison and recommendations
// ===========================================================================

#[test]
fn test_optimize_min_volatility_with_current_weights() {
    let source = sample_market();
    let request = OptimizationRequest {
        tickers: vec!["SPY".into(), "QQQ".into(), "TLT".into(), "GLD".into()],
        objective: Objective::MinVolatility,
        target_return: None,
        current_weights: Some(vec![0.25, 0.25, 0.25, 0.25]),
        min_exposure: None,
        time_period: 1,
        end_date: Some(end_date()),
    };
    let out = optimize_portfolio(&source, &request, &test_config()).unwrap();
    let r = &out.result;
    let current = r.current_stats.as_ref().unwrap();

    assert_eq!(r.constraint_used, Objective::MinVolatility);
    assert_eq!(r.min_exposure_used, MinExposure::Uniform(0.01));
    assert!(r.optimal.stats.volatility <= current.volatility + 1e-9);
    assert!(r.optimal.stats.volatility <= r.alternative.stats.volatility + 1e-6);
}

#[test]
fn test_optimize_target_return_hits_target() {
    let source = sample_market();
    let config = test_config();
    let base = OptimizationRequest {
        tickers: vec!["SPY".into(), "TLT".into(), "GLD".into()],
        objective: Objective::TargetReturn,
        target_return: None,
        current_weights: None,
        min_exposure: Some(MinExposure::none()),
        time_period: 1,
        end_date: Some(end_date()),
    };
    // Missing target is rejected before any solve
    let err = optimize_portfolio(&source, &base, &config).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationError);
    assert_eq!(err.report().details["field"], "target_return");

    let frontier = optimize_portfolio(
        &source,
        &OptimizationRequest {
            objective: Objective::MinVolatility,
            ..base.clone()
        },
        &config,
    )
    .unwrap()
    .result
    .frontier;
    let target = 0.5 * (frontier.min_return + frontier.max_return);
    let out = optimize_portfolio(
        &source,
        &OptimizationRequest {
            target_return: Some(target),
            ..base
        },
        &config,
    )
    .unwrap();
    assert!((out.result.optimal.stats.expected_return - target).abs() < 1e-5);
}

#[test]
fn test_frontier_request_overrides_point_count() {
    let source = sample_market();
    let request = FrontierRequest {
        tickers: vec!["SPY".into(), "QQQ".into(), "TLT".into(), "GLD".into()],
        num_points: Some(6),
        min_exposure: None,
        time_period: 1,
        end_date: Some(end_date()),
    };
    let out = efficient_frontier(&source, &request, &test_config()).unwrap();
    let f = &out.result;
    assert_eq!(f.requested_points, 6);
    assert_eq!(f.points.len() + f.skipped_points, 6);
    for p in &f.points {
        assert!(p.sharpe_ratio <= f.tangency.sharpe_ratio + 1e-6);
    }
    assert_eq!(out.assumptions["num_points"], 6);
}

#[test]
fn test_compare_portfolios_shares_statistics() {
    let source = sample_market();
    let request = ComparisonRequest {
        tickers: vec!["SPY".into(), "QQQ".into()],
        portfolios: vec![
            NamedPortfolio {
                name: "all_spy".into(),
                weights: vec![1.0, 0.0],
            },
            NamedPortfolio {
                name: "balanced".into(),
                weights: vec![0.5, 0.5],
            },
        ],
        time_period: 1,
        end_date: Some(end_date()),
    };
    let out = compare_portfolios(&source, &request, &test_config()).unwrap();
    assert_eq!(out.result.len(), 2);

    let stats = market_statistics(
        &source,
        &["SPY".to_string(), "QQQ".to_string()],
        1,
        Some(end_date()),
        &test_config(),
    )
    .unwrap()
    .result;
    let spy = &out.result[0].stats;
    assert!((spy.expected_return - stats.expected_returns["SPY"]).abs() < 1e-12);
    assert!((spy.volatility - stats.volatilities["SPY"]).abs() < 1e-12);
}

#[test]
fn test_compare_names_bad_portfolio() {
    let source = sample_market();
    let request = ComparisonRequest {
        tickers: vec!["SPY".into(), "QQQ".into()],
        portfolios: vec![NamedPortfolio {
            name: "broken".into(),
            weights: vec![0.7, 0.7],
        }],
        time_period: 1,
        end_date: Some(end_date()),
    };
    let err = compare_portfolios(&source, &request, &test_config()).unwrap_err();
    assert_eq!(err.report().details["field"], "portfolios[broken]");
}

#[test]
fn test_recommend_respects_limits() {
    let source = sample_market();
    let config = AnalysisConfig {
        max_recommendations: Some(1),
        require_improvement: false,
        ..test_config()
    };
    let request = RecommendationRequest {
        tickers: vec!["SPY".into(), "QQQ".into()],
        weights: vec![0.6, 0.4],
        time_period: 1,
        end_date: Some(end_date()),
    };
    let out = recommend_diversifiers(&source, &request, &config).unwrap();
    assert_eq!(out.result.candidates_tested, 2);
    assert_eq!(out.result.recommendations.len(), 1);
    assert_eq!(out.result.recommendations[0].ticker, "TLT");
}

fn tlt_recommendation_with(
    source: &InMemoryPriceSource,
    candidates: Vec<Candidate>,
) -> (frontier_core::recommend::Recommendation, Vec<String>, f64) {
    let config = AnalysisConfig {
        candidates,
        require_improvement: false,
        ..test_config()
    };
    let request = RecommendationRequest {
        tickers: vec!["SPY".into(), "QQQ".into()],
        weights: vec![0.6, 0.4],
        time_period: 1,
        end_date: Some(end_date()),
    };
    let out = recommend_diversifiers(source, &request, &config).unwrap();
    let tlt = out
        .result
        .recommendations
        .iter()
        .find(|r| r.ticker == "TLT")
        .cloned()
        .unwrap();
    (tlt, out.warnings, out.result.current_stats.sharpe_ratio)
}

#[test]
fn test_short_candidate_does_not_shrink_other_windows() {
    // Only the last four days of data
    let short: Vec<(NaiveDate, f64)> = (0..4)
        .map(|i| (end_date() - Duration::days(3 - i), 50.0 + i as f64))
        .collect();
    let source = sample_market().with_series("SHORT", short);

    let (alone, _, _) = tlt_recommendation_with(&source, vec![Candidate::new("TLT", "Bonds")]);
    let (mixed, warnings, current_sharpe) = tlt_recommendation_with(
        &source,
        vec![Candidate::new("SHORT", "Short"), Candidate::new("TLT", "Bonds")],
    );

    assert_eq!(alone.sharpe_improvement, mixed.sharpe_improvement);
    assert_eq!(alone.new_volatility, mixed.new_volatility);
    assert_eq!(alone.correlation, mixed.correlation);
    assert!(mixed.sharpe_improvement > 0.0);
    assert!(warnings.iter().any(|w| w.contains("SHORT")));
    assert!(
        (current_sharpe + mixed.sharpe_improvement - mixed.stats.sharpe_ratio).abs() < 1e-12
    );
}

#[cfg(feature = "black_litterman")]
#[test]
fn test_black_litterman_view_tilts_allocation() {
    use frontier_core::analysis::{analyze_black_litterman, BlackLittermanRequest};
    use frontier_core::black_litterman::{BlackLittermanParams, View, ViewType};

    let source = sample_market();
    let base = BlackLittermanRequest {
        tickers: vec!["SPY".into(), "TLT".into(), "GLD".into()],
        weights: None,
        views: Vec::new(),
        params: BlackLittermanParams {
            market_weights: Some(vec![0.5, 0.3, 0.2]),
            ..BlackLittermanParams::default()
        },
        objective: Objective::MaxSharpe,
        target_return: None,
        min_exposure: None,
        time_period: 1,
        end_date: Some(end_date()),
    };
    let neutral = analyze_black_litterman(&source, &base, &test_config()).unwrap();
    assert!(neutral.warnings.iter().any(|w| w.contains("No views")));

    let bullish_gold = BlackLittermanRequest {
        views: vec![View {
            view_type: ViewType::Absolute,
            assets: vec!["GLD".into()],
            value: 0.40,
            confidence: Some(0.9),
        }],
        ..base
    };
    let tilted = analyze_black_litterman(&source, &bullish_gold, &test_config()).unwrap();
    let gld_prior = neutral.result.posterior.posterior_returns["GLD"];
    let gld_post = tilted.result.posterior.posterior_returns["GLD"];
    assert!(gld_post > gld_prior);
    assert!(
        tilted.result.optimal.allocation["GLD"] >= neutral.result.optimal.allocation["GLD"] - 1e-6
    );
}
