use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::summary::{summarize, AnalysisSummary};
use crate::config::{AnalysisConfig, Candidate, MinExposure};
use crate::error::FrontierError;
use crate::frontier::{generate_frontier_with_cal, EfficientFrontier};
use crate::market_data::{DateRange, PriceHistory, PriceSource};
use crate::optimizer::{optimize, Objective};
use crate::recommend::{recommend, sort_recommendations, Recommendation};
use crate::simulation::{random_portfolios, RandomPortfolio};
use crate::statistics::portfolio::{diversification_ratio, hhi_concentration};
use crate::statistics::returns::MIN_RETURN_OBSERVATIONS;
use crate::statistics::{compute_statistics, portfolio_stats, PortfolioStats, ReturnStatistics};
use crate::types::{
    ensure_aligned, with_metadata, Allocation, AssetUniverse, ComputationOutput, Rate,
    WeightVector,
};
use crate::FrontierResult;

/// Weight above which a single position is flagged as concentrated.
const CONCENTRATION_WARNING_WEIGHT: f64 = 0.40;
/// HHI above which an allocation is flagged as concentrated.
const CONCENTRATION_WARNING_HHI: f64 = 0.5;
/// Share of the portfolio's observation dates a candidate history must
/// cover to be ranked.
const MIN_CANDIDATE_OVERLAP: f64 = 0.8;

pub(crate) fn default_time_period() -> u32 {
    2
}

pub(crate) fn default_objective() -> Objective {
    Objective::MaxSharpe
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Full analysis of an existing portfolio.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub tickers: Vec<String>,
    pub weights: Vec<f64>,
    /// Years of history, within the configured bounds.
    #[serde(default = "default_time_period")]
    pub time_period: u32,
    /// Last day of the history window; today when absent.
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    /// Floor for the alternative allocation; the configured floor when absent.
    #[serde(default)]
    pub min_exposure: Option<MinExposure>,
}

/// Optimization of a ticker set, optionally compared with current weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationRequest {
    pub tickers: Vec<String>,
    #[serde(default = "default_objective")]
    pub objective: Objective,
    #[serde(default)]
    pub target_return: Option<Rate>,
    #[serde(default)]
    pub current_weights: Option<Vec<f64>>,
    #[serde(default)]
    pub min_exposure: Option<MinExposure>,
    #[serde(default = "default_time_period")]
    pub time_period: u32,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedPortfolio {
    pub name: String,
    pub weights: Vec<f64>,
}

/// Several allocations of one ticker set, evaluated on the same statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonRequest {
    pub tickers: Vec<String>,
    pub portfolios: Vec<NamedPortfolio>,
    #[serde(default = "default_time_period")]
    pub time_period: u32,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

/// Efficient frontier of a ticker set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontierRequest {
    pub tickers: Vec<String>,
    /// Overrides the configured number of frontier points.
    #[serde(default)]
    pub num_points: Option<usize>,
    /// Floor applied to every frontier portfolio; none when absent.
    #[serde(default)]
    pub min_exposure: Option<MinExposure>,
    #[serde(default = "default_time_period")]
    pub time_period: u32,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

/// Diversification candidates for an existing portfolio.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationRequest {
    pub tickers: Vec<String>,
    pub weights: Vec<f64>,
    #[serde(default = "default_time_period")]
    pub time_period: u32,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Weights with their statistics and concentration measures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioAllocation {
    pub allocation: Allocation,
    pub stats: PortfolioStats,
    pub hhi_concentration: f64,
    pub diversification_ratio: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioAnalysis {
    pub date_range: DateRange,
    pub observations: usize,
    pub current: PortfolioAllocation,
    /// Max-Sharpe allocation with no floor.
    pub optimal: PortfolioAllocation,
    /// Max-Sharpe allocation under `alternative_min_exposure`.
    pub alternative: PortfolioAllocation,
    pub alternative_min_exposure: MinExposure,
    pub frontier: EfficientFrontier,
    pub random_portfolios: Vec<RandomPortfolio>,
    pub recommendations: Vec<Recommendation>,
    pub summary: AnalysisSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub constraint_used: Objective,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_return: Option<Rate>,
    pub time_period: u32,
    pub date_range: DateRange,
    pub optimal: PortfolioAllocation,
    pub alternative: PortfolioAllocation,
    pub min_exposure_used: MinExposure,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_stats: Option<PortfolioStats>,
    pub frontier: EfficientFrontier,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioComparison {
    pub name: String,
    pub allocation: Allocation,
    pub stats: PortfolioStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationResult {
    pub date_range: DateRange,
    pub current_stats: PortfolioStats,
    pub candidates_tested: usize,
    pub recommendations: Vec<Recommendation>,
}

/// Per-asset moments of a universe over a window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketStatistics {
    pub date_range: DateRange,
    pub observations: usize,
    pub periods_per_year: f64,
    pub tickers: Vec<String>,
    pub expected_returns: Allocation,
    pub volatilities: Allocation,
    pub correlation_matrix: Vec<Vec<f64>>,
    pub covariance_matrix: Vec<Vec<f64>>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Analyze `request.weights` against the max-Sharpe optimum, the efficient
/// frontier and a set of diversification candidates.
pub fn analyze(
    source: &dyn PriceSource,
    request: &AnalysisRequest,
    config: &AnalysisConfig,
) -> FrontierResult<ComputationOutput<PortfolioAnalysis>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    config.validate()?;

    let universe = AssetUniverse::new(request.tickers.clone())?;
    let current_weights = validate_weights(&request.weights, &universe, config)?;
    let window = load_window(source, &universe, request.time_period, request.end_date, config)?;
    let stats = &window.statistics;
    let rf = config.risk_free_rate;

    tracing::info!(
        tickers = universe.len(),
        observations = window.history.len(),
        "analyzing portfolio"
    );

    let current = allocation_record(&current_weights, stats, config)?;

    let optimal_weights = optimize(stats, Objective::MaxSharpe, &MinExposure::none(), rf, None)?;
    let optimal = allocation_record(&optimal_weights, stats, config)?;
    concentration_warnings("Optimal", &optimal, &mut warnings);

    let alternative_min_exposure = request
        .min_exposure
        .clone()
        .unwrap_or_else(|| config.min_exposure.clone());
    let alternative_weights =
        optimize(stats, Objective::MaxSharpe, &alternative_min_exposure, rf, None)?;
    let alternative = allocation_record(&alternative_weights, stats, config)?;

    let frontier = generate_frontier_with_cal(
        stats,
        config.num_frontier_points,
        config.cal_points,
        &MinExposure::none(),
        rf,
    )?;
    warnings.extend(frontier.warnings.iter().cloned());

    let random = random_portfolios(stats, config.num_random_portfolios, config.random_seed, rf)?;

    let (recommendations, _) = rank_candidates(
        source,
        &window.history,
        &current_weights,
        &window.range,
        config,
        &mut warnings,
    )?;

    let summary = summarize(
        &current.stats,
        &optimal.stats,
        &current_weights,
        &optimal_weights,
        request.time_period,
    );

    let output = PortfolioAnalysis {
        date_range: window.range,
        observations: window.history.len(),
        current,
        optimal,
        alternative,
        alternative_min_exposure: alternative_min_exposure.clone(),
        frontier,
        random_portfolios: random,
        recommendations,
        summary,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Mean-variance portfolio analysis \
         (max-Sharpe optimum, efficient frontier, diversification candidates)",
        &serde_json::json!({
            "n_assets": universe.len(),
            "time_period_years": request.time_period,
            "risk_free_rate": rf,
            "inflation_rate": config.inflation_rate,
            "periods_per_year": stats.periods_per_year(),
            "alternative_min_exposure": alternative_min_exposure,
            "frontier_points": config.num_frontier_points,
            "blend_weight": config.blend_weight,
        }),
        warnings,
        elapsed,
        output,
    ))
}

/// Solve for `request.objective` and the floored alternative, with the
/// frontier of the same universe.
pub fn optimize_portfolio(
    source: &dyn PriceSource,
    request: &OptimizationRequest,
    config: &AnalysisConfig,
) -> FrontierResult<ComputationOutput<OptimizationResult>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    config.validate()?;

    let universe = AssetUniverse::new(request.tickers.clone())?;
    let current_weights = request
        .current_weights
        .as_ref()
        .map(|w| validate_weights(w, &universe, config))
        .transpose()?;
    let window = load_window(source, &universe, request.time_period, request.end_date, config)?;
    let stats = &window.statistics;
    let rf = config.risk_free_rate;

    let optimal_weights = optimize(
        stats,
        request.objective,
        &MinExposure::none(),
        rf,
        request.target_return,
    )?;
    let optimal = allocation_record(&optimal_weights, stats, config)?;
    concentration_warnings("Optimal", &optimal, &mut warnings);

    let min_exposure_used = request
        .min_exposure
        .clone()
        .unwrap_or_else(|| config.min_exposure.clone());
    let alternative_weights = optimize(
        stats,
        request.objective,
        &min_exposure_used,
        rf,
        request.target_return,
    )?;
    let alternative = allocation_record(&alternative_weights, stats, config)?;

    let current_stats = current_weights
        .as_ref()
        .map(|w| portfolio_stats(w, stats, rf, config.inflation_rate))
        .transpose()?;

    let frontier = generate_frontier_with_cal(
        stats,
        config.num_frontier_points,
        config.cal_points,
        &MinExposure::none(),
        rf,
    )?;
    warnings.extend(frontier.warnings.iter().cloned());

    let output = OptimizationResult {
        constraint_used: request.objective,
        target_return: request.target_return,
        time_period: request.time_period,
        date_range: window.range,
        optimal,
        alternative,
        min_exposure_used: min_exposure_used.clone(),
        current_stats,
        frontier,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Constrained mean-variance optimization (interior-point quadratic programming)",
        &serde_json::json!({
            "n_assets": universe.len(),
            "objective": request.objective,
            "time_period_years": request.time_period,
            "risk_free_rate": rf,
            "min_exposure_used": min_exposure_used,
        }),
        warnings,
        elapsed,
        output,
    ))
}

/// Trace the efficient frontier, tangency portfolio and capital allocation
/// line of `request.tickers`.
pub fn efficient_frontier(
    source: &dyn PriceSource,
    request: &FrontierRequest,
    config: &AnalysisConfig,
) -> FrontierResult<ComputationOutput<EfficientFrontier>> {
    let start = Instant::now();
    config.validate()?;

    let universe = AssetUniverse::new(request.tickers.clone())?;
    let window = load_window(source, &universe, request.time_period, request.end_date, config)?;
    let num_points = request.num_points.unwrap_or(config.num_frontier_points);
    let min_exposure = request.min_exposure.clone().unwrap_or_else(MinExposure::none);

    let frontier = generate_frontier_with_cal(
        &window.statistics,
        num_points,
        config.cal_points,
        &min_exposure,
        config.risk_free_rate,
    )?;
    let warnings = frontier.warnings.clone();

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Efficient frontier by minimum-variance solves at evenly spaced target returns",
        &serde_json::json!({
            "n_assets": universe.len(),
            "num_points": num_points,
            "min_exposure": min_exposure,
            "risk_free_rate": config.risk_free_rate,
            "date_range": window.range,
        }),
        warnings,
        elapsed,
        frontier,
    ))
}

/// Statistics of several named allocations over one window.
pub fn compare_portfolios(
    source: &dyn PriceSource,
    request: &ComparisonRequest,
    config: &AnalysisConfig,
) -> FrontierResult<ComputationOutput<Vec<PortfolioComparison>>> {
    let start = Instant::now();
    config.validate()?;
    if request.portfolios.is_empty() {
        return Err(FrontierError::validation(
            "portfolios",
            "At least one portfolio required",
        ));
    }

    let universe = AssetUniverse::new(request.tickers.clone())?;
    // Validate every allocation before touching market data
    let weights = request
        .portfolios
        .iter()
        .map(|p| {
            validate_weights(&p.weights, &universe, config).map_err(|e| match e {
                FrontierError::Validation { reason, .. } => {
                    FrontierError::validation(format!("portfolios[{}]", p.name), reason)
                }
                other => other,
            })
        })
        .collect::<FrontierResult<Vec<WeightVector>>>()?;
    let window = load_window(source, &universe, request.time_period, request.end_date, config)?;

    let comparison = request
        .portfolios
        .iter()
        .zip(weights.iter())
        .map(|(p, w)| {
            Ok(PortfolioComparison {
                name: p.name.clone(),
                allocation: w.to_allocation(&universe)?,
                stats: portfolio_stats(
                    w,
                    &window.statistics,
                    config.risk_free_rate,
                    config.inflation_rate,
                )?,
            })
        })
        .collect::<FrontierResult<Vec<_>>>()?;

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Portfolio comparison on shared return statistics",
        &serde_json::json!({
            "n_assets": universe.len(),
            "n_portfolios": request.portfolios.len(),
            "time_period_years": request.time_period,
            "risk_free_rate": config.risk_free_rate,
        }),
        Vec::new(),
        elapsed,
        comparison,
    ))
}

/// Rank the configured candidates as diversifiers of `request.weights`.
pub fn recommend_diversifiers(
    source: &dyn PriceSource,
    request: &RecommendationRequest,
    config: &AnalysisConfig,
) -> FrontierResult<ComputationOutput<RecommendationResult>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    config.validate()?;

    let universe = AssetUniverse::new(request.tickers.clone())?;
    let weights = validate_weights(&request.weights, &universe, config)?;
    let window = load_window(source, &universe, request.time_period, request.end_date, config)?;
    let current_stats = portfolio_stats(
        &weights,
        &window.statistics,
        config.risk_free_rate,
        config.inflation_rate,
    )?;

    let (recommendations, candidates_tested) = rank_candidates(
        source,
        &window.history,
        &weights,
        &window.range,
        config,
        &mut warnings,
    )?;

    let output = RecommendationResult {
        date_range: window.range,
        current_stats,
        candidates_tested,
        recommendations,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Blend-and-rank diversification analysis",
        &serde_json::json!({
            "blend_weight": config.blend_weight,
            "candidates": config.candidates.len(),
            "max_recommendations": config.max_recommendations,
            "require_improvement": config.require_improvement,
            "risk_free_rate": config.risk_free_rate,
        }),
        warnings,
        elapsed,
        output,
    ))
}

/// Annualized moments of `tickers` over the requested window.
pub fn market_statistics(
    source: &dyn PriceSource,
    tickers: &[String],
    time_period: u32,
    end_date: Option<NaiveDate>,
    config: &AnalysisConfig,
) -> FrontierResult<ComputationOutput<MarketStatistics>> {
    let start = Instant::now();
    let universe = AssetUniverse::new(tickers.to_vec())?;
    let window = load_window(source, &universe, time_period, end_date, config)?;
    let stats = &window.statistics;

    let to_alloc = |v: &[f64]| -> Allocation {
        universe
            .tickers()
            .iter()
            .cloned()
            .zip(v.iter().copied())
            .collect()
    };
    let output = MarketStatistics {
        date_range: window.range,
        observations: window.history.len(),
        periods_per_year: stats.periods_per_year(),
        tickers: universe.tickers().to_vec(),
        expected_returns: to_alloc(stats.expected_returns()),
        volatilities: to_alloc(&stats.asset_volatilities()),
        correlation_matrix: stats.correlation_matrix(),
        covariance_matrix: stats.covariance().to_vec(),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Annualized sample mean and covariance of period returns",
        &serde_json::json!({
            "n_assets": universe.len(),
            "time_period_years": time_period,
        }),
        Vec::new(),
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub(crate) struct Window {
    pub range: DateRange,
    pub history: PriceHistory,
    pub statistics: ReturnStatistics,
}

/// Resolve the lookback window, fetch prices and derive statistics.
pub(crate) fn load_window(
    source: &dyn PriceSource,
    universe: &AssetUniverse,
    time_period: u32,
    end_date: Option<NaiveDate>,
    config: &AnalysisConfig,
) -> FrontierResult<Window> {
    let range = resolve_range(time_period, end_date, config)?;
    let history = source.fetch(universe, &range)?;
    let statistics = compute_statistics(&history)?;
    tracing::debug!(
        start = %range.start,
        end = %range.end,
        observations = history.len(),
        periods_per_year = statistics.periods_per_year(),
        "loaded price window"
    );
    Ok(Window {
        range,
        history,
        statistics,
    })
}

pub(crate) fn resolve_range(
    time_period: u32,
    end_date: Option<NaiveDate>,
    config: &AnalysisConfig,
) -> FrontierResult<DateRange> {
    if time_period < config.min_years || time_period > config.max_years {
        return Err(FrontierError::validation(
            "time_period",
            format!(
                "Time period must be between {} and {} years, got {}",
                config.min_years, config.max_years, time_period
            ),
        ));
    }
    let end = end_date.unwrap_or_else(|| Utc::now().date_naive());
    DateRange::lookback(end, time_period)
}

/// Caller weights must match the universe and sum to one; they are never
/// rescaled.
pub(crate) fn validate_weights(
    weights: &[f64],
    universe: &AssetUniverse,
    config: &AnalysisConfig,
) -> FrontierResult<WeightVector> {
    ensure_aligned(weights.len(), universe)?;
    WeightVector::with_tolerance(weights.to_vec(), config.weight_tolerance)
}

pub(crate) fn allocation_record(
    weights: &WeightVector,
    statistics: &ReturnStatistics,
    config: &AnalysisConfig,
) -> FrontierResult<PortfolioAllocation> {
    Ok(PortfolioAllocation {
        allocation: weights.to_allocation(statistics.universe())?,
        stats: portfolio_stats(
            weights,
            statistics,
            config.risk_free_rate,
            config.inflation_rate,
        )?,
        hhi_concentration: hhi_concentration(weights.as_slice()),
        diversification_ratio: diversification_ratio(weights.as_slice(), statistics)?,
    })
}

pub(crate) fn concentration_warnings(
    label: &str,
    record: &PortfolioAllocation,
    warnings: &mut Vec<String>,
) {
    for (ticker, w) in &record.allocation {
        if *w > CONCENTRATION_WARNING_WEIGHT {
            warnings.push(format!(
                "{} allocation concentrated: {} has weight {:.4}",
                label, ticker, w
            ));
        }
    }
    if record.hhi_concentration > CONCENTRATION_WARNING_HHI {
        warnings.push(format!(
            "{} allocation highly concentrated: HHI = {:.4}",
            label, record.hhi_concentration
        ));
    }
}

/// Fetch each configured candidate over `range` and rank it against the
/// portfolio on their own inner-joined window. Candidates are evaluated
/// independently of one another; those without usable data, or whose
/// overlap covers too little of the portfolio history, are skipped with a
/// warning.
fn rank_candidates(
    source: &dyn PriceSource,
    history: &PriceHistory,
    weights: &WeightVector,
    range: &DateRange,
    config: &AnalysisConfig,
    warnings: &mut Vec<String>,
) -> FrontierResult<(Vec<Recommendation>, usize)> {
    let current_universe = history.universe();
    let min_overlap = ((history.len() as f64) * MIN_CANDIDATE_OVERLAP).ceil() as usize;
    let min_overlap = min_overlap.max(MIN_RETURN_OBSERVATIONS + 1);
    let mut recommendations: Vec<Recommendation> = Vec::new();
    let mut tested = 0;

    for (i, candidate) in config.candidates.iter().enumerate() {
        let repeated = config.candidates[..i]
            .iter()
            .any(|c| c.ticker == candidate.ticker);
        if repeated || current_universe.contains(&candidate.ticker) {
            continue;
        }
        let fetched = AssetUniverse::new(vec![candidate.ticker.clone()])
            .and_then(|single| source.fetch(&single, range));
        let candidate_history = match fetched {
            Ok(h) => h,
            Err(e) => {
                skip_candidate(candidate, &e.to_string(), warnings);
                continue;
            }
        };
        let joined = history.join(&candidate_history)?;
        if joined.len() < min_overlap {
            skip_candidate(
                candidate,
                &format!(
                    "only {} of {} portfolio dates overlap its history",
                    joined.len(),
                    history.len()
                ),
                warnings,
            );
            continue;
        }
        let pair_stats = match compute_statistics(&joined) {
            Ok(s) => s,
            Err(e) => {
                skip_candidate(candidate, &e.to_string(), warnings);
                continue;
            }
        };
        let ranked = recommend(
            weights,
            current_universe,
            std::slice::from_ref(candidate),
            &pair_stats,
            config.risk_free_rate,
            config.blend_weight,
        )?;
        recommendations.extend(ranked);
        tested += 1;
    }

    sort_recommendations(&mut recommendations);
    if config.require_improvement {
        recommendations.retain(|r| r.sharpe_improvement > 0.0);
    }
    if let Some(max) = config.max_recommendations {
        recommendations.truncate(max);
    }
    Ok((recommendations, tested))
}

fn skip_candidate(candidate: &Candidate, reason: &str, warnings: &mut Vec<String>) {
    tracing::warn!(ticker = %candidate.ticker, %reason, "skipping diversification candidate");
    warnings.push(format!("Candidate {} skipped: {}", candidate.ticker, reason));
}
