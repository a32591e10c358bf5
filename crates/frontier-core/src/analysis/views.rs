use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::orchestrator::{
    allocation_record, concentration_warnings, default_objective, default_time_period,
    load_window, validate_weights, PortfolioAllocation,
};
use crate::black_litterman::{black_litterman, BlackLittermanParams, BlackLittermanPosterior, View};
use crate::config::{AnalysisConfig, MinExposure};
use crate::frontier::{generate_frontier_with_cal, EfficientFrontier};
use crate::market_data::{DateRange, PriceSource};
use crate::optimizer::{optimize, Objective};
use crate::types::{with_metadata, AssetUniverse, ComputationOutput, Rate};
use crate::FrontierResult;

/// Optimization on Black-Litterman posterior moments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlackLittermanRequest {
    pub tickers: Vec<String>,
    #[serde(default)]
    pub weights: Option<Vec<f64>>,
    #[serde(default)]
    pub views: Vec<View>,
    #[serde(default)]
    pub params: BlackLittermanParams,
    #[serde(default = "default_objective")]
    pub objective: Objective,
    #[serde(default)]
    pub target_return: Option<Rate>,
    #[serde(default)]
    pub min_exposure: Option<MinExposure>,
    #[serde(default = "default_time_period")]
    pub time_period: u32,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlackLittermanAnalysis {
    pub date_range: DateRange,
    pub posterior: BlackLittermanPosterior,
    /// Current weights evaluated on the posterior moments.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<PortfolioAllocation>,
    pub optimal: PortfolioAllocation,
    pub min_exposure_used: MinExposure,
    pub frontier: EfficientFrontier,
}

/// Replace historical expected returns with Black-Litterman posterior
/// returns, then optimize and trace the frontier on the posterior moments.
pub fn analyze_black_litterman(
    source: &dyn PriceSource,
    request: &BlackLittermanRequest,
    config: &AnalysisConfig,
) -> FrontierResult<ComputationOutput<BlackLittermanAnalysis>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    config.validate()?;

    let universe = AssetUniverse::new(request.tickers.clone())?;
    let current_weights = request
        .weights
        .as_ref()
        .map(|w| validate_weights(w, &universe, config))
        .transpose()?;
    let window = load_window(source, &universe, request.time_period, request.end_date, config)?;

    let posterior = black_litterman(&window.statistics, &request.views, &request.params)?;
    if request.views.is_empty() {
        warnings.push("No views supplied: posterior equals market equilibrium".into());
    }
    let stats = posterior.statistics()?;
    let rf = config.risk_free_rate;

    let min_exposure_used = request.min_exposure.clone().unwrap_or_else(MinExposure::none);
    let optimal_weights = optimize(
        stats,
        request.objective,
        &min_exposure_used,
        rf,
        request.target_return,
    )?;
    let optimal = allocation_record(&optimal_weights, stats, config)?;
    concentration_warnings("Posterior optimal", &optimal, &mut warnings);

    let current = current_weights
        .as_ref()
        .map(|w| allocation_record(w, stats, config))
        .transpose()?;

    let frontier = generate_frontier_with_cal(
        stats,
        config.num_frontier_points,
        config.cal_points,
        &min_exposure_used,
        rf,
    )?;
    warnings.extend(frontier.warnings.iter().cloned());

    let output = BlackLittermanAnalysis {
        date_range: window.range,
        posterior,
        current,
        optimal,
        min_exposure_used,
        frontier,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Black-Litterman posterior returns with constrained mean-variance optimization",
        &serde_json::json!({
            "n_assets": universe.len(),
            "n_views": request.views.len(),
            "tau": request.params.tau,
            "risk_aversion": request.params.risk_aversion,
            "objective": request.objective,
            "risk_free_rate": rf,
        }),
        warnings,
        elapsed,
        output,
    ))
}
