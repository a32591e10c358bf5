use clap::Args;
use serde_json::Value;

use frontier_core::analysis::{self, FrontierRequest, OptimizationRequest};
use frontier_core::optimizer::Objective;
use frontier_core::AnalysisConfig;

use super::{read_request, require_tickers, uniform_floor, MarketArgs};

/// Arguments for a single constrained optimization
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct OptimizeArgs {
    #[command(flatten)]
    pub market: MarketArgs,

    /// Path to a JSON optimization request
    #[arg(long)]
    pub input: Option<String>,

    /// Comma-separated tickers
    #[arg(long, value_delimiter = ',')]
    pub tickers: Option<Vec<String>>,

    /// Objective: max_sharpe, min_volatility or target_return
    #[arg(long, default_value = "max_sharpe")]
    pub objective: Objective,

    /// Annual target return (required for target_return)
    #[arg(long)]
    pub target_return: Option<f64>,

    /// Current weights to report alongside the optimum
    #[arg(long, value_delimiter = ',')]
    pub current_weights: Option<Vec<f64>>,

    /// Floor for the alternative allocation
    #[arg(long)]
    pub min_exposure: Option<f64>,
}

/// Arguments for efficient frontier generation
#[derive(Args)]
pub struct FrontierArgs {
    #[command(flatten)]
    pub market: MarketArgs,

    /// Path to a JSON frontier request
    #[arg(long)]
    pub input: Option<String>,

    /// Comma-separated tickers
    #[arg(long, value_delimiter = ',')]
    pub tickers: Option<Vec<String>>,

    /// Number of target-return levels (at least 2)
    #[arg(long)]
    pub points: Option<usize>,

    /// Floor applied to every frontier portfolio
    #[arg(long)]
    pub min_exposure: Option<f64>,
}

pub fn run_optimize(
    args: OptimizeArgs,
    config: &AnalysisConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    let request = match read_request::<OptimizationRequest>(args.input.as_deref())? {
        Some(r) => r,
        None => OptimizationRequest {
            tickers: require_tickers(args.tickers)?,
            objective: args.objective,
            target_return: args.target_return,
            current_weights: args.current_weights,
            min_exposure: uniform_floor(args.min_exposure),
            time_period: args.market.time_period,
            end_date: args.market.end_date,
        },
    };
    let source = args.market.source()?;
    let result = analysis::optimize_portfolio(&source, &request, config)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_frontier(
    args: FrontierArgs,
    config: &AnalysisConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    let request = match read_request::<FrontierRequest>(args.input.as_deref())? {
        Some(r) => r,
        None => FrontierRequest {
            tickers: require_tickers(args.tickers)?,
            num_points: args.points,
            min_exposure: uniform_floor(args.min_exposure),
            time_period: args.market.time_period,
            end_date: args.market.end_date,
        },
    };
    let source = args.market.source()?;
    let result = analysis::efficient_frontier(&source, &request, config)?;
    Ok(serde_json::to_value(result)?)
}
