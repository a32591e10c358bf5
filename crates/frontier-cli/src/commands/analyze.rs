use clap::Args;
use serde_json::Value;

use frontier_core::analysis::{self, AnalysisRequest};
use frontier_core::AnalysisConfig;

use super::{read_request, require_tickers, uniform_floor, MarketArgs};

/// Arguments for a full portfolio analysis
#[derive(Args)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub market: MarketArgs,

    /// Path to a JSON analysis request (tickers, weights, time_period, ...)
    #[arg(long)]
    pub input: Option<String>,

    /// Comma-separated tickers (e.g. "SPY,QQQ,TLT")
    #[arg(long, value_delimiter = ',')]
    pub tickers: Option<Vec<String>>,

    /// Comma-separated weights aligned with --tickers, summing to 1
    #[arg(long, value_delimiter = ',')]
    pub weights: Option<Vec<f64>>,

    /// Floor for the alternative allocation (e.g. 0.01 for 1%)
    #[arg(long)]
    pub min_exposure: Option<f64>,
}

pub fn run_analyze(
    args: AnalyzeArgs,
    config: &AnalysisConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    let request = match read_request::<AnalysisRequest>(args.input.as_deref())? {
        Some(r) => r,
        None => AnalysisRequest {
            tickers: require_tickers(args.tickers)?,
            weights: args
                .weights
                .ok_or("--weights is required (or provide --input)")?,
            time_period: args.market.time_period,
            end_date: args.market.end_date,
            min_exposure: uniform_floor(args.min_exposure),
        },
    };
    let source = args.market.source()?;
    let result = analysis::analyze(&source, &request, config)?;
    Ok(serde_json::to_value(result)?)
}
