use clap::Args;
use serde_json::Value;

use frontier_core::analysis;
use frontier_core::AnalysisConfig;

use super::{require_tickers, MarketArgs};

/// Arguments for per-asset return statistics
#[derive(Args)]
pub struct StatsArgs {
    #[command(flatten)]
    pub market: MarketArgs,

    /// Comma-separated tickers
    #[arg(long, value_delimiter = ',')]
    pub tickers: Option<Vec<String>>,
}

pub fn run_stats(
    args: StatsArgs,
    config: &AnalysisConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    let tickers = require_tickers(args.tickers)?;
    let source = args.market.source()?;
    let result = analysis::market_statistics(
        &source,
        &tickers,
        args.market.time_period,
        args.market.end_date,
        config,
    )?;
    Ok(serde_json::to_value(result)?)
}
