use clap::Args;
use serde_json::Value;

use frontier_core::analysis::{self, BlackLittermanRequest};
use frontier_core::AnalysisConfig;

use super::{read_request, MarketArgs};

/// Arguments for Black-Litterman optimization
#[derive(Args)]
pub struct BlackLittermanArgs {
    #[command(flatten)]
    pub market: MarketArgs,

    /// Path to a JSON request with tickers, views and model parameters
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_black_litterman(
    args: BlackLittermanArgs,
    config: &AnalysisConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    let request: BlackLittermanRequest = read_request(args.input.as_deref())?
        .ok_or("Black-Litterman views need a JSON request (--input or stdin)")?;
    let source = args.market.source()?;
    let result = analysis::analyze_black_litterman(&source, &request, config)?;
    Ok(serde_json::to_value(result)?)
}
