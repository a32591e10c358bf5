use clap::Args;
use serde_json::Value;

use frontier_core::analysis::{self, ComparisonRequest, NamedPortfolio};
use frontier_core::AnalysisConfig;

use super::{read_request, require_tickers, MarketArgs};

/// Arguments for comparing named allocations
#[derive(Args)]
pub struct CompareArgs {
    #[command(flatten)]
    pub market: MarketArgs,

    /// Path to a JSON comparison request
    #[arg(long)]
    pub input: Option<String>,

    /// Comma-separated tickers shared by every portfolio
    #[arg(long, value_delimiter = ',')]
    pub tickers: Option<Vec<String>>,

    /// Named allocation as NAME=W1,W2,... (repeatable)
    #[arg(long = "portfolio")]
    pub portfolios: Vec<String>,
}

pub fn run_compare(
    args: CompareArgs,
    config: &AnalysisConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    let request = match read_request::<ComparisonRequest>(args.input.as_deref())? {
        Some(r) => r,
        None => ComparisonRequest {
            tickers: require_tickers(args.tickers)?,
            portfolios: args
                .portfolios
                .iter()
                .map(|arg| parse_portfolio(arg))
                .collect::<Result<Vec<_>, _>>()?,
            time_period: args.market.time_period,
            end_date: args.market.end_date,
        },
    };
    let source = args.market.source()?;
    let result = analysis::compare_portfolios(&source, &request, config)?;
    Ok(serde_json::to_value(result)?)
}

fn parse_portfolio(arg: &str) -> Result<NamedPortfolio, Box<dyn std::error::Error>> {
    let (name, weights) = arg
        .split_once('=')
        .ok_or_else(|| format!("Portfolio '{}' must look like NAME=W1,W2,...", arg))?;
    let weights = weights
        .split(',')
        .map(|w| {
            w.trim()
                .parse::<f64>()
                .map_err(|_| format!("Portfolio '{}': '{}' is not a number", name, w))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(NamedPortfolio {
        name: name.trim().to_string(),
        weights,
    })
}
