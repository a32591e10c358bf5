use clap::Args;
use serde_json::Value;

use frontier_core::analysis::{self, RecommendationRequest};
use frontier_core::AnalysisConfig;

use super::{read_request, require_tickers, MarketArgs};

/// Arguments for diversification recommendations
#[derive(Args)]
pub struct RecommendArgs {
    #[command(flatten)]
    pub market: MarketArgs,

    /// Path to a JSON recommendation request
    #[arg(long)]
    pub input: Option<String>,

    /// Comma-separated tickers of the current portfolio
    #[arg(long, value_delimiter = ',')]
    pub tickers: Option<Vec<String>>,

    /// Comma-separated current weights
    #[arg(long, value_delimiter = ',')]
    pub weights: Option<Vec<f64>>,

    /// Comma-separated candidate tickers, replacing the configured list
    #[arg(long, value_delimiter = ',')]
    pub candidates: Option<Vec<String>>,

    /// Keep at most this many recommendations
    #[arg(long)]
    pub max: Option<usize>,

    /// Also report candidates that do not improve the Sharpe ratio
    #[arg(long)]
    pub all: bool,
}

pub fn run_recommend(
    args: RecommendArgs,
    config: &AnalysisConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    let request = match read_request::<RecommendationRequest>(args.input.as_deref())? {
        Some(r) => r,
        None => RecommendationRequest {
            tickers: require_tickers(args.tickers)?,
            weights: args
                .weights
                .ok_or("--weights is required (or provide --input)")?,
            time_period: args.market.time_period,
            end_date: args.market.end_date,
        },
    };

    let mut config = config.clone();
    if let Some(tickers) = args.candidates {
        config.candidates = tickers
            .iter()
            .map(|t| {
                let t = t.trim().to_uppercase();
                frontier_core::Candidate::new(&t, &t)
            })
            .collect();
    }
    if args.max.is_some() {
        config.max_recommendations = args.max;
    }
    if args.all {
        config.require_improvement = false;
    }

    let source = args.market.source()?;
    let result = analysis::recommend_diversifiers(&source, &request, &config)?;
    Ok(serde_json::to_value(result)?)
}
