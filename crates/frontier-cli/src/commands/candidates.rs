use clap::Args;
use serde_json::{json, Value};

use frontier_core::{AnalysisConfig, Candidate};

use crate::input;

/// Arguments for listing diversification candidates
#[derive(Args)]
pub struct CandidatesArgs {
    /// CSV price table; when given, each candidate reports whether it has data
    #[arg(long)]
    pub prices: Option<String>,
}

/// List the diversification candidates the recommendation engine will test.
pub fn run_candidates(
    args: CandidatesArgs,
    config: &AnalysisConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    let available = match args.prices.as_deref() {
        Some(path) => Some(input::prices::load_prices(path)?.tickers()),
        None => None,
    };
    Ok(candidate_listing(&config.candidates, available.as_deref()))
}

fn candidate_listing(candidates: &[Candidate], available: Option<&[String]>) -> Value {
    let rows: Vec<Value> = candidates
        .iter()
        .map(|c| {
            let mut row = json!({ "ticker": c.ticker, "name": c.name });
            if let Some(tickers) = available {
                row["has_data"] = json!(tickers.contains(&c.ticker));
            }
            row
        })
        .collect();
    Value::Array(rows)
}
