pub mod analyze;
pub mod black_litterman;
pub mod candidates;
pub mod compare;
pub mod optimize;
pub mod recommend;
pub mod stats;

use chrono::NaiveDate;
use clap::Args;
use frontier_core::market_data::InMemoryPriceSource;
use frontier_core::MinExposure;
use serde::de::DeserializeOwned;

use crate::input;

/// Market data window shared by every data-driven command.
#[derive(Args, Debug, Clone)]
pub struct MarketArgs {
    /// CSV price table: a date column, then one closing-price column per ticker
    #[arg(long)]
    pub prices: String,

    /// Years of history to analyse
    #[arg(long, default_value_t = 2)]
    pub time_period: u32,

    /// Last day of the window (YYYY-MM-DD); defaults to today
    #[arg(long)]
    pub end_date: Option<NaiveDate>,
}

impl MarketArgs {
    pub fn source(&self) -> Result<InMemoryPriceSource, Box<dyn std::error::Error>> {
        input::prices::load_prices(&self.prices)
    }
}

/// Request from `--input`, else from piped stdin, else `None` so the caller
/// can build one from flags.
pub fn read_request<T: DeserializeOwned>(
    path: Option<&str>,
) -> Result<Option<T>, Box<dyn std::error::Error>> {
    if let Some(p) = path {
        return Ok(Some(input::file::read_json(p)?));
    }
    match input::stdin::read_stdin()? {
        Some(data) => Ok(Some(serde_json::from_value(data)?)),
        None => Ok(None),
    }
}

pub fn require_tickers(
    tickers: Option<Vec<String>>,
) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let tickers = tickers.ok_or("--tickers is required (or provide --input)")?;
    Ok(tickers.into_iter().map(|t| t.trim().to_uppercase()).collect())
}

pub fn uniform_floor(floor: Option<f64>) -> Option<MinExposure> {
    floor.map(MinExposure::Uniform)
}
