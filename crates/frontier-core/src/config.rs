use serde::{Deserialize, Serialize};

use crate::error::FrontierError;
use crate::types::{Rate, WEIGHT_TOLERANCE};
use crate::FrontierResult;

/// Per-asset lower bound on allocation weight.
///
/// Deserializes from a float (broadcast to all assets) or a list of floats
/// (one per asset, in universe order).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MinExposure {
    Uniform(f64),
    PerAsset(Vec<f64>),
}

impl Default for MinExposure {
    fn default() -> Self {
        MinExposure::Uniform(0.01)
    }
}

impl MinExposure {
    /// No floor: weights may go to zero.
    pub fn none() -> Self {
        MinExposure::Uniform(0.0)
    }

    /// Resolve to one lower bound per asset.
    pub fn resolve(&self, n: usize) -> FrontierResult<Vec<f64>> {
        let bounds = match self {
            MinExposure::Uniform(v) => vec![*v; n],
            MinExposure::PerAsset(v) => {
                if v.len() != n {
                    return Err(FrontierError::validation(
                        "min_exposure",
                        format!(
                            "Number of minimum allocations ({}) must match number of assets ({})",
                            v.len(),
                            n
                        ),
                    ));
                }
                v.clone()
            }
        };
        for (i, b) in bounds.iter().enumerate() {
            if !b.is_finite() || *b < 0.0 || *b > 1.0 {
                return Err(FrontierError::validation(
                    "min_exposure",
                    format!("Bound {} must lie in [0, 1], got {}", i, b),
                ));
            }
        }
        Ok(bounds)
    }

    pub fn describe(&self) -> String {
        match self {
            MinExposure::Uniform(v) => format!("min_exposure={}", v),
            MinExposure::PerAsset(v) => format!("min_exposure={:?}", v),
        }
    }
}

/// A diversifier tested by the recommendation engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub ticker: String,
    pub name: String,
}

impl Candidate {
    pub fn new(ticker: &str, name: &str) -> Self {
        Candidate {
            ticker: ticker.to_string(),
            name: name.to_string(),
        }
    }
}

/// Major sector and asset-class ETFs used as default diversifiers.
pub fn default_candidates() -> Vec<Candidate> {
    [
        ("XLK", "Technology"),
        ("XLF", "Financials"),
        ("XLV", "Healthcare"),
        ("XLE", "Energy"),
        ("XLI", "Industrials"),
        ("XLY", "Consumer Discretionary"),
        ("XLP", "Consumer Staples"),
        ("XLB", "Materials"),
        ("XLRE", "Real Estate"),
        ("XLU", "Utilities"),
        ("VOO", "S&P 500"),
        ("VTI", "Total Market"),
        ("VXUS", "International"),
        ("VNQ", "Real Estate"),
        ("GLD", "Gold"),
        ("TLT", "Long-term Bonds"),
        ("AGG", "Aggregate Bonds"),
    ]
    .iter()
    .map(|(t, n)| Candidate::new(t, n))
    .collect()
}

/// Every tunable used by the analysis orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Annual risk-free rate.
    pub risk_free_rate: Rate,
    /// Annual inflation rate for real-return figures; `None` omits them.
    pub inflation_rate: Option<Rate>,
    /// Floor applied to the alternative allocation.
    pub min_exposure: MinExposure,
    /// Target-return levels swept by the frontier generator.
    pub num_frontier_points: usize,
    /// Points emitted along the capital allocation line.
    pub cal_points: usize,
    /// Trial weight given to each candidate diversifier.
    pub blend_weight: f64,
    /// Keep only the top N recommendations (`None` keeps all).
    pub max_recommendations: Option<usize>,
    /// Drop candidates that do not raise the Sharpe ratio.
    pub require_improvement: bool,
    /// Random portfolios generated for context (0 disables).
    pub num_random_portfolios: usize,
    pub random_seed: u64,
    pub min_years: u32,
    pub max_years: u32,
    pub weight_tolerance: f64,
    pub candidates: Vec<Candidate>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            risk_free_rate: 0.02,
            inflation_rate: Some(0.025),
            min_exposure: MinExposure::default(),
            num_frontier_points: 50,
            cal_points: 21,
            blend_weight: 0.10,
            max_recommendations: Some(5),
            require_improvement: true,
            num_random_portfolios: 1000,
            random_seed: 42,
            min_years: 1,
            max_years: 10,
            weight_tolerance: WEIGHT_TOLERANCE,
            candidates: default_candidates(),
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> FrontierResult<()> {
        if !self.risk_free_rate.is_finite() {
            return Err(FrontierError::validation(
                "risk_free_rate",
                "Must be a finite number",
            ));
        }
        if let Some(infl) = self.inflation_rate {
            if !infl.is_finite() || infl <= -1.0 {
                return Err(FrontierError::validation(
                    "inflation_rate",
                    "Must be finite and greater than -100%",
                ));
            }
        }
        if self.num_frontier_points < 2 {
            return Err(FrontierError::validation(
                "num_frontier_points",
                format!("At least 2 points required, got {}", self.num_frontier_points),
            ));
        }
        if self.cal_points < 2 {
            return Err(FrontierError::validation(
                "cal_points",
                "At least 2 points required",
            ));
        }
        if !(self.blend_weight > 0.0 && self.blend_weight < 1.0) {
            return Err(FrontierError::validation(
                "blend_weight",
                format!("Must lie in (0, 1), got {}", self.blend_weight),
            ));
        }
        if self.min_years == 0 || self.min_years > self.max_years {
            return Err(FrontierError::validation(
                "min_years",
                "Must be at least 1 and not exceed max_years",
            ));
        }
        if !(self.weight_tolerance > 0.0) {
            return Err(FrontierError::validation(
                "weight_tolerance",
                "Must be positive",
            ));
        }
        Ok(())
    }
}
